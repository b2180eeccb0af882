//! Whose clock is running.

use board_core::board::color_from_char;
use shakmaty::Color;
use tracing::debug;

use crate::dom::{Document, Element};
use crate::profile::{piece_token, HostProfile};

/// Side currently on move according to the clocks, `None` when the page
/// gives no signal. Callers must not gate on `None`.
pub fn detect(doc: &Document, profile: &HostProfile) -> Option<Color> {
    let active_clock = doc.all().find(|el| {
        el.has_any_class(&profile.clock_classes) && el.has_any_class(&profile.active_clock_classes)
    });

    if let Some(clock) = active_clock {
        let color = clock
            .ancestors()
            .find(|el| el.has_any_class(&profile.player_classes))
            .and_then(|player| player_color(&player, profile))
            .or_else(|| profile.color_marker(&clock));
        if color.is_some() {
            return color;
        }
        debug!(?clock, "Active clock without a color marker");
    }

    // No running clock: look for a player panel flagged as on turn.
    doc.all()
        .filter(|el| {
            el.has_any_class(&profile.player_classes)
                && el.has_any_class(&profile.active_player_classes)
        })
        .find_map(|player| player_color(&player, profile))
}

/// Color of a player container: its own class, a color-tagged descendant,
/// or a piece icon such as `wk`.
fn player_color(player: &Element<'_>, profile: &HostProfile) -> Option<Color> {
    profile
        .color_marker(player)
        .or_else(|| player.descendants().find_map(|el| profile.color_marker(&el)))
        .or_else(|| {
            player.descendants().find_map(|el| {
                el.classes()
                    .find_map(piece_token)
                    .and_then(|(color, _)| color_from_char(color))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementSpec;

    fn player(classes: &str, clock_classes: &str, extra: Option<ElementSpec>) -> ElementSpec {
        let mut p = ElementSpec::new("div")
            .with_classes(classes)
            .with_child(ElementSpec::new("div").with_classes(clock_classes));
        if let Some(child) = extra {
            p = p.with_child(child);
        }
        p
    }

    fn page(top: ElementSpec, bottom: ElementSpec) -> Document {
        Document::from_tree(
            ElementSpec::new("body")
                .with_child(top)
                .with_child(ElementSpec::new("chess-board"))
                .with_child(bottom),
        )
    }

    fn run(doc: &Document) -> Option<Color> {
        detect(doc, &HostProfile::default())
    }

    #[test]
    fn test_direct_player_class() {
        let doc = page(
            player("player-component black", "clock-component", None),
            player("player-component white", "clock-component clock-player-turn", None),
        );
        assert_eq!(run(&doc), Some(Color::White));
    }

    #[test]
    fn test_nested_color_child() {
        let doc = page(
            player(
                "player-component",
                "clock-component clock-player-turn",
                Some(ElementSpec::new("span").with_classes("user-tagline black")),
            ),
            player("player-component", "clock-component", None),
        );
        assert_eq!(run(&doc), Some(Color::Black));
    }

    #[test]
    fn test_nested_piece_icon() {
        let doc = page(
            player(
                "player-component",
                "clock-component running",
                Some(ElementSpec::new("div").with_classes("captured-pieces bn")),
            ),
            player("player-component", "clock-component", None),
        );
        assert_eq!(run(&doc), Some(Color::Black));
    }

    #[test]
    fn test_clock_own_color() {
        let doc = Document::from_tree(
            ElementSpec::new("body")
                .with_child(ElementSpec::new("div").with_classes("clock clock-black"))
                .with_child(ElementSpec::new("div").with_classes("clock clock-white active")),
        );
        assert_eq!(run(&doc), Some(Color::White));
    }

    #[test]
    fn test_active_player_fallback() {
        let doc = page(
            player("player-component black turn", "clock-component", None),
            player("player-component white", "clock-component", None),
        );
        assert_eq!(run(&doc), Some(Color::Black));
    }

    #[test]
    fn test_unknown_without_signal() {
        let doc = page(
            player("player-component black", "clock-component", None),
            player("player-component white", "clock-component", None),
        );
        assert_eq!(run(&doc), None);
    }
}
