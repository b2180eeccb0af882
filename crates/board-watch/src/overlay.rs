//! Best-move arrow drawn over the board.
//!
//! Coordinates are relative to the board root's top-left corner. Geometry is
//! read from the snapshot at render time and never reused across renders.

use std::fmt::Write;

use board_core::{Move, Square};
use tracing::warn;

use crate::dom::{Document, NodeId, Rect};
use crate::orientation;
use crate::profile::HostProfile;

pub const ARROW_COLOR: &str = "#81b64c";
pub const ARROW_OPACITY: f64 = 0.7;
pub const OVERLAY_ID: &str = "sf-arrow-overlay";

const STROKE_RATIO: f64 = 0.15;
const HEAD_LENGTH_RATIO: f64 = 0.35;
const HEAD_WIDTH_RATIO: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub mv: Move,
    pub from: Point,
    pub to: Point,
    pub square_size: f64,
    pub width: f64,
    pub height: f64,
}

impl Arrow {
    pub fn stroke_width(&self) -> f64 {
        self.square_size * STROKE_RATIO
    }

    /// Triangle tip first, then the two base corners. The line ends at the
    /// base midpoint, returned last.
    fn head(&self) -> Option<([Point; 3], Point)> {
        let (dx, dy) = (self.to.x - self.from.x, self.to.y - self.from.y);
        let len = (dx * dx + dy * dy).sqrt();
        if len < f64::EPSILON {
            return None;
        }
        let (ux, uy) = (dx / len, dy / len);
        let head_len = (self.square_size * HEAD_LENGTH_RATIO).min(len);
        let half = self.square_size * HEAD_WIDTH_RATIO / 2.0;
        let base = Point {
            x: self.to.x - ux * head_len,
            y: self.to.y - uy * head_len,
        };
        let left = Point { x: base.x - uy * half, y: base.y + ux * half };
        let right = Point { x: base.x + uy * half, y: base.y - ux * half };
        Some(([self.to, left, right], base))
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{OVERLAY_ID}" viewBox="0 0 {w:.1} {h:.1}" style="position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;z-index:1000">"#,
            w = self.width,
            h = self.height,
        );
        match self.head() {
            Some((tip, base)) => {
                let _ = write!(
                    svg,
                    r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{ARROW_COLOR}" stroke-width="{:.1}" stroke-linecap="round" opacity="{ARROW_OPACITY}"/>"#,
                    self.from.x,
                    self.from.y,
                    base.x,
                    base.y,
                    self.stroke_width(),
                );
                let _ = write!(
                    svg,
                    r#"<polygon points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="{ARROW_COLOR}" opacity="{ARROW_OPACITY}"/>"#,
                    tip[0].x, tip[0].y, tip[1].x, tip[1].y, tip[2].x, tip[2].y,
                );
            }
            None => {
                let _ = write!(
                    svg,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{ARROW_COLOR}" opacity="{ARROW_OPACITY}"/>"#,
                    self.to.x,
                    self.to.y,
                    self.stroke_width(),
                );
            }
        }
        svg.push_str("</svg>");
        svg
    }
}

/// The board's single overlay slot.
#[derive(Debug, Default)]
pub struct OverlayLayer {
    arrow: Option<Arrow>,
}

impl OverlayLayer {
    pub fn arrow(&self) -> Option<&Arrow> {
        self.arrow.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.arrow.is_none()
    }

    pub fn to_svg(&self) -> Option<String> {
        self.arrow.as_ref().map(Arrow::to_svg)
    }
}

/// Remove the arrow, if any. Returns whether something was removed.
pub fn clear(layer: &mut OverlayLayer) -> bool {
    layer.arrow.take().is_some()
}

/// Replace the layer's contents with an arrow for `mv`. Leaves the layer
/// empty and returns `false` when the board has no usable layout box.
pub fn render(
    layer: &mut OverlayLayer,
    mv: &Move,
    doc: &Document,
    board: NodeId,
    profile: &HostProfile,
) -> bool {
    clear(layer);

    let Some(board_rect) = doc.element(board).rect().filter(|r| !r.is_empty()) else {
        warn!(mv = %mv, "Board has no layout box, overlay skipped");
        return false;
    };

    let from = square_center(doc, board, board_rect, mv.from, profile);
    let to = square_center(doc, board, board_rect, mv.to, profile);
    layer.arrow = Some(Arrow {
        mv: *mv,
        from,
        to,
        square_size: board_rect.width / 8.0,
        width: board_rect.width,
        height: board_rect.height,
    });
    true
}

/// Centre of `square` relative to the board: from the square's own element
/// when it has one, otherwise from the 8×8 grid and the current orientation.
pub fn square_center(
    doc: &Document,
    board: NodeId,
    board_rect: Rect,
    square: Square,
    profile: &HostProfile,
) -> Point {
    if let Some(rect) = profile
        .find_square_element(doc, board, square)
        .and_then(|el| el.rect())
    {
        let (cx, cy) = rect.center();
        return Point {
            x: cx - board_rect.x,
            y: cy - board_rect.y,
        };
    }
    let flipped = orientation::is_flipped(doc, board, profile);
    grid_center(board_rect, square, flipped)
}

/// Centre from equal divisions of the board box. Rank 1 is at the bottom
/// unless flipped; files mirror as well when flipped.
pub fn grid_center(board_rect: Rect, square: Square, flipped: bool) -> Point {
    let (sw, sh) = (board_rect.width / 8.0, board_rect.height / 8.0);
    let file = f64::from(square.file() - 1);
    let rank = f64::from(square.rank() - 1);
    let (col, row) = if flipped {
        (7.0 - file, rank)
    } else {
        (file, 7.0 - rank)
    };
    Point {
        x: col * sw + sw / 2.0,
        y: row * sh + sh / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementSpec;

    const BOARD: Rect = Rect { x: 100.0, y: 50.0, width: 400.0, height: 400.0 };

    fn sq(label: &str) -> Square {
        Square::from_label(label).unwrap()
    }

    fn doc(board: ElementSpec) -> Document {
        Document::from_tree(ElementSpec::new("body").with_child(board))
    }

    fn board_spec(classes: &str) -> ElementSpec {
        ElementSpec::new("chess-board")
            .with_classes(classes)
            .with_rect(BOARD.x, BOARD.y, BOARD.width, BOARD.height)
    }

    #[test]
    fn test_grid_center_normal() {
        assert_eq!(grid_center(BOARD, sq("a1"), false), Point { x: 25.0, y: 375.0 });
        assert_eq!(grid_center(BOARD, sq("h8"), false), Point { x: 375.0, y: 25.0 });
        assert_eq!(grid_center(BOARD, sq("e4"), false), Point { x: 225.0, y: 225.0 });
    }

    #[test]
    fn test_grid_center_flipped() {
        assert_eq!(grid_center(BOARD, sq("a1"), true), Point { x: 375.0, y: 25.0 });
        assert_eq!(grid_center(BOARD, sq("h8"), true), Point { x: 25.0, y: 375.0 });
    }

    #[test]
    fn test_prefers_square_element_box() {
        let d = doc(board_spec("board").with_child(
            ElementSpec::new("div")
                .with_classes("piece wp square-52")
                .with_rect(310.0, 360.0, 50.0, 50.0),
        ));
        let profile = HostProfile::default();
        let board = profile.find_board(&d).unwrap();
        assert_eq!(
            square_center(&d, board, BOARD, sq("e2"), &profile),
            Point { x: 235.0, y: 335.0 }
        );
    }

    #[test]
    fn test_fallback_uses_orientation() {
        let d = doc(board_spec("board flipped"));
        let profile = HostProfile::default();
        let board = profile.find_board(&d).unwrap();
        assert_eq!(
            square_center(&d, board, BOARD, sq("a1"), &profile),
            Point { x: 375.0, y: 25.0 }
        );
    }

    #[test]
    fn test_render_replaces_previous_arrow() {
        let d = doc(board_spec("board"));
        let profile = HostProfile::default();
        let board = profile.find_board(&d).unwrap();
        let mut layer = OverlayLayer::default();

        assert!(render(&mut layer, &Move::parse("e2e4").unwrap(), &d, board, &profile));
        assert!(render(&mut layer, &Move::parse("g1f3").unwrap(), &d, board, &profile));

        let arrow = layer.arrow().unwrap();
        assert_eq!(arrow.mv.to_string(), "g1f3");
        assert_eq!(arrow.square_size, 50.0);
        let svg = layer.to_svg().unwrap();
        assert_eq!(svg.matches("<svg").count(), 1);
        assert_eq!(svg.matches("<line").count(), 1);
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("pointer-events:none"));
    }

    #[test]
    fn test_render_without_layout_clears() {
        let d = doc(ElementSpec::new("chess-board"));
        let profile = HostProfile::default();
        let board = profile.find_board(&d).unwrap();
        let mut layer = OverlayLayer::default();
        assert!(!render(&mut layer, &Move::parse("e2e4").unwrap(), &d, board, &profile));
        assert!(layer.is_empty());
        assert!(!clear(&mut layer));
    }

    #[test]
    fn test_head_points_at_destination() {
        let arrow = Arrow {
            mv: Move::parse("e2e4").unwrap(),
            from: Point { x: 225.0, y: 325.0 },
            to: Point { x: 225.0, y: 225.0 },
            square_size: 50.0,
            width: 400.0,
            height: 400.0,
        };
        let (tri, base) = arrow.head().unwrap();
        assert_eq!(tri[0], arrow.to);
        assert!((base.y - 242.5).abs() < 1e-9);
        assert!((tri[1].x - tri[2].x).abs() > 0.0);
    }
}
