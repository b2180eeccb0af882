//! Host page markup: which classes, tags and attributes identify the board,
//! its pieces, square markers, clocks and player panels.
//!
//! Defaults follow chess.com markup (`piece wp square-52`, `clock-player-turn`).

use std::sync::LazyLock;

use board_core::Square;
use regex::Regex;

use crate::dom::{Document, Element, NodeId};

static PIECE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([wb])([prnbqk])$").expect("valid regex"));

static SQUARE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^square-(\d)(\d)$").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct HostProfile {
    pub board_tags: Vec<String>,
    pub board_ids: Vec<String>,
    pub board_classes: Vec<String>,
    pub piece_class: String,
    /// Attribute carrying a `wp`-style piece code.
    pub piece_attr: String,
    /// Attribute carrying a square label such as `e4`.
    pub square_attr: String,
    pub flipped_class: String,
    pub clock_classes: Vec<String>,
    pub active_clock_classes: Vec<String>,
    pub player_classes: Vec<String>,
    pub active_player_classes: Vec<String>,
    pub white_classes: Vec<String>,
    pub black_classes: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            board_tags: strings(&["chess-board", "wc-chess-board"]),
            board_ids: strings(&["board-layout-chessboard", "board-single"]),
            board_classes: strings(&["board"]),
            piece_class: "piece".to_string(),
            piece_attr: "data-piece".to_string(),
            square_attr: "data-square".to_string(),
            flipped_class: "flipped".to_string(),
            clock_classes: strings(&["clock-component", "clock"]),
            active_clock_classes: strings(&["clock-player-turn", "running", "active"]),
            player_classes: strings(&["player-component", "board-player", "player"]),
            active_player_classes: strings(&["active", "turn"]),
            white_classes: strings(&["white", "clock-white"]),
            black_classes: strings(&["black", "clock-black"]),
        }
    }
}

impl HostProfile {
    /// First element in document order matching any board selector,
    /// mirroring `querySelector("chess-board, #board-layout-chessboard, .board")`.
    pub fn find_board(&self, doc: &Document) -> Option<NodeId> {
        doc.all()
            .find(|el| self.is_board(el))
            .map(|el| el.node_id())
    }

    fn is_board(&self, el: &Element<'_>) -> bool {
        self.board_tags.iter().any(|t| t == el.tag())
            || el
                .html_id()
                .is_some_and(|id| self.board_ids.iter().any(|b| b == id))
            || el.has_any_class(&self.board_classes)
    }

    /// Square named by an element, from `data-square` or a `square-XY` class.
    pub fn square_marker(&self, el: &Element<'_>) -> Option<Square> {
        if let Some(sq) = el.attr(&self.square_attr).and_then(Square::from_label) {
            return Some(sq);
        }
        el.classes().find_map(|c| {
            let (file, rank) = square_token(c)?;
            Square::new(file, rank)
        })
    }

    /// First element under `board` marking `square` that has a layout box.
    pub fn find_square_element<'a>(
        &self,
        doc: &'a Document,
        board: NodeId,
        square: Square,
    ) -> Option<Element<'a>> {
        doc.descendants(board).find(|el| {
            el.rect().is_some_and(|r| !r.is_empty()) && self.square_marker(el) == Some(square)
        })
    }

    /// White/black decision from color classes on one element.
    pub fn color_marker(&self, el: &Element<'_>) -> Option<shakmaty::Color> {
        if el.has_any_class(&self.white_classes) {
            Some(shakmaty::Color::White)
        } else if el.has_any_class(&self.black_classes) {
            Some(shakmaty::Color::Black)
        } else {
            None
        }
    }
}

/// `wp` → `('w', 'p')`.
pub fn piece_token(class: &str) -> Option<(char, char)> {
    let caps = PIECE_TOKEN.captures(class)?;
    let color = caps[1].chars().next()?;
    let role = caps[2].chars().next()?;
    Some((color, role))
}

/// `square-52` → `(5, 2)`. Digits are not range-checked here.
pub fn square_token(class: &str) -> Option<(u8, u8)> {
    let caps = SQUARE_TOKEN.captures(class)?;
    let file = caps[1].parse().ok()?;
    let rank = caps[2].parse().ok()?;
    Some((file, rank))
}
