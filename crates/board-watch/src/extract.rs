//! DOM → board extraction.
//!
//! Each piece node is read once into a [`PieceDescriptor`] of raw fields;
//! validation happens afterwards so that a malformed node drops only itself.

use board_core::board::{color_from_char, role_from_char};
use board_core::{Board, Color, Piece, Position, Square};
use tracing::{debug, warn};

use crate::dom::{Document, Element};
use crate::error::WatchError;
use crate::profile::{piece_token, square_token, HostProfile};

/// Unvalidated fields read from one piece node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PieceDescriptor {
    pub color: Option<char>,
    pub role: Option<char>,
    pub file: Option<u8>,
    pub rank: Option<u8>,
}

impl PieceDescriptor {
    /// Read `data-piece` / `data-square` attributes, falling back to
    /// `wp`-style and `square-XY` class tokens.
    pub fn read(el: &Element<'_>, profile: &HostProfile) -> Self {
        let mut desc = Self::default();

        let code = el
            .attr(&profile.piece_attr)
            .map(|code| {
                let mut chars = code.chars();
                (chars.next(), chars.next())
            })
            .or_else(|| {
                el.classes()
                    .find_map(piece_token)
                    .map(|(c, r)| (Some(c), Some(r)))
            });
        if let Some((color, role)) = code {
            desc.color = color;
            desc.role = role;
        }

        let coords = el
            .attr(&profile.square_attr)
            .and_then(Square::from_label)
            .map(|sq| (sq.file(), sq.rank()))
            .or_else(|| el.classes().find_map(square_token));
        if let Some((file, rank)) = coords {
            desc.file = Some(file);
            desc.rank = Some(rank);
        }

        desc
    }

    pub fn piece(&self) -> Option<Piece> {
        Some(Piece {
            color: color_from_char(self.color?)?,
            role: role_from_char(self.role?)?,
        })
    }

    pub fn square(&self) -> Option<Square> {
        Square::new(self.file?, self.rank?)
    }
}

/// Result of one extraction. `skipped` counts piece nodes that could not be
/// placed; the board is still usable when it is non-zero.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub position: Position,
    pub skipped: usize,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }

    pub fn fen(&self) -> String {
        self.position.fen()
    }
}

/// Build a board from descriptors. Later descriptors on an occupied square
/// replace the earlier piece and count as skipped.
pub fn board_from_descriptors<I>(descriptors: I) -> (Board, usize)
where
    I: IntoIterator<Item = PieceDescriptor>,
{
    let mut board = Board::empty();
    let mut skipped = 0;
    for desc in descriptors {
        match (desc.piece(), desc.square()) {
            (Some(piece), Some(square)) => {
                if board.set(square, piece).is_some() {
                    debug!(square = %square, "Duplicate piece on square");
                    skipped += 1;
                }
            }
            _ => {
                debug!(?desc, "Unparseable piece descriptor");
                skipped += 1;
            }
        }
    }
    (board, skipped)
}

/// Extract the position from a snapshot. `side_to_move` is the caller's
/// tracked color; it is not inferred from the board.
pub fn extract(
    doc: &Document,
    profile: &HostProfile,
    side_to_move: Color,
) -> Result<Extraction, WatchError> {
    let board_root = profile.find_board(doc).ok_or(WatchError::BoardNotFound)?;

    let descriptors = doc
        .descendants(board_root)
        .filter(|el| el.has_class(&profile.piece_class))
        .map(|el| PieceDescriptor::read(&el, profile));
    let (board, skipped) = board_from_descriptors(descriptors);

    if skipped > 0 {
        warn!(
            skipped,
            placed = board.piece_count(),
            "Extraction incomplete"
        );
    }

    Ok(Extraction {
        position: Position::new(board, side_to_move),
        skipped,
    })
}
