//! 8×8 board model and the position string handed to the engine.

use shakmaty::{Color, Piece, Role};

use crate::square::Square;

/// Castling, en-passant and move counters. Not derived from game history.
pub const PLACEHOLDER_AUX_FIELDS: &str = "KQkq - 0 1";

pub const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

/// Grid of optional pieces, row 0 = rank 8, column 0 = file a.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        let (row, col) = square.grid_index();
        self.cells[row][col]
    }

    /// Place a piece, returning whatever occupied the square before.
    pub fn set(&mut self, square: Square, piece: Piece) -> Option<Piece> {
        let (row, col) = square.grid_index();
        self.cells[row][col].replace(piece)
    }

    pub fn remove(&mut self, square: Square) -> Option<Piece> {
        let (row, col) = square.grid_index();
        self.cells[row][col].take()
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Squares whose contents differ between `self` and `other`.
    pub fn diff(&self, other: &Board) -> Vec<Square> {
        Square::all()
            .filter(|&sq| self.get(sq) != other.get(sq))
            .collect()
    }

    /// Piece-placement field: ranks 8→1 separated by `/`, empty runs as digits.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for (r, row) in self.cells.iter().enumerate() {
            let mut empty = 0u8;
            for cell in row {
                match cell {
                    Some(piece) => {
                        if empty > 0 {
                            out.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        out.push(piece_char(*piece));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push((b'0' + empty) as char);
            }
            if r < 7 {
                out.push('/');
            }
        }
        out
    }
}

/// Extracted board plus the side the caller says is to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub board: Board,
    pub side_to_move: Color,
}

impl Position {
    pub fn new(board: Board, side_to_move: Color) -> Self {
        Self { board, side_to_move }
    }

    /// FEN-like string. Only placement and side to move are meaningful;
    /// the remaining fields are [`PLACEHOLDER_AUX_FIELDS`].
    pub fn fen(&self) -> String {
        format!(
            "{} {} {}",
            self.board.placement(),
            color_char(self.side_to_move),
            PLACEHOLDER_AUX_FIELDS
        )
    }
}

pub fn color_char(color: Color) -> char {
    match color {
        Color::White => 'w',
        Color::Black => 'b',
    }
}

pub fn color_from_char(c: char) -> Option<Color> {
    match c {
        'w' => Some(Color::White),
        'b' => Some(Color::Black),
        _ => None,
    }
}

/// Lowercase role letter (`p n b r q k`).
pub fn role_char(role: Role) -> char {
    match role {
        Role::Pawn => 'p',
        Role::Knight => 'n',
        Role::Bishop => 'b',
        Role::Rook => 'r',
        Role::Queen => 'q',
        Role::King => 'k',
    }
}

/// Accepts either case.
pub fn role_from_char(c: char) -> Option<Role> {
    match c.to_ascii_lowercase() {
        'p' => Some(Role::Pawn),
        'n' => Some(Role::Knight),
        'b' => Some(Role::Bishop),
        'r' => Some(Role::Rook),
        'q' => Some(Role::Queen),
        'k' => Some(Role::King),
        _ => None,
    }
}

/// Uppercase for white, lowercase for black.
pub fn piece_char(piece: Piece) -> char {
    let c = role_char(piece.role);
    match piece.color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}
