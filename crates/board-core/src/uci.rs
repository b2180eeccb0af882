//! Coordinate move tokens as printed by UCI engines (`e2e4`, `e7e8q`).

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use shakmaty::uci::UciMove;
use shakmaty::Role;

use crate::board::role_char;
use crate::error::CoreError;
use crate::square::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl Move {
    /// Parse a 4–5 character token. Drops (`Q@e4`) and the null move are rejected.
    pub fn parse(token: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidMove(token.to_string());
        if !(4..=5).contains(&token.len()) {
            return Err(invalid());
        }
        match UciMove::from_ascii(token.as_bytes()).map_err(|_| invalid())? {
            UciMove::Normal { from, to, promotion } => {
                if promotion == Some(Role::Pawn) {
                    return Err(invalid());
                }
                Ok(Self {
                    from: Square::from_label(&from.to_string()).ok_or_else(invalid)?,
                    to: Square::from_label(&to.to_string()).ok_or_else(invalid)?,
                    promotion,
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role_char(role))?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Move {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
