//! Board orientation: is black rendered at the bottom?

use board_core::Square;
use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::profile::HostProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSource {
    /// a1 and a8 markers compared by their rendered top offset.
    Geometry,
    /// An explicit `flipped` class on the board or an ancestor.
    ClassMarker,
    /// No signal; assumed white at the bottom.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub flipped: bool,
    pub source: OrientationSource,
}

/// Detect orientation from the current layout. Never cache the result:
/// host re-layout invalidates it.
pub fn detect(doc: &Document, board: NodeId, profile: &HostProfile) -> Orientation {
    let a1 = profile.find_square_element(doc, board, Square::A1);
    let a8 = profile.find_square_element(doc, board, Square::A8);

    if let (Some(a1), Some(a8)) = (a1.and_then(|e| e.rect()), a8.and_then(|e| e.rect())) {
        return Orientation {
            flipped: a1.top() < a8.top(),
            source: OrientationSource::Geometry,
        };
    }

    let root = doc.element(board);
    let marked = root.has_class(&profile.flipped_class)
        || root.ancestors().any(|el| el.has_class(&profile.flipped_class));
    if marked {
        return Orientation {
            flipped: true,
            source: OrientationSource::ClassMarker,
        };
    }

    debug!("Orientation undetermined, assuming white at bottom");
    Orientation {
        flipped: false,
        source: OrientationSource::Default,
    }
}

pub fn is_flipped(doc: &Document, board: NodeId, profile: &HostProfile) -> bool {
    detect(doc, board, profile).flipped
}
