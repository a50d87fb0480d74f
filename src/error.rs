use crate::geometry::{Loc, Rect};

/// Structural invariant violations. Running out of attempts is not an error; those outcomes
/// come back as `None` or a short `PathOutcome` instead.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GenError {
    #[error("room template declares size {declared:?} but its content is {actual:?}")]
    TemplateSizeMismatch { declared: Loc, actual: Loc },
    #[error("room shape asked to prepare unsupported size {0:?}")]
    UnsupportedSize(Loc),
    #[error("filter references undefined tag {0:?}")]
    UnknownTag(String),
    #[error("grid room {bounds:?} lies outside the {width}x{height} grid")]
    GridOutOfBounds { bounds: Rect, width: i32, height: i32 },
    #[error("grid cell {0:?} is already occupied")]
    CellOccupied(Loc),
    #[error("cells {0:?} and {1:?} are not orthogonal neighbors")]
    NotNeighbors(Loc, Loc),
    #[error("random range [{min}, {max}] is empty")]
    EmptyRange { min: i32, max: i32 },
    #[error("spawn pool {0:?} has no positive weights")]
    EmptyPool(&'static str),
    #[error("bad configuration: {0}")]
    Config(String),
}

pub type GenResult<T> = Result<T, GenError>;
