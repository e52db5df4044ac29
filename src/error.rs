use thiserror::Error;

/// Why a zone's boundary text could not be turned into polygons.
///
/// A zone carrying one of these is left off the map but stays available to
/// tabular views.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryParseError {
    #[error("geometry text is empty")]
    Empty,

    #[error("invalid WKT at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unsupported geometry kind `{0}`, expected POLYGON or MULTIPOLYGON")]
    Unsupported(String),

    #[error("ring is not closed: first position differs from last")]
    UnclosedRing,

    #[error("ring has {0} positions, at least 4 are required")]
    TooFewPositions(usize),

    #[error("coordinate is not a finite number")]
    NonFiniteCoordinate,
}

/// No usable values for the chosen attribute, so no color scale exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no usable values to build a color scale from")]
pub struct EmptyDomainError;

/// No geometries to derive a map center from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no geometries to center the map on")]
pub struct EmptyInputError;

/// The selection produced nothing that can be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no data for this selection: {group}")]
pub struct EmptySelectionError {
    pub group: String,
}
