use thiserror::Error;

/// Errors surfaced by the composition core and the PDF renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// A style name was used that is not registered.
    #[error("unknown style: {0:?}")]
    UnknownStyle(String),

    /// A style with the same name is already registered.
    #[error("style {0:?} is already defined")]
    DuplicateStyle(String),

    /// A style referenced a parent that is not registered.
    #[error("unknown parent style: {0:?}")]
    UnknownParent(String),

    /// The content model was mutated after `freeze()`.
    #[error("content model is frozen")]
    FrozenModel,

    /// Explicit table column widths exceed the available width.
    #[error(
        "explicit column widths sum to {requested:.1}pt but only {available:.1}pt is available \
         (columns {columns:?})"
    )]
    OverconstrainedWidth {
        available: f32,
        requested: f32,
        columns: Vec<usize>,
    },

    /// A table row has a different column count than the first row.
    #[error("table row {row} has {found} columns, expected {expected}")]
    RaggedTable {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// A region override references rows or columns outside the table grid.
    #[error("table region {rows:?} x {cols:?} is outside a {nrows}x{ncols} grid")]
    InvalidRegion {
        rows: (usize, usize),
        cols: (usize, usize),
        nrows: usize,
        ncols: usize,
    },

    /// Font data could not be parsed when registering a TrueType font.
    #[error("invalid font data for {family:?}")]
    InvalidFont { family: String },

    /// Image data could not be decoded or probed for dimensions.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
