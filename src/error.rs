use geo_types::Coord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MakeValidError {
    #[error("Column too short to triangulate (left {left} points, right {right} points)")]
    ColumnTooShort { left: usize, right: usize },

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error("Worker panicked while processing {unit}: {message}")]
    WorkerPanic { unit: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Thread pool: {0}")]
    ThreadPool(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Why a ring walk across a column seam failed.
#[derive(Debug, Clone, PartialEq)]
pub enum StitchErrorKind {
    /// The walk did not return to its first point within the step bound.
    Unclosed { steps: usize },
    /// The walk closed with fewer than three points.
    DegenerateRing { points: usize },
}

/// Context for a failed merge of two adjacent ring columns.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Stitch failed merging [{left_x1}, {seam_x}] and [{seam_x}, {right_x2}] \
     (last seam {last_seam:?}): {kind:?}, walked {} points",
    .walked.len()
)]
pub struct StitchError {
    pub left_x1: f64,
    pub seam_x: f64,
    pub right_x2: f64,
    pub last_seam: Option<(f64, f64)>,
    pub walked: Vec<Coord<f64>>,
    pub kind: StitchErrorKind,
}

pub type Result<T> = std::result::Result<T, MakeValidError>;
