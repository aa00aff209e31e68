pub mod assemble;
pub mod classifier;
pub mod column;
pub mod construct;
pub mod error;
pub mod make_valid;
pub mod noding;
pub mod primitives;
pub mod stitch;
pub mod utils;


pub use classifier::{AlwaysInside, Classifier, Classify};
pub use error::{MakeValidError, Result, StitchError, StitchErrorKind};
pub use make_valid::{make_valid, MakeValid};
pub use primitives::{Label, Pt, Segment};
