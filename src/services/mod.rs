pub mod peer;
pub mod rubric_index;

pub use peer::{PeerAssessmentService, PeerSettings};
pub use rubric_index::RubricIndex;
