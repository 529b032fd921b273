pub mod assessments;
pub mod common;
pub mod peer;
pub mod rubrics;
pub mod submissions;

pub use common::error_code::ErrorCode;
pub use common::response::ApiResponse;
