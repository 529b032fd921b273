pub mod clock;
pub mod parameter_error_handler;
pub mod text;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use parameter_error_handler::{json_error_handler, query_error_handler};
pub use text::truncate_chars;
pub use validate::{validate_student_item, validate_submission_uuid};
