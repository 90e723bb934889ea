pub mod cancel;
pub mod error;

pub use cancel::{CANCELLED_BEFORE_START, CancelSignal};
pub use error::{ErrorCategory, Result, SeoError};
