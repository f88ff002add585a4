pub mod logger;

pub use logger::{PaperLog, ReviewLog, ReviewLogger};
