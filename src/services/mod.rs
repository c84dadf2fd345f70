pub mod comments;
pub mod ratings;
pub mod uploads;

pub use comments::{CommentService, CommentTree};
pub use ratings::RatingEngine;
pub use uploads::{UploadFile, UploadOrchestrator};
