pub mod queue;

pub use queue::{UploadConfig, UploadQueue};
