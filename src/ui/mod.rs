pub mod progress;

pub use progress::{ProgressTracker, StageProgress, StageStats};
