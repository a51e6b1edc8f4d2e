pub mod interval;
pub mod preferences;
pub mod video;

pub use interval::{IntervalKey, SkipInterval};
pub use preferences::{Sensitivity, UserPreferences};
pub use video::VideoId;
