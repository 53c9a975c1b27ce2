pub mod options;
pub mod play_self_one;
pub mod repetition;
pub mod self_play;
pub mod self_play_metrics;

pub use options::*;
pub use play_self_one::*;
pub use repetition::*;
pub use self_play::*;
pub use self_play_metrics::*;
