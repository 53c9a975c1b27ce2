pub mod analytics;
pub mod error;
pub mod model;
pub mod model_info;
pub mod node_metrics;
pub mod position_metrics;

pub use analytics::*;
pub use error::*;
pub use model::*;
pub use model_info::*;
pub use node_metrics::*;
pub use position_metrics::*;
