mod broker;
mod channel;
mod options;
mod reporter;

pub use broker::*;
pub use channel::*;
pub use options::*;
pub use reporter::BrokerStats;
