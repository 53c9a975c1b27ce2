mod edge;
mod error;
pub mod mcts;
#[cfg(test)]
mod mcts_tests;
mod node;
pub mod node_details;
mod noise;
pub mod options;
pub mod resign;
mod selection;
pub mod temp;
pub mod tree;

pub use edge::*;
pub use error::*;
pub use mcts::*;
pub use node::*;
pub use node_details::*;
pub use noise::*;
pub use options::*;
pub use resign::*;
pub use selection::*;
pub use temp::*;
pub use tree::*;
