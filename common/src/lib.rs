pub mod config;
pub mod env;
pub mod rng;

pub use config::*;
pub use env::*;
pub use rng::*;
