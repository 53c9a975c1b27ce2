use anyhow::Result;
use common::{get_env_duration, get_env_usize, Config, ConfigLoader};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EVAL_BATCH_SIZE: usize = 32;
const EVAL_BATCH_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BrokerOptions {
    /// Maximum number of requests sent to the predictor in one call.
    pub eval_batch_size: usize,
    /// How long a partial batch waits for more requests after its first one arrives.
    pub eval_batch_timeout: Duration,
}

impl BrokerOptions {
    pub fn new(eval_batch_size: usize, eval_batch_timeout: Duration) -> Self {
        assert!(eval_batch_size > 0, "eval_batch_size must be positive");

        Self {
            eval_batch_size,
            eval_batch_timeout,
        }
    }

    /// Reads `EVAL_BATCH_SIZE` and `EVAL_BATCH_TIMEOUT`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            get_env_usize("EVAL_BATCH_SIZE")?.unwrap_or(EVAL_BATCH_SIZE),
            get_env_duration("EVAL_BATCH_TIMEOUT")?.unwrap_or(EVAL_BATCH_TIMEOUT),
        ))
    }
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self::new(EVAL_BATCH_SIZE, EVAL_BATCH_TIMEOUT)
    }
}

impl Config for BrokerOptions {
    fn load(config: &ConfigLoader) -> Result<Self> {
        Ok(Self::new(
            config
                .get("eval_batch_size")
                .and_then(|v| v.as_usize())
                .unwrap_or(EVAL_BATCH_SIZE)
                .max(1),
            config
                .get("eval_batch_timeout")
                .and_then(|v| v.as_duration())
                .unwrap_or(EVAL_BATCH_TIMEOUT),
        ))
    }
}
