use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::parse_duration;

pub fn get_env_usize(key: &str) -> Result<Option<usize>> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| anyhow!("{} must be a valid number, found {:?}", key, v))
        })
        .transpose()
}

pub fn get_env_duration(key: &str) -> Result<Option<Duration>> {
    std::env::var(key)
        .ok()
        .map(|v| {
            parse_duration(&v)
                .ok_or_else(|| anyhow!("{} must be a duration such as 2ms, found {:?}", key, v))
        })
        .transpose()
}
