use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{Context, Result};
use hocon::{Hocon, HoconLoader};

/// Reads typed settings from a HOCON document.
///
/// Lookups resolve in order: an environment variable of the same name, the key inside `scope`,
/// then the key at the document root.
#[derive(Debug)]
pub struct ConfigLoader {
    hocon: Hocon,
    env: HashMap<String, String>,
    scope: String,
}

impl ConfigLoader {
    pub fn new(path: impl AsRef<Path>, scope: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();

        let hocon = HoconLoader::new()
            .load_file(path)
            .with_context(|| format!("Failed to find or load config file at: {:?}", path))?
            .hocon()
            .with_context(|| format!("Failed to parse config file at: {:?}", path))?;

        Ok(Self::from_hocon(hocon, std::env::vars().collect(), scope))
    }

    pub fn from_str(contents: &str, scope: impl Into<String>) -> Result<Self> {
        let hocon = HoconLoader::new()
            .load_str(contents)
            .context("Failed to load config contents")?
            .hocon()
            .context("Failed to parse config contents")?;

        Ok(Self::from_hocon(hocon, HashMap::new(), scope))
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    fn from_hocon(hocon: Hocon, env: HashMap<String, String>, scope: impl Into<String>) -> Self {
        Self {
            hocon,
            env,
            scope: scope.into(),
        }
    }

    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            hocon: self.hocon.clone(),
            env: self.env.clone(),
            scope: scope.into(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.env.get(name) {
            return Some(Value::String(value.clone()));
        }

        let scope = &self.hocon[self.scope.as_str()];
        if matches!(scope, Hocon::Hash(_)) {
            if let Some(value) = Self::map_hocon(scope, name) {
                return Some(value);
            }
        }

        Self::map_hocon(&self.hocon, name)
    }

    pub fn load<T: Config>(&self) -> Result<T> {
        T::load(self)
    }

    fn map_hocon(hocon: &Hocon, name: &str) -> Option<Value> {
        match &hocon[name] {
            Hocon::Real(f64) => Some(Value::Float(*f64 as f32)),
            Hocon::Integer(i64) => Some(Value::Integer(*i64)),
            Hocon::String(string) => Some(Value::String(string.clone())),
            Hocon::Boolean(bool) => Some(Value::Boolean(*bool)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f32),
    Boolean(bool),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(val) => Some(*val),
            Value::String(val) => Hocon::String(val.clone()).as_bool(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(val) => usize::try_from(*val).ok(),
            Value::String(val) => val.trim().parse::<usize>().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(val) => u64::try_from(*val).ok(),
            Value::String(val) => val.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(val) => Some(*val),
            Value::Integer(val) => Some(*val as f32),
            Value::String(val) => val.trim().parse::<f32>().ok(),
            _ => None,
        }
    }

    /// Integers are read as milliseconds. Strings may carry a `us`, `ms` or `s` suffix.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Integer(val) => u64::try_from(*val).ok().map(Duration::from_millis),
            Value::String(val) => parse_duration(val),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(val) => Some(val.clone()),
            Value::Boolean(true) => Some("true".to_string()),
            Value::Boolean(false) => Some("false".to_string()),
            Value::Float(val) => Some(val.to_string()),
            Value::Integer(val) => Some(val.to_string()),
        }
    }
}

pub fn parse_duration(val: &str) -> Option<Duration> {
    let val = val.trim();

    let (digits, unit) = match val.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => val.split_at(idx),
        None => (val, "ms"),
    };

    let amount = digits.parse::<u64>().ok()?;

    match unit.trim() {
        "us" | "micros" => Some(Duration::from_micros(amount)),
        "ms" | "millis" => Some(Duration::from_millis(amount)),
        "s" | "secs" => Some(Duration::from_secs(amount)),
        _ => None,
    }
}

pub trait Config {
    fn load(config: &ConfigLoader) -> Result<Self>
    where
        Self: Sized;
}
