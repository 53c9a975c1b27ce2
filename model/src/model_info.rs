use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identifies a checkpoint of the network, named `<game>_<run>_<num>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelInfo {
    game_name: String,
    run_name: String,
    model_num: usize,
}

impl ModelInfo {
    pub fn new(game_name: String, run_name: String, model_num: usize) -> ModelInfo {
        ModelInfo {
            game_name,
            run_name,
            model_num,
        }
    }

    pub fn from_model_name(model_name: &str) -> Result<ModelInfo> {
        let parts: Vec<_> = model_name.split('_').collect();

        if parts.len() != 3 {
            return Err(anyhow!(
                "Model name {:?} is not of the form <game>_<run>_<num>",
                model_name
            ));
        }

        let model_num = parts[2]
            .parse()
            .with_context(|| format!("Model number in {:?} is not valid", model_name))?;

        Ok(ModelInfo::new(
            parts[0].to_string(),
            parts[1].to_string(),
            model_num,
        ))
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn model_num(&self) -> usize {
        self.model_num
    }

    pub fn model_name(&self) -> String {
        format!(
            "{}_{}_{:0>5}",
            self.game_name, self.run_name, self.model_num
        )
    }
}

impl Display for ModelInfo {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.model_name())
    }
}
