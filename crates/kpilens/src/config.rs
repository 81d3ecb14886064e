//! Configuration

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{schema::InferenceOptions, source::SourceOptions};

#[derive(Debug, Error)]
pub enum Error {
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceOptions,
    pub fallback: FallbackOptions,
    pub inference: InferenceOptions,
}

/// Shape of the synthetic dataset used when a source cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackOptions {
    pub rows: usize,
    pub seed: u64,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self { rows: 200, seed: 42 }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(Error::Toml)
    }

    pub fn to_toml(&self) -> String {
        toml::to_string(self).expect("Cannot serialize configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }
}
