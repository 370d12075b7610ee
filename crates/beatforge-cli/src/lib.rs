//! Command implementations behind the `beatforge` binary.

pub mod commands;

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Reads a JSON document, naming the file on failure.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("invalid JSON in {}", path.display()))
}
