//! Reading and writing configurations as YAML files.
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Deserializes a value from the YAML file at `path`.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(serde_yaml::from_reader(BufReader::new(file))?)
}

/// Serializes `value` into the YAML file at `path`, overwriting it.
pub fn save<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    file.write_all(serde_yaml::to_string(value)?.as_bytes())?;
    Ok(())
}
