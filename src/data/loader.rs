use std::path::Path;
use thiserror::Error;

use super::schema::DataFile;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Could not read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Duplicate item id in catalog: {0}")]
    DuplicateItem(String),
}

pub fn parse_data(text: &str) -> Result<DataFile, DataError> {
    let data: DataFile = toml::from_str(text)?;

    let mut seen = std::collections::HashSet::new();
    for entry in &data.items {
        if !seen.insert(entry.id.to_ascii_lowercase()) {
            return Err(DataError::DuplicateItem(entry.id.clone()));
        }
    }
    Ok(data)
}

pub fn load_data_file(path: impl AsRef<Path>) -> Result<DataFile, DataError> {
    let text = std::fs::read_to_string(path)?;
    parse_data(&text)
}
