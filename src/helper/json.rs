use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::helper::error::MapulaError;
use crate::helper::io::open_maybe_gz;

pub trait FromJsonString: Sized {
    fn from_json_string(json_str: &str) -> Result<Self, serde_json::Error>;

    /// Reads the whole file (gzipped or not) and parses it.
    fn from_json_file(path: &Path) -> Result<Self, MapulaError> {
        let mut json_str = String::new();
        open_maybe_gz(path)?.read_to_string(&mut json_str)?;
        Ok(Self::from_json_string(&json_str)?)
    }
}

impl<T> FromJsonString for T
where
    T: serde::de::DeserializeOwned,
{
    fn from_json_string(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

pub fn write_json_pretty<T: Serialize>(value: &T, path: &Path) -> Result<(), MapulaError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
