use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

use crate::common::ConfigValue;

pub mod watcher;

pub const CONFIG_DIR_NAME: &str = "linkding-launcher";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub fn get_config_file_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Key-value view over the config file.
///
/// Entries missing from the file are created with their defaults while plugins
/// read them, and the builder remembers whether anything was added or changed
/// so the file is only rewritten when needed.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    path: PathBuf,
    config: Table,
    dirty: bool,
}

impl ConfigBuilder {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(get_config_file_path()?)
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = match fs::read_to_string(&path) {
            Ok(file) => file.parse::<Table>()?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Table::default(),
            Err(err) => return Err(ConfigError::Read { path, source: err }),
        };
        Ok(Self {
            path,
            config,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the file if anything changed since it was loaded.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, self.config.to_string()).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved config to {}", self.path.display());
        self.dirty = false;
        Ok(())
    }

    pub fn get_or_create<T: FromConfig + ToConfig>(
        &mut self,
        name: &'static str,
        value: T,
    ) -> Result<T, ConfigError> {
        let entry = self.config.entry(name).or_insert_with(|| {
            self.dirty = true;
            value.to_config()
        });
        T::from_config(entry).ok_or(ConfigError::BadEntry {
            name: name.into(),
            message: None,
        })
    }

    pub fn put<T: ToConfig>(&mut self, name: &'static str, value: T) {
        let value = value.to_config();
        if self.config.get(name) != Some(&value) {
            self.config.insert(name.into(), value);
            self.dirty = true;
        }
    }

    /// Runs `callback` on the sub-table `name`, creating it when missing.
    pub fn group(
        &mut self,
        name: &'static str,
        callback: impl FnOnce(&mut ConfigBuilder) -> Result<(), ConfigError>,
    ) -> Result<(), ConfigError> {
        let table = match self.config.remove(name) {
            Some(Value::Table(table)) => table,
            Some(other) => {
                self.config.insert(name.into(), other);
                return Err(ConfigError::BadEntry {
                    name: name.into(),
                    message: Some("expected a table".into()),
                });
            }
            None => {
                self.dirty = true;
                Table::new()
            }
        };

        let mut group = ConfigBuilder {
            path: self.path.clone(),
            config: table,
            dirty: false,
        };
        let result = callback(&mut group);
        self.dirty |= group.dirty;
        self.config.insert(name.into(), Value::Table(group.config));
        result
    }

    /// Sets a dotted key such as `linkding_plugin.cache_length`, creating
    /// intermediate tables.
    pub fn set(&mut self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop().filter(|s| !s.is_empty()) else {
            return Err(ConfigError::BadEntry {
                name: key.into(),
                message: Some("empty key".into()),
            });
        };

        let mut table = &mut self.config;
        for segment in segments {
            let entry = table
                .entry(segment)
                .or_insert_with(|| Value::Table(Table::new()));
            table = entry.as_table_mut().ok_or_else(|| ConfigError::BadEntry {
                name: key.into(),
                message: Some(format!("{segment} is not a table")),
            })?;
        }

        let value = value.to_config();
        if table.get(last) != Some(&value) {
            table.insert(last.into(), value);
            self.dirty = true;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the config directory")]
    NoConfigDir,
    #[error("could not read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("bad config entry {name}: {}", .message.as_deref().unwrap_or("unexpected type"))]
    BadEntry {
        name: String,
        message: Option<String>,
    },
}

pub trait FromConfig {
    fn from_config(raw: &Value) -> Option<Self>
    where
        Self: Sized;
}

pub trait ToConfig {
    fn to_config(self) -> Value;
}

macro_rules! impl_for_integers {
    ($($int_type:ty),*) => {
        $(
            impl FromConfig for $int_type {
                fn from_config(raw: &Value) -> Option<Self> {
                    raw.as_integer().and_then(|x| Self::try_from(x).ok())
                }
            }
            impl ToConfig for $int_type {
                fn to_config(self) -> Value {
                    Value::Integer(self as i64)
                }
            }
        )*
    };
}

impl_for_integers!(i32, i64, u32, u64, usize);

impl FromConfig for bool {
    fn from_config(raw: &Value) -> Option<Self> {
        raw.as_bool()
    }
}
impl ToConfig for bool {
    fn to_config(self) -> Value {
        Value::Boolean(self)
    }
}

impl FromConfig for String {
    fn from_config(raw: &Value) -> Option<Self> {
        Some(raw.as_str()?.to_string())
    }
}
impl ToConfig for String {
    fn to_config(self) -> Value {
        Value::String(self)
    }
}

impl ToConfig for ConfigValue {
    fn to_config(self) -> Value {
        match self {
            ConfigValue::Integer(int) => Value::Integer(int),
            ConfigValue::Boolean(boolean) => Value::Boolean(boolean),
            ConfigValue::String(string) => Value::String(string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_in(dir: &tempfile::TempDir) -> ConfigBuilder {
        ConfigBuilder::load(dir.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)).unwrap()
    }

    #[test]
    fn missing_file_starts_empty_and_defaults_are_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = builder_in(&dir);
        assert!(!builder.is_dirty());

        builder
            .group("linkding_plugin", |group| {
                assert_eq!(group.get_or_create("cache_length", 15i64)?, 15);
                Ok(())
            })
            .unwrap();
        assert!(builder.is_dirty());
        builder.save().unwrap();
        assert!(builder.path().exists());

        let mut reloaded = builder_in(&dir);
        reloaded
            .group("linkding_plugin", |group| {
                assert_eq!(group.get_or_create("cache_length", 99i64)?, 15);
                Ok(())
            })
            .unwrap();
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn set_creates_nested_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = builder_in(&dir);
        builder
            .set("linkding_plugin.api_key", ConfigValue::String("secret".into()))
            .unwrap();
        builder.save().unwrap();

        let written = fs::read_to_string(builder.path()).unwrap();
        let table: Table = written.parse().unwrap();
        assert_eq!(
            table["linkding_plugin"]["api_key"].as_str(),
            Some("secret")
        );
    }

    #[test]
    fn set_refuses_to_descend_into_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = builder_in(&dir);
        builder.set("trigger", ConfigValue::String("ld ".into())).unwrap();
        assert!(matches!(
            builder.set("trigger.inner", ConfigValue::Integer(1)),
            Err(ConfigError::BadEntry { .. })
        ));
    }

    #[test]
    fn wrongly_typed_entries_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[linkding_plugin]\ncache_length = \"soon\"\n").unwrap();

        let mut builder = ConfigBuilder::load(&path).unwrap();
        let result = builder.group("linkding_plugin", |group| {
            group.get_or_create("cache_length", 15i64)?;
            Ok(())
        });
        assert!(matches!(result, Err(ConfigError::BadEntry { .. })));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "linkding_plugin = [").unwrap();
        assert!(matches!(
            ConfigBuilder::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn put_only_marks_real_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = builder_in(&dir);
        builder.put("cache_length", 1i64);
        builder.save().unwrap();
        builder.put("cache_length", 1i64);
        assert!(!builder.is_dirty());
    }
}
