//! Multi-file configuration loading.
//!
//! The entry file may name other files with `include = "a.toml"` or
//! `include = ["a.toml", "b.toml"]`. Included tables are merged at the top
//! level; a section defined in two files is an error, as is a file included
//! twice.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
	base_path: PathBuf,
	/// Canonical paths already read.
	loaded_files: HashSet<PathBuf>,
	/// Top-level section name to the file defining it.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Reads `config_path` and its includes, then parses and validates the
	/// merged document.
	pub async fn load_config(&mut self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let entry = self.resolve_path(config_path)?;
		let content = self.read(&entry)?;
		let mut root: toml::Table = toml::from_str(&content)?;

		let includes = match root.remove("include") {
			None => return content.parse(),
			Some(value) => include_paths(&value)?,
		};

		for key in root.keys() {
			self.section_sources.insert(key.clone(), entry.clone());
		}

		for include in includes {
			let path = self.resolve_path(&include)?;
			let table: toml::Table = toml::from_str(&self.read(&path)?)?;

			for (key, value) in table {
				if let Some(existing) = self.section_sources.get(&key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' in {} and {}",
						key,
						existing.display(),
						path.display()
					)));
				}
				self.section_sources.insert(key.clone(), path.clone());
				root.insert(key, value);
			}
		}

		let merged = toml::to_string(&root)
			.map_err(|e| ConfigError::Parse(format!("Failed to merge config: {}", e)))?;
		merged.parse()
	}

	/// Reads a file once, with environment variables resolved.
	fn read(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = path.canonicalize()?;
		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"{} was already loaded (circular include)",
				canonical.display()
			)));
		}
		resolve_env_vars(&std::fs::read_to_string(path)?)
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

fn include_paths(value: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
