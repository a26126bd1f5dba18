use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::template::DEFAULT_TIME_FORMAT;

pub const CONFIG_FILE: &str = "batchsave.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub output_dir: PathBuf,
    pub time_format: String,
    pub filename: String,
    pub path: String,
    pub extension: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            filename: "%time_%seed".to_string(),
            path: String::new(),
            extension: "png".to_string(),
        }
    }
}

pub fn load_defaults(config_dir: &Path) -> Result<Defaults> {
    let path = config_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Não foi possível ler {}", path.display()))?;
    let defaults: Defaults =
        toml::from_str(&content).with_context(|| format!("Erro ao parsear {}", path.display()))?;
    Ok(defaults)
}

/// Como [`load_defaults`], mas sem arquivo usa os valores padrão.
/// Arquivo presente e inválido continua sendo erro.
pub fn load_defaults_or_builtin(config_dir: &Path) -> Result<Defaults> {
    if config_dir.join(CONFIG_FILE).exists() {
        load_defaults(config_dir)
    } else {
        Ok(Defaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let defaults: Defaults = toml::from_str(
            r#"
            output_dir = "/tmp/renders"
            extension = "webp"
            "#,
        )
        .unwrap();
        assert_eq!(defaults.output_dir, PathBuf::from("/tmp/renders"));
        assert_eq!(defaults.extension, "webp");
        assert_eq!(defaults.filename, "%time_%seed");
        assert_eq!(defaults.path, "");
        assert_eq!(defaults.time_format, DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn test_missing_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_defaults_or_builtin(dir.path()).unwrap(), Defaults::default());
        assert!(load_defaults(dir.path()).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "extension = [").unwrap();
        let err = load_defaults_or_builtin(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Erro ao parsear"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "filename = \"%model_%counter\"\npath = \"%date\"\n",
        )
        .unwrap();
        let defaults = load_defaults(dir.path()).unwrap();
        assert_eq!(defaults.filename, "%model_%counter");
        assert_eq!(defaults.path, "%date");
        assert_eq!(defaults.extension, "png");
    }
}
