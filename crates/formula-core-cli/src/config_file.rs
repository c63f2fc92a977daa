use std::{fs, io, path::Path};

use formula_core::FormulaConfig;
use serde::Deserialize;

/// Contents of a `--config` file. Notation keys sit at the top level.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    #[serde(flatten)]
    pub formula: FormulaConfig,
}

/// Why a notation file could not be used.
#[derive(Debug)]
pub enum ConfigError {
    Read(io::Error),
    /// The file is not TOML, or a key has the wrong type.
    Syntax(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(err) => write!(f, "cannot read notation file: {}", err),
            ConfigError::Syntax(err) => write!(f, "malformed notation file: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(err) => Some(err),
            ConfigError::Syntax(err) => Some(err),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Read(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Syntax(err)
    }
}

/// Loads the notation settings from a TOML file.
///
/// A file looks like this:
///
/// ```toml
/// brace-superscripts = false
///
/// [symbols]
/// degC = "\\degC"
/// ```
///
/// Every key is optional; missing keys keep their defaults.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&fs::read_to_string(path)?)
}

fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_and_flags() {
        let content = r#"
brace-superscripts = false

[symbols]
degC = "\\degC"
ohm = "\\ohm"
        "#;
        let config = parse_config(content).unwrap();
        assert!(!config.formula.brace_superscripts);
        assert_eq!(
            config.formula.symbols,
            [
                ("degC".to_string(), "\\degC".to_string()),
                ("ohm".to_string(), "\\ohm".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_files() {
        assert!(matches!(parse_config("degC"), Err(ConfigError::Syntax(_))));
        let err = parse_config("brace-superscripts = \"no\"").unwrap_err();
        assert!(err.to_string().starts_with("malformed notation file: "));
    }

    #[test]
    fn missing_keys_keep_their_defaults() {
        let content = r#"
[symbols]
degC = "\\degC"
        "#;
        let config = parse_config(content).unwrap();
        assert!(config.formula.brace_superscripts);
        assert_eq!(config.formula.symbols.len(), 1);
    }

    #[test]
    fn reading_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formula.toml");
        fs::write(&path, "brace-superscripts = false\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert!(!config.formula.brace_superscripts);
        let missing = load_config_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read(_))));
    }
}
