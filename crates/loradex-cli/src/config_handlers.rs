//! Handler functions for `loradex config {path,show}`.

use crate::cli::ConfigAction;
use crate::config::LoradexConfig;
use loradex_core::{Error, Result};

/// Handle a config subcommand, returning the text to print.
///
/// Receives the raw `--config` path (not a loaded config) because `path`
/// works before a config file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<String> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path),
        ConfigAction::Show => LoradexConfig::load(config_path)?.to_toml_string(),
    }
}

/// The resolved config file path.
fn cmd_config_path(config_path: Option<&str>) -> Result<String> {
    match LoradexConfig::resolve_config_path(config_path) {
        Some(path) => {
            if !path.exists() {
                log::info!("{} does not exist; built-in defaults apply", path.display());
            }
            Ok(path.display().to_string())
        }
        None => Err(Error::config(
            "Could not determine config directory for this platform",
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_explicit() {
        let out = handle_config_command(Some("/tmp/loradex.toml"), ConfigAction::Path).unwrap();
        assert_eq!(out, "/tmp/loradex.toml");
    }

    #[test]
    fn test_config_show_reflects_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\ndevice = \"cpu\"\n").unwrap();

        let out =
            handle_config_command(path.to_str(), ConfigAction::Show).unwrap();
        let shown: LoradexConfig = toml::from_str(&out).unwrap();
        assert_eq!(shown.retrieval.device(), "cpu");
    }
}
