//! Helpers shared by the command-line binaries.

use crate::config::LayoutConfig;
use crate::hierarchic::GraphDocument;
use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Logs to stderr. `RUST_LOG` applies unless `-v` was given.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("lineage_layout=debug"),
        _ => EnvFilter::new("lineage_layout=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads a file, or stdin for "-".
pub fn read_source(path: &Path) -> Result<String> {
    if path.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Parses a graph document as JSON, or YAML for `.yaml`/`.yml` files. Input
/// without a telling extension tries JSON first.
pub fn parse_document(path: &Path, content: &str) -> Result<GraphDocument> {
    match extension(path).as_deref() {
        Some("yaml" | "yml") => {
            serde_yaml::from_str(content).context("Failed to parse graph document as YAML")
        }
        Some("json") => serde_json::from_str(content).context("Failed to parse graph document as JSON"),
        _ => serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .context("Failed to parse graph document as JSON or YAML"),
    }
}

/// Loads a layout config file, TOML or YAML by extension. Other extensions
/// try TOML first, then YAML.
pub fn load_config_file(path: &Path) -> Result<LayoutConfig> {
    if !path.is_file() {
        bail!("Config file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = match extension(path).as_deref() {
        Some("toml") => LayoutConfig::from_toml(&content)?,
        Some("yaml" | "yml") => LayoutConfig::from_yaml(&content)?,
        Some("json") => LayoutConfig::from_json(&content)?,
        _ => match LayoutConfig::from_toml(&content) {
            Ok(config) => config,
            Err(_) => LayoutConfig::from_yaml(&content)
                .context("Failed to parse config file as TOML or YAML")?,
        },
    };
    Ok(config)
}

/// Picks the config: a config file or preset when given, otherwise the
/// document's inline config, otherwise the defaults.
pub fn resolve_config(
    config_path: Option<&Path>,
    preset: Option<&str>,
    inline: Option<LayoutConfig>,
) -> Result<LayoutConfig> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }
    if let Some(name) = preset {
        return Ok(LayoutConfig::from_builtin(name)?);
    }
    match inline {
        Some(config) => {
            config.validate().context("Invalid inline config")?;
            Ok(config)
        }
        None => Ok(LayoutConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;

    #[test]
    fn documents_parse_from_json_or_yaml() {
        let json = r#"{"nodes":[{"id":"a"},{"id":"b"}],"edges":[{"id":"e","source":"a","target":"b"}]}"#;
        let doc = parse_document(Path::new("graph.json"), json).unwrap();
        assert_eq!(doc.nodes.len(), 2);

        let yaml = "nodes:\n  - id: a\nedges: []\nconfig:\n  layoutOrientation: TB\n";
        let doc = parse_document(Path::new("-"), yaml).unwrap();
        assert_eq!(doc.nodes[0].id, "a");
        assert_eq!(
            doc.config.map(|c| c.layout_orientation),
            Some(Orientation::TopToBottom)
        );
    }

    #[test]
    fn preset_wins_over_inline_config() {
        let inline = LayoutConfig {
            layout_orientation: Orientation::BottomToTop,
            ..LayoutConfig::default()
        };
        let config = resolve_config(None, Some("hierarchy"), Some(inline.clone())).unwrap();
        assert_eq!(config.layout_orientation, Orientation::TopToBottom);

        let config = resolve_config(None, None, Some(inline)).unwrap();
        assert_eq!(config.layout_orientation, Orientation::BottomToTop);
        assert!(resolve_config(Some(Path::new("/no/such/file.toml")), None, None).is_err());
    }
}
