//! Node configuration from a file

use std::fs;
use std::path::Path;

use hazardguard_core::config::{NodeConfig, RuntimeConfig};

use crate::ConnectorError;

/// Read, parse and validate a node configuration
///
/// The file holds a [`NodeConfig`] as JSON. Every field is required; an
/// unknown or missing field is a parse error reported with its line and
/// column.
pub fn load_node_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConnectorError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let config = NodeConfig::from_json(&text)
        .and_then(|config| config.validate())
        .map_err(|source| ConnectorError::Config {
            path: path.display().to_string(),
            source,
        })?;
    log::info!(
        target: "hazardguard::connectors",
        "loaded {} ({:?}, {} channel(s))",
        path.display(),
        config.role(),
        config.channels().len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardguard_core::errors::ConfigError;
    use hazardguard_core::link::Role;
    use std::io::Write;

    const SENSING: &str = r#"{
        "schedule": { "logic_interval_ms": 100, "diagnostics_interval_ms": 5000, "manual_override_ms": 30000 },
        "link": {
            "role": "initiator",
            "timings": {
                "send_interval_ms": 200, "ack_timeout_ms": 3000, "max_retries": 1,
                "stale_timeout_ms": 15000, "reinit_interval_ms": 5000
            }
        },
        "channels": [
            {
                "channel": "co", "enabled": true, "read_interval_ms": 1000,
                "threshold": { "kind": "at_least", "limit": 50.0 },
                "timings": { "warning_ms": 5000, "danger_ms": 30000, "recovery_ms": 10000 },
                "reading_policy": "hold_last"
            }
        ]
    }"#;

    fn file_with(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_valid_file() {
        let file = file_with(SENSING);
        let config = load_node_config(file.path()).unwrap();
        assert_eq!(config.role(), Role::Initiator);
        assert_eq!(config.channels().len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_node_config(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConnectorError::Io(_)));
    }

    #[test]
    fn invalid_values_name_the_file() {
        let file = file_with(&SENSING.replace("\"read_interval_ms\": 1000", "\"read_interval_ms\": 0"));
        let err = load_node_config(file.path()).unwrap_err();
        match err {
            ConnectorError::Config { path, source } => {
                assert_eq!(path, file.path().display().to_string());
                assert_eq!(
                    source,
                    ConfigError::ZeroInterval {
                        field: "read_interval_ms"
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let file = file_with(&SENSING.replace("\"enabled\": true,", "\"enabled\": true, \"gain\": 2,"));
        let err = load_node_config(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Config {
                source: ConfigError::Parse { .. },
                ..
            }
        ));
    }
}
