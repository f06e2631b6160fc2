//! Relay configuration.
//!
//! Four layers, shallow-merged in increasing precedence:
//! defaults < TOML file < environment < CLI flags.
//!
//! Environment names are the CLI flags uppercased with underscores
//! (`--engine-host` → `ENGINE_HOST`).

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use thiserror::Error;

use crate::filter::FilterSet;

/// How the relay reaches the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Udp,
    Multicast,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(TransportKind::Tcp),
            "udp" => Ok(TransportKind::Udp),
            "multicast" => Ok(TransportKind::Multicast),
            other => Err(format!("unknown transport: {other:?}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path}: {message}")]
    File { path: String, message: String },

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Fully-resolved relay configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub engine_host: String,
    pub engine_port: u16,
    pub transport: TransportKind,

    /// `addr[:port]`; the port falls back to `engine_port`.
    pub multicast_group: Option<String>,
    pub multicast_iface: Option<Ipv4Addr>,

    pub ws_host: String,
    pub ws_port: u16,

    pub filter: FilterSet,
    pub verbose: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            engine_host: "127.0.0.1".to_string(),
            engine_port: 9000,
            transport: TransportKind::Tcp,
            multicast_group: None,
            multicast_iface: None,
            ws_host: "127.0.0.1".to_string(),
            ws_port: 8080,
            filter: FilterSet::default(),
            verbose: false,
        }
    }
}

/// One layer of optional overrides (file, env, or CLI).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub engine_host: Option<String>,
    pub engine_port: Option<u16>,
    pub transport: Option<TransportKind>,
    pub multicast_group: Option<String>,
    pub multicast_iface: Option<String>,
    pub ws_host: Option<String>,
    pub ws_port: Option<u16>,
    pub filter: Option<String>,
    pub verbose: Option<bool>,
}

/// CLI surface. `--help` is handled by clap (exit 0).
#[derive(Debug, Parser)]
#[command(name = "client-relay", about = "WebSocket fan-out for engine events")]
pub struct Cli {
    /// Engine host.
    #[arg(long)]
    pub engine_host: Option<String>,

    /// Engine port.
    #[arg(long)]
    pub engine_port: Option<u16>,

    /// Transport to the engine.
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Multicast group, `addr[:port]`.
    #[arg(long)]
    pub multicast_group: Option<String>,

    /// Interface address for the multicast join.
    #[arg(long)]
    pub multicast_iface: Option<String>,

    /// WebSocket bind host.
    #[arg(long)]
    pub ws_host: Option<String>,

    /// WebSocket bind port.
    #[arg(long)]
    pub ws_port: Option<u16>,

    /// Comma-separated event kinds to forward.
    #[arg(long)]
    pub filter: Option<String>,

    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose diagnostics.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            engine_host: self.engine_host.clone(),
            engine_port: self.engine_port,
            transport: self.transport,
            multicast_group: self.multicast_group.clone(),
            multicast_iface: self.multicast_iface.clone(),
            ws_host: self.ws_host.clone(),
            ws_port: self.ws_port,
            filter: self.filter.clone(),
            // A flag can only turn verbosity on; absence is not an
            // override.
            verbose: if self.verbose { Some(true) } else { None },
        }
    }
}

impl RelayConfig {
    /// Resolve the full layer stack for this invocation.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = RelayConfig::default();

        if let Some(path) = &cli.config {
            config.apply(file_overrides(path)?)?;
        }
        config.apply(env_overrides(|key| std::env::var(key).ok())?)?;
        config.apply(cli.overrides())?;

        config.validate()?;
        Ok(config)
    }

    /// Merge one override layer on top of this config.
    pub fn apply(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
        if let Some(v) = overrides.engine_host {
            self.engine_host = v;
        }
        if let Some(v) = overrides.engine_port {
            self.engine_port = v;
        }
        if let Some(v) = overrides.transport {
            self.transport = v;
        }
        if let Some(v) = overrides.multicast_group {
            self.multicast_group = Some(v);
        }
        if let Some(v) = overrides.multicast_iface {
            self.multicast_iface =
                Some(v.parse::<Ipv4Addr>().map_err(|e| ConfigError::Invalid {
                    field: "multicast_iface",
                    message: e.to_string(),
                })?);
        }
        if let Some(v) = overrides.ws_host {
            self.ws_host = v;
        }
        if let Some(v) = overrides.ws_port {
            self.ws_port = v;
        }
        if let Some(v) = overrides.filter {
            self.filter = v.parse::<FilterSet>().map_err(|message| ConfigError::Invalid {
                field: "filter",
                message,
            })?;
        }
        if let Some(v) = overrides.verbose {
            self.verbose = v;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.transport == TransportKind::Multicast && self.multicast_group.is_none() {
            return Err(ConfigError::Invalid {
                field: "multicast_group",
                message: "required when transport is multicast".to_string(),
            });
        }
        if let Some(group) = &self.multicast_group {
            self.parse_group(group)?;
        }
        Ok(())
    }

    pub fn engine_addr(&self) -> String {
        format!("{}:{}", self.engine_host, self.engine_port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.ws_host, self.ws_port)
    }

    /// The joined group and port, for a multicast transport.
    pub fn multicast_target(&self) -> Result<(Ipv4Addr, u16), ConfigError> {
        let group = self.multicast_group.as_deref().ok_or(ConfigError::Invalid {
            field: "multicast_group",
            message: "not configured".to_string(),
        })?;
        self.parse_group(group)
    }

    fn parse_group(&self, group: &str) -> Result<(Ipv4Addr, u16), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            field: "multicast_group",
            message,
        };

        let (addr, port) = match group.split_once(':') {
            Some((addr, port)) => (
                addr,
                port.parse::<u16>()
                    .map_err(|e| invalid(format!("bad port: {e}")))?,
            ),
            None => (group, self.engine_port),
        };

        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(e.to_string()))?;
        if !addr.is_multicast() {
            return Err(invalid(format!("{addr} is not a multicast address")));
        }
        Ok((addr, port))
    }
}

/// Read one override layer from a TOML file.
fn file_overrides(path: &PathBuf) -> Result<Overrides, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read one override layer from the environment. The lookup is injected
/// so tests stay independent of the process environment.
pub fn env_overrides(
    get: impl Fn(&str) -> Option<String>,
) -> Result<Overrides, ConfigError> {
    let parse_u16 = |key: &'static str| -> Result<Option<u16>, ConfigError> {
        get(key)
            .map(|v| {
                v.parse::<u16>().map_err(|e| ConfigError::Invalid {
                    field: key,
                    message: e.to_string(),
                })
            })
            .transpose()
    };

    Ok(Overrides {
        engine_host: get("ENGINE_HOST"),
        engine_port: parse_u16("ENGINE_PORT")?,
        transport: get("TRANSPORT")
            .map(|v| {
                v.parse::<TransportKind>().map_err(|message| ConfigError::Invalid {
                    field: "TRANSPORT",
                    message,
                })
            })
            .transpose()?,
        multicast_group: get("MULTICAST_GROUP"),
        multicast_iface: get("MULTICAST_IFACE"),
        ws_host: get("WS_HOST"),
        ws_port: parse_u16("WS_PORT")?,
        filter: get("FILTER"),
        verbose: get("VERBOSE").map(|v| v == "1" || v.eq_ignore_ascii_case("true")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RelayConfig::default();
        assert_eq!(config.engine_addr(), "127.0.0.1:9000");
        assert_eq!(config.ws_addr(), "127.0.0.1:8080");
        assert_eq!(config.transport, TransportKind::Tcp);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let overrides: Overrides = toml::from_str(
            r#"
            engine_host = "engine.internal"
            engine_port = 9100
            transport = "udp"
            filter = "trade,top-of-book"
            "#,
        )
        .unwrap();

        let mut config = RelayConfig::default();
        config.apply(overrides).unwrap();

        assert_eq!(config.engine_addr(), "engine.internal:9100");
        assert_eq!(config.transport, TransportKind::Udp);
        assert_eq!(config.filter.to_string(), "trade,top-of-book");
    }

    #[test]
    fn env_layer_beats_file_and_cli_beats_env() {
        let mut config = RelayConfig::default();

        // file
        config
            .apply(Overrides {
                engine_port: Some(9100),
                ws_port: Some(8100),
                ..Default::default()
            })
            .unwrap();

        // env
        let env = env_overrides(|key| match key {
            "ENGINE_PORT" => Some("9200".to_string()),
            _ => None,
        })
        .unwrap();
        config.apply(env).unwrap();
        assert_eq!(config.engine_port, 9200);
        assert_eq!(config.ws_port, 8100, "untouched fields survive the merge");

        // cli
        config
            .apply(Overrides {
                engine_port: Some(9300),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.engine_port, 9300);
    }

    #[test]
    fn bad_filter_is_a_config_error() {
        let mut config = RelayConfig::default();
        let err = config
            .apply(Overrides {
                filter: Some("trade,bogus".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("filter"));
    }

    #[test]
    fn multicast_requires_a_group() {
        let mut config = RelayConfig::default();
        config
            .apply(Overrides {
                transport: Some(TransportKind::Multicast),
                ..Default::default()
            })
            .unwrap();
        assert!(config.validate().is_err());

        config
            .apply(Overrides {
                multicast_group: Some("239.0.0.1:9100".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn multicast_group_parses_with_and_without_port() {
        let mut config = RelayConfig::default();
        config
            .apply(Overrides {
                multicast_group: Some("239.0.0.1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            config.multicast_target().unwrap(),
            ("239.0.0.1".parse().unwrap(), 9000)
        );

        config.multicast_group = Some("239.0.0.1:9100".to_string());
        assert_eq!(
            config.multicast_target().unwrap(),
            ("239.0.0.1".parse().unwrap(), 9100)
        );

        config.multicast_group = Some("10.0.0.1:9100".to_string());
        assert!(config.multicast_target().is_err(), "not a multicast addr");
    }

    #[test]
    fn env_bool_parsing() {
        let env = env_overrides(|key| match key {
            "VERBOSE" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(env.verbose, Some(true));
    }
}
