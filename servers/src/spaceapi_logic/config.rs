use clap::Parser;
use lib_common::ingestors::{BridgeConfig, KEEP_ALIVE};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "server_spaceapi.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "SpaceAPI status server fed by MQTT", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "PORT", help = "Port to listen on for HTTP requests.")]
    pub port: Option<u16>,

    #[clap(long, env = "SPACEAPI_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "SPACEAPI_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "SPACEAPI_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "MQTT_BROKER", help = "MQTT broker host.")]
    pub mqtt_broker: Option<String>,

    #[clap(long, env = "MQTT_PORT", help = "MQTT broker port.")]
    pub mqtt_port: Option<u16>,

    #[clap(long, env = "MQTT_CLIENT_ID", help = "MQTT client identifier.")]
    pub mqtt_client_id: Option<String>,

    #[clap(long, env = "MQTT_TOPIC_STATUS", help = "Topic carrying the open/closed status.")]
    pub mqtt_topic_status: Option<String>,

    #[clap(long, env = "MQTT_TOPIC_LASTCHANGE", help = "Topic carrying the last-change timestamp.")]
    pub mqtt_topic_lastchange: Option<String>,

    #[clap(long, env = "MQTT_RECONNECT_DELAY_MS", help = "Delay in milliseconds before reconnecting to the broker.")]
    pub mqtt_reconnect_delay_ms: Option<u64>,

    #[clap(long, env = "OPEN_IMAGE_PATH", help = "Icon served by /state.png while open.")]
    pub open_image_path: Option<PathBuf>,

    #[clap(long, env = "CLOSED_IMAGE_PATH", help = "Icon served by /state.png while closed.")]
    pub closed_image_path: Option<PathBuf>,

    #[clap(long, env = "OAS3_PATH", help = "OpenAPI document served by /oas3.")]
    pub oas3_path: Option<PathBuf>,

    #[clap(long, env = "SPACEAPI_PROFILE_PATH", help = "JSON profile of the space. Defaults to the built-in Netz39 profile.")]
    pub profile_path: Option<PathBuf>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub bridge: BridgeConfig,
    pub open_image_path: PathBuf,
    pub closed_image_path: PathBuf,
    pub oas3_path: PathBuf,
    pub profile_path: Option<PathBuf>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            mqtt_broker: other.mqtt_broker.or(self.mqtt_broker),
            mqtt_port: other.mqtt_port.or(self.mqtt_port),
            mqtt_client_id: other.mqtt_client_id.or(self.mqtt_client_id),
            mqtt_topic_status: other.mqtt_topic_status.or(self.mqtt_topic_status),
            mqtt_topic_lastchange: other.mqtt_topic_lastchange.or(self.mqtt_topic_lastchange),
            mqtt_reconnect_delay_ms: other.mqtt_reconnect_delay_ms.or(self.mqtt_reconnect_delay_ms),
            open_image_path: other.open_image_path.or(self.open_image_path),
            closed_image_path: other.closed_image_path.or(self.closed_image_path),
            oas3_path: other.oas3_path.or(self.oas3_path),
            profile_path: other.profile_path.or(self.profile_path),
        }
    }

    fn defaults() -> Config {
        let bridge = BridgeConfig::default();
        Config {
            port: Some(8080),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            mqtt_broker: Some(bridge.host),
            mqtt_port: Some(bridge.port),
            mqtt_client_id: Some(bridge.client_id),
            mqtt_topic_status: Some(bridge.status_topic),
            mqtt_topic_lastchange: Some(bridge.lastchange_topic),
            mqtt_reconnect_delay_ms: Some(bridge.reconnect_delay.as_millis() as u64),
            open_image_path: Some(PathBuf::from("assets/open.png")),
            closed_image_path: Some(PathBuf::from("assets/closed.png")),
            oas3_path: Some(PathBuf::from("OAS3.yml")),
            ..Default::default()
        }
    }

    /// Fills every unset option from the defaults.
    pub fn resolve(self) -> Settings {
        let merged = Config::defaults().merge(self);
        let fallback = BridgeConfig::default();
        Settings {
            port: merged.port.unwrap_or(8080),
            log_dir: merged.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
            bridge: BridgeConfig {
                host: merged.mqtt_broker.unwrap_or(fallback.host),
                port: merged.mqtt_port.unwrap_or(fallback.port),
                client_id: merged.mqtt_client_id.unwrap_or(fallback.client_id),
                keep_alive: KEEP_ALIVE,
                status_topic: merged.mqtt_topic_status.unwrap_or(fallback.status_topic),
                lastchange_topic: merged
                    .mqtt_topic_lastchange
                    .unwrap_or(fallback.lastchange_topic),
                reconnect_delay: merged
                    .mqtt_reconnect_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(fallback.reconnect_delay),
                channel_capacity: fallback.channel_capacity,
            },
            open_image_path: merged
                .open_image_path
                .unwrap_or_else(|| PathBuf::from("assets/open.png")),
            closed_image_path: merged
                .closed_image_path
                .unwrap_or_else(|| PathBuf::from("assets/closed.png")),
            oas3_path: merged.oas3_path.unwrap_or_else(|| PathBuf::from("OAS3.yml")),
            profile_path: merged.profile_path,
        }
    }
}

/// Messages raised while loading the configuration, logged by the caller once
/// logging is set up.
pub type ConfigNotes = Vec<(log::Level, String)>;

pub fn load_config() -> (Settings, ConfigNotes) {
    load_config_from(std::env::args_os())
}

pub fn load_config_from<I, T>(args: I) -> (Settings, ConfigNotes)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut notes = ConfigNotes::new();

    // 1. CLI and environment (clap handles both). Parsed first so the config
    //    file location can be overridden.
    let cli_args = Config::parse_from(args);

    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    // 2. Config file (server_spaceapi.conf) if present.
    let mut current_config = Config::default();

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => notes.push((
                    log::Level::Warn,
                    format!(
                        "Failed to parse config file {}: {}. Falling back to other sources.",
                        config_file_path.display(),
                        e
                    ),
                )),
            },
            Err(e) => notes.push((
                log::Level::Warn,
                format!(
                    "Failed to read config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                ),
            )),
        }
    } else {
        notes.push((
            log::Level::Info,
            format!(
                "Config file not found at {}. Using defaults and environment/CLI variables.",
                config_file_path.display()
            ),
        ));
    }

    // 3. Environment and CLI override the file; defaults fill the rest.
    (current_config.merge(cli_args).resolve(), notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolve_applies_defaults() {
        let settings = Config::default().resolve();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.bridge.host, "mqtt");
        assert_eq!(settings.bridge.port, 1883);
        assert_eq!(settings.bridge.status_topic, "status");
        assert_eq!(settings.bridge.lastchange_topic, "lastchange");
        assert_eq!(settings.bridge.keep_alive, Duration::from_secs(60));
        assert_eq!(settings.oas3_path, PathBuf::from("OAS3.yml"));
        assert!(settings.profile_path.is_none());
    }

    #[test]
    fn later_sources_override_earlier_ones() {
        let file = Config {
            port: Some(9000),
            mqtt_broker: Some("broker.local".to_string()),
            mqtt_topic_status: Some("space/status".to_string()),
            ..Default::default()
        };
        let cli = Config {
            port: Some(9100),
            ..Default::default()
        };

        let settings = file.merge(cli).resolve();
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.bridge.host, "broker.local");
        assert_eq!(settings.bridge.status_topic, "space/status");
        assert_eq!(settings.bridge.lastchange_topic, "lastchange");
    }

    #[test]
    fn reconnect_delay_is_read_in_milliseconds() {
        let settings = Config {
            mqtt_reconnect_delay_ms: Some(250),
            ..Default::default()
        }
        .resolve();
        assert_eq!(settings.bridge.reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn file_values_are_overridden_by_cli_arguments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "port": 9000, "mqttTopicLastchange": "space/lastchange", "logLevel": "debug" }}"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let (settings, notes) = load_config_from([
            "server_spaceapi",
            "--config-path",
            path.as_str(),
            "--port",
            "9200",
            "--log-level",
            "warn",
        ]);

        assert_eq!(settings.port, 9200);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.bridge.lastchange_topic, "space/lastchange");
        assert!(notes.is_empty());
    }

    #[test]
    fn unparsable_file_falls_back_to_cli_and_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "port = 9000").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let (settings, notes) = load_config_from([
            "server_spaceapi",
            "--config-path",
            path.as_str(),
            "--port",
            "9300",
        ]);
        assert_eq!(settings.port, 9300);

        assert_eq!(notes.len(), 1);
        let (level, message) = &notes[0];
        assert_eq!(*level, log::Level::Warn);
        assert!(message.contains("Failed to parse config file"));
        assert!(message.contains(path.as_str()));
    }

    #[test]
    fn missing_file_is_reported_at_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        let path = path.to_string_lossy().into_owned();

        let (settings, notes) =
            load_config_from(["server_spaceapi", "--config-path", path.as_str()]);
        assert_eq!(settings.oas3_path, PathBuf::from("OAS3.yml"));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, log::Level::Info);
        assert!(notes[0].1.contains("Config file not found"));
    }
}
