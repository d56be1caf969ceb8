use crate::{classic::DEFAULT_UNIT_ID, options::Options};
use anyhow::{ensure, Context};
use lazy_static::lazy_static;
use serde::{de::Error, Deserialize, Deserializer, Serialize};
use std::{collections::HashSet, fs::File, path::Path, time::Duration};

lazy_static! {
    static ref IDENTIFIER_REGEX: regex::Regex = regex::Regex::new("^[a-zA-Z0-9_]+$").unwrap();
}

const fn default_mqtt_port() -> u16 {
    1883
}
const fn default_modbus_port() -> u16 {
    502
}
const fn default_unit_id() -> u8 {
    DEFAULT_UNIT_ID
}
const fn default_poll_interval_ms() -> u64 {
    5000
}
const fn default_request_timeout_ms() -> u64 {
    3000
}
fn default_client_id() -> String {
    "classic2mqtt_bridge".to_owned()
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    pub mqtt: Option<MqttConfig>,

    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            mqtt: None,
            controllers: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).with_context(|| format!("Failed to open config file {path:?}"))?;

        serde_yaml::from_reader(file).with_context(|| format!("Failed to parse config file {path:?}"))
    }

    /// Reads the config file and applies the command line on top. Without an
    /// explicit `--config`, a missing default file is fine as long as hosts
    /// were given on the command line.
    pub fn load(options: &Options) -> anyhow::Result<Self> {
        let mut config = match &options.config_file {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Options::default_config_file();

                if path.exists() || options.hosts.is_empty() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            },
        };

        if let Some(interval_ms) = options.interval_ms {
            config.poll_interval_ms = interval_ms;
        }

        for host in &options.hosts {
            config.controllers.push(ControllerConfig::from_host_arg(host)?);
        }

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be greater than zero");
        ensure!(self.request_timeout_ms > 0, "request_timeout_ms must be greater than zero");
        ensure!(!self.controllers.is_empty(), "No controllers configured");

        let mut identifiers = HashSet::new();
        for controller in &self.controllers {
            let id = &controller.device.identifier.0;
            ensure!(identifiers.insert(id), "Duplicate controller identifier {id}");
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Deserialize, Debug)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Identifier(pub String);

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Device {
    pub identifier: Identifier,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub sw_version: Option<String>,
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = String::deserialize(de)?;

        if IDENTIFIER_REGEX.is_match(&id) {
            Ok(Identifier(id))
        } else {
            Err(Error::custom("identifier must match [a-zA-Z0-9_]+"))
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ControllerConfig {
    pub name: String,
    pub host: String,

    #[serde(default = "default_modbus_port")]
    pub port: u16,

    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Hold the TCP session open between polls instead of reconnecting.
    #[serde(default)]
    pub keep_connection: bool,

    pub device: Device,
}

impl ControllerConfig {
    /// Builds a controller from a `HOST[:PORT]` command line argument.
    pub fn from_host_arg(arg: &str) -> anyhow::Result<Self> {
        let (host, port) = match arg.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                let port = port.parse().with_context(|| format!("Invalid port in {arg:?}"))?;
                (host, port)
            },
            _ => (arg, default_modbus_port()),
        };

        ensure!(!host.is_empty(), "Missing host in {arg:?}");

        let identifier = host
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect::<String>();

        Ok(Self {
            name: format!("Classic {host}"),
            host: host.to_owned(),
            port,
            unit_id: DEFAULT_UNIT_ID,
            keep_connection: false,
            device: Device {
                identifier: Identifier(format!("classic_{identifier}")),
                manufacturer: Some("MidNite Solar".to_owned()),
                model: Some("Classic".to_owned()),
                sw_version: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const SAMPLE: &str = r#"
client_id: garage_bridge
poll_interval_ms: 10000
mqtt:
  host: broker.lan
controllers:
  - name: Garage Classic
    host: 192.168.20.10
    device:
      identifier: garage_classic
      manufacturer: MidNite Solar
      model: Classic 150
  - name: Shed Classic
    host: 192.168.20.11
    port: 5020
    unit_id: 1
    keep_connection: true
    device:
      identifier: shed_classic
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();

        assert_eq!(config.client_id, "garage_bridge");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));

        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host, "broker.lan");
        assert_eq!(mqtt.port, 1883);

        let garage = &config.controllers[0];
        assert_eq!(garage.port, 502);
        assert_eq!(garage.unit_id, 10);
        assert!(!garage.keep_connection);
        assert_eq!(garage.device.identifier, Identifier("garage_classic".to_owned()));
        assert_eq!(garage.device.model.as_deref(), Some("Classic 150"));

        let shed = &config.controllers[1];
        assert_eq!((shed.port, shed.unit_id, shed.keep_connection), (5020, 1, true));
        assert_eq!(shed.device.manufacturer, None);
    }

    #[test]
    fn zero_durations_are_rejected() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());

        for (key, yaml) in [
            ("poll_interval_ms", SAMPLE.replace("poll_interval_ms: 10000", "poll_interval_ms: 0")),
            ("request_timeout_ms", format!("request_timeout_ms: 0\n{SAMPLE}")),
        ] {
            let config: Config = serde_yaml::from_str(&yaml).unwrap();
            let error = config.validate().unwrap_err();

            assert_eq!(error.to_string(), format!("{key} must be greater than zero"));
        }
    }

    #[test]
    fn command_line_interval_is_validated() {
        let options = Options::parse_from(["classic2mqtt", "--interval", "0", "192.168.20.10"]);
        let error = Config::load(&options).unwrap_err();
        assert_eq!(error.to_string(), "poll_interval_ms must be greater than zero");

        let options = Options::parse_from(["classic2mqtt", "--interval", "250", "192.168.20.10"]);
        let config = Config::load(&options).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.controllers.last().unwrap().host, "192.168.20.10");
    }

    #[test]
    fn controllers_are_required() {
        let config: Config = serde_yaml::from_str("poll_interval_ms: 1000").unwrap();

        assert_eq!(config.validate().unwrap_err().to_string(), "No controllers configured");
    }

    #[test]
    fn identifiers_must_be_unique() {
        let yaml = SAMPLE.replace("identifier: shed_classic", "identifier: garage_classic");
        let config: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Duplicate controller identifier garage_classic"
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.client_id, "classic2mqtt_bridge");
        assert_eq!(config.poll_interval_ms, 5000);
        assert!(config.mqtt.is_none());
        assert!(config.controllers.is_empty());
    }

    #[test]
    fn rejects_bad_identifiers() {
        for id in ["garage classic", "garage/classic", "", "ok_but-dashed"] {
            let yaml = format!("identifier: {id:?}");
            assert!(serde_yaml::from_str::<Device>(&yaml).is_err(), "{id:?} accepted");
        }

        let device: Device = serde_yaml::from_str("identifier: Garage_01").unwrap();
        assert_eq!(device.identifier.0, "Garage_01");
    }

    #[test]
    fn host_arguments() {
        let controller = ControllerConfig::from_host_arg("192.168.20.10").unwrap();
        assert_eq!(controller.host, "192.168.20.10");
        assert_eq!(controller.port, 502);
        assert_eq!(controller.device.identifier.0, "classic_192_168_20_10");
        assert!(IDENTIFIER_REGEX.is_match(&controller.device.identifier.0));

        let controller = ControllerConfig::from_host_arg("classic.lan:5020").unwrap();
        assert_eq!((controller.host.as_str(), controller.port), ("classic.lan", 5020));

        assert!(ControllerConfig::from_host_arg("classic.lan:modbus").is_err());
        assert!(ControllerConfig::from_host_arg(":502").is_err());
    }
}
