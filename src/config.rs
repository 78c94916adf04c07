use anyhow::{bail, Context, Result};

const DEFAULT_MQTT_PORT: u16 = 1883;

// ---------------------------------------------------------------------------
// BrokerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Every topic (inbound and outbound) lives under this prefix.
    pub topic_prefix: String,
    pub keep_alive_secs: u64,
    /// Fixed pause after a transport error before the event loop is polled again.
    pub reconnect_delay_secs: u64,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub broker: BrokerConfig,
    /// Persistence timer period in seconds.
    pub storage_interval_secs: u64,
    /// Seed the fused reading from the newest stored record at startup.
    pub seed_from_latest: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let (host, port) = parse_broker_url(&optional(
            "MQTT_BROKER_URL",
            "mqtt://broker.mqtt.cool:1883",
        ))?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "3000")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            broker: BrokerConfig {
                host,
                port,
                client_id: std::env::var("MQTT_CLIENT_ID")
                    .unwrap_or_else(|_| format!("iot-dashboard-{}", uuid::Uuid::new_v4().simple())),
                topic_prefix: optional("MQTT_TOPIC_PREFIX", "uts/152023193/iot"),
                keep_alive_secs: optional("MQTT_KEEP_ALIVE_SECS", "30")
                    .parse()
                    .context("MQTT_KEEP_ALIVE_SECS must be a positive integer")?,
                reconnect_delay_secs: optional("MQTT_RECONNECT_DELAY_SECS", "5")
                    .parse()
                    .context("MQTT_RECONNECT_DELAY_SECS must be a positive integer")?,
            },
            storage_interval_secs: parse_interval(&optional("STORAGE_INTERVAL_SECS", "20"))
                .context("STORAGE_INTERVAL_SECS must be a positive integer")?,
            seed_from_latest: parse_bool(&optional("SEED_FROM_LATEST", "false"))
                .context("SEED_FROM_LATEST must be true or false")?,
        })
    }
}

/// Parse `mqtt://host:port` (or `tcp://`, or a bare `host[:port]`) into its parts.
fn parse_broker_url(raw: &str) -> Result<(String, u16)> {
    let rest = raw
        .strip_prefix("mqtt://")
        .or_else(|| raw.strip_prefix("tcp://"))
        .unwrap_or(raw)
        .trim_end_matches('/');

    if rest.contains("://") {
        bail!("unsupported broker URL scheme: {raw:?}");
    }

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse()
                .with_context(|| format!("invalid port in broker URL {raw:?}"))?,
        ),
        None => (rest, DEFAULT_MQTT_PORT),
    };

    if host.is_empty() {
        bail!("broker URL has no host: {raw:?}");
    }

    Ok((host.to_owned(), port))
}

fn parse_interval(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>()? {
        0 => bail!("interval must be greater than zero"),
        secs => Ok(secs),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("not a boolean: {other:?}"),
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_url_with_scheme_and_port() {
        let (host, port) = parse_broker_url("mqtt://broker.mqtt.cool:1883").unwrap();
        assert_eq!(host, "broker.mqtt.cool");
        assert_eq!(port, 1883);
    }

    #[test]
    fn broker_url_defaults_port() {
        let (host, port) = parse_broker_url("tcp://localhost").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, DEFAULT_MQTT_PORT);
    }

    #[test]
    fn broker_url_without_scheme() {
        let (host, port) = parse_broker_url("10.0.0.5:11883").unwrap();
        assert_eq!(host, "10.0.0.5");
        assert_eq!(port, 11883);
    }

    #[test]
    fn broker_url_rejects_other_schemes() {
        let err = parse_broker_url("ws://localhost:8083").unwrap_err();
        assert!(err.to_string().contains("unsupported broker URL scheme"));
    }

    #[test]
    fn broker_url_rejects_bad_port() {
        let err = parse_broker_url("mqtt://localhost:abc").unwrap_err();
        assert!(err.to_string().contains("invalid port"));
    }

    #[test]
    fn broker_url_rejects_missing_host() {
        assert!(parse_broker_url("mqtt://:1883").is_err());
    }

    #[test]
    fn interval_must_be_positive() {
        assert_eq!(parse_interval("20").unwrap(), 20);
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("-1").is_err());
    }

    #[test]
    fn bool_accepts_common_spellings() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("ON").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
