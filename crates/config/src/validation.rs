//! Configuration validation
//!
//! Validates config consistency:
//! - At least one syslog listener is enabled
//! - The tail server does not collide with the syslog TCP listener
//! - Sizes and intervals are non-zero
//! - The InfluxDB section is usable when that backend is selected
//! - Diagnostics do not share stdout with the console echo

use crate::Config;
use crate::datastore::Backend;
use crate::error::{ConfigError, Result};

/// Largest syslog message accepted (64KB)
const MAX_MESSAGE_SIZE_LIMIT: usize = 64 * 1024;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_syslog(config)?;
    validate_datastore(config)?;
    validate_tail(config)?;
    validate_log(config)?;
    Ok(())
}

fn validate_syslog(config: &Config) -> Result<()> {
    let syslog = &config.syslog;

    if !syslog.tcp.enabled && !syslog.udp.enabled {
        return Err(ConfigError::NoListenersEnabled);
    }

    if syslog.max_message_size == 0 || syslog.max_message_size > MAX_MESSAGE_SIZE_LIMIT {
        return Err(ConfigError::invalid_value(
            "syslog",
            "max_message_size",
            format!("must be between 1 and {MAX_MESSAGE_SIZE_LIMIT}"),
        ));
    }

    Ok(())
}

fn validate_datastore(config: &Config) -> Result<()> {
    let datastore = &config.datastore;

    if datastore.write_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "datastore",
            "write_interval",
            "must be greater than 0",
        ));
    }

    if datastore.backend == Backend::InfluxDb {
        let influx = &datastore.influxdb;

        if influx.url.is_empty() {
            return Err(ConfigError::missing_field("datastore.influxdb", "url"));
        }
        if !(influx.url.starts_with("http://") || influx.url.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "datastore.influxdb",
                "url",
                "must start with http:// or https://",
            ));
        }
        if influx.database.is_empty() {
            return Err(ConfigError::missing_field("datastore.influxdb", "database"));
        }
        if influx.password.is_empty() != influx.username.is_empty() {
            return Err(ConfigError::invalid_value(
                "datastore.influxdb",
                "username",
                "username and password must be set together",
            ));
        }
    }

    Ok(())
}

fn validate_tail(config: &Config) -> Result<()> {
    let tail = &config.tail;
    if !tail.enabled {
        return Ok(());
    }

    if tail.subscriber_buffer == 0 {
        return Err(ConfigError::invalid_value(
            "tail",
            "subscriber_buffer",
            "must be greater than 0",
        ));
    }

    if config.syslog.tcp.enabled && config.syslog.tcp.bind_address() == tail.address {
        return Err(ConfigError::DuplicateAddress {
            address: tail.address.clone(),
            first: "syslog.tcp",
            second: "tail",
        });
    }

    Ok(())
}

fn validate_log(config: &Config) -> Result<()> {
    if config.syslog.log_to_stdout && config.log.output.is_stdout() {
        return Err(ConfigError::invalid_value(
            "log",
            "output",
            "cannot be stdout while syslog.log_to_stdout is enabled",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        Config::from_str(toml)
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_no_listeners() {
        let err = parse(
            r#"
[syslog.tcp]
enabled = false
[syslog.udp]
enabled = false
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoListenersEnabled));
    }

    #[test]
    fn test_message_size_bounds() {
        for size in [0, 1024 * 1024] {
            let err = parse(&format!("[syslog]\nmax_message_size = {size}")).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    field: "max_message_size",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_zero_write_interval() {
        let err = parse("[datastore]\nwrite_interval = \"0s\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "write_interval",
                ..
            }
        ));
    }

    #[test]
    fn test_influx_url_checks() {
        let err = parse("[datastore.influxdb]\nurl = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "url", .. }));

        let err = parse("[datastore.influxdb]\nurl = \"localhost:8086\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "url", .. }));
    }

    #[test]
    fn test_influx_ignored_for_memory_backend() {
        let config = parse(
            r#"
[datastore]
backend = "memory"
[datastore.influxdb]
url = ""
"#,
        )
        .unwrap();
        assert_eq!(config.datastore.backend, Backend::Memory);
    }

    #[test]
    fn test_credentials_must_pair() {
        let err = parse("[datastore.influxdb]\nusername = \"admin\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "username", .. }));
    }

    #[test]
    fn test_tail_collides_with_syslog_tcp() {
        let err = parse(
            r#"
[syslog.tcp]
address = "127.0.0.1"
port = 5515
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAddress { .. }));

        // Disabled tail never collides
        assert!(
            parse(
                r#"
[syslog.tcp]
address = "127.0.0.1"
port = 5515
[tail]
enabled = false
"#
            )
            .is_ok()
        );
    }

    #[test]
    fn test_zero_subscriber_buffer() {
        let err = parse("[tail]\nsubscriber_buffer = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "subscriber_buffer",
                ..
            }
        ));
    }

    #[test]
    fn test_log_stdout_conflicts_with_console_echo() {
        let err = parse(
            r#"
[log]
output = "stdout"
[syslog]
log_to_stdout = true
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                section: "log",
                field: "output",
                ..
            }
        ));

        // Either one alone is fine
        assert!(parse("[log]\noutput = \"stdout\"").is_ok());
        assert!(parse("[syslog]\nlog_to_stdout = true").is_ok());
    }
}
