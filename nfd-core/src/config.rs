//! Daemon configuration tree.
//!
//! The tree starts from [`DEFAULT_CONFIG`]; the embedding application overrides single
//! values by dotted path (`face_system.udp.port`) before the subsystems are built, and
//! each subsystem reads its own section as a typed view.

use std::fmt;

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::error::{Error, Result};

/// Built-in configuration the daemon starts from.
pub const DEFAULT_CONFIG: &str = r#"
[general]

[log]
default_level = "INFO"

[tables]
cs_max_packets = 100

[tables.strategy_choice]
"/" = "/localhost/nfd/strategy/best-route"
"/localhost" = "/localhost/nfd/strategy/broadcast"
"/localhost/nfd" = "/localhost/nfd/strategy/best-route"
"/ndn/broadcast" = "/localhost/nfd/strategy/broadcast"

[face_system.tcp]
port = 6363

[face_system.udp]
port = 6363
idle_timeout = 600
keep_alive_interval = 25
mcast = false

[authorizations.authorize]
certfile = "any"
privileges = ["faces", "fib", "strategy-choice"]

[rib.localhost_security.trust-anchor]
type = "any"

[rib.remote_register]
cost = 15
timeout = 10000
retry = 0
refresh_interval = 300
"#;

/// Parsed configuration, addressed by dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Table,
}

impl ConfigTree {
    /// Parse TOML text into a tree.
    pub fn parse(text: &str) -> Result<Self> {
        let root = text
            .parse::<Table>()
            .map_err(|e| Error::config_parse(e.to_string()))?;
        Ok(Self { root })
    }

    /// The built-in default tree.
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Value at a dotted path such as `face_system.udp.port`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.root.get(first)?, |value, segment| {
            value.as_table()?.get(segment)
        })
    }

    /// Top-level section by name.
    pub fn section(&self, name: &str) -> Option<&Table> {
        self.root.get(name).and_then(Value::as_table)
    }

    /// Deserialize a top-level section; a missing section deserializes from an empty table.
    pub fn section_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let table = self.section(name).cloned().unwrap_or_default();
        Value::Table(table)
            .try_into()
            .map_err(|e| Error::subsystem_init(format!("section '{name}': {e}")))
    }

    /// Override one value by dotted path.
    ///
    /// An existing value keeps its type and `value` is converted to it; new keys are
    /// stored as strings, creating intermediate sections as needed.
    pub fn put(&mut self, path: &str, value: &str) -> Result<()> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(malformed(path, "empty path segment"));
        }
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(malformed(path, "empty path"));
        };

        let mut table = &mut self.root;
        for segment in parents {
            let entry = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = match entry {
                Value::Table(t) => t,
                _ => return Err(malformed(path, &format!("'{segment}' is not a section"))),
            };
        }

        let new_value = match table.get(*leaf) {
            None => Value::String(value.to_owned()),
            Some(existing) => {
                let Some(coerced) = coerce(existing, value) else {
                    let why = format!("'{value}' is not a valid {}", existing.type_str());
                    return Err(malformed(path, &why));
                };
                coerced
            }
        };
        table.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// The whole tree.
    pub fn as_table(&self) -> &Table {
        &self.root
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = toml::to_string(&self.root).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

fn malformed(path: &str, why: &str) -> Error {
    Error::subsystem_init(format!("malformed injected override '{path}': {why}"))
}

fn coerce(existing: &Value, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    match existing {
        Value::String(_) => Some(Value::String(raw.to_owned())),
        Value::Integer(_) => raw.parse().ok().map(Value::Integer),
        Value::Float(_) => raw.parse().ok().map(Value::Float),
        Value::Boolean(_) => match raw {
            "true" | "yes" | "on" => Some(Value::Boolean(true)),
            "false" | "no" | "off" => Some(Value::Boolean(false)),
            _ => None,
        },
        Value::Array(_) => Some(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_owned()))
                .collect(),
        )),
        Value::Table(_) | Value::Datetime(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Udp {
        port: u16,
        mcast: bool,
    }

    fn int(cfg: &ConfigTree, path: &str) -> Option<i64> {
        cfg.get(path).and_then(Value::as_integer)
    }

    fn text<'a>(cfg: &'a ConfigTree, path: &str) -> Option<&'a str> {
        cfg.get(path).and_then(Value::as_str)
    }

    #[test]
    fn builtin_defaults() {
        let cfg = ConfigTree::builtin().unwrap();
        assert_eq!(int(&cfg, "tables.cs_max_packets"), Some(100));
        assert_eq!(
            text(&cfg, "tables.strategy_choice./localhost"),
            Some("/localhost/nfd/strategy/broadcast")
        );
        assert_eq!(text(&cfg, "log.default_level"), Some("INFO"));
        assert_eq!(int(&cfg, "rib.remote_register.cost"), Some(15));
        assert!(cfg.section("general").is_some());
        assert!(cfg.get("face_system.sctp.port").is_none());
    }

    #[test]
    fn malformed_text_is_config_parse() {
        let err = ConfigTree::parse("[tables\ncs_max_packets = ").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn overrides_keep_existing_types() {
        let mut cfg = ConfigTree::builtin().unwrap();
        cfg.put("face_system.udp.port", "0").unwrap();
        cfg.put("face_system.udp.mcast", "yes").unwrap();
        cfg.put("authorizations.authorize.privileges", "faces, fib")
            .unwrap();

        let udp: Udp = cfg
            .section("face_system")
            .and_then(|fs| fs.get("udp"))
            .cloned()
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(udp.port, 0);
        assert!(udp.mcast);
        let privileges = cfg.get("authorizations.authorize.privileges");
        assert_eq!(privileges.and_then(Value::as_array).map(Vec::len), Some(2));
    }

    #[test]
    fn new_keys_become_strings_in_new_sections() {
        let mut cfg = ConfigTree::builtin().unwrap();
        cfg.put("log.Forwarder", "DEBUG").unwrap();
        cfg.put("general.user", "nfd").unwrap();
        cfg.put("face_system.websocket.port", "9696").unwrap();
        assert_eq!(text(&cfg, "log.Forwarder"), Some("DEBUG"));
        assert_eq!(text(&cfg, "face_system.websocket.port"), Some("9696"));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let mut cfg = ConfigTree::builtin().unwrap();
        for (path, value) in [
            ("tables.cs_max_packets", "lots"),
            ("face_system.udp.mcast", "maybe"),
            ("tables.cs_max_packets.inner", "1"),
            ("tables", "flat"),
            ("tables..cs_max_packets", "1"),
            ("", "1"),
        ] {
            let err = cfg.put(path, value).unwrap_err();
            assert!(matches!(err, Error::SubsystemInit(_)), "{path} accepted");
        }
        assert_eq!(int(&cfg, "tables.cs_max_packets"), Some(100));
    }

    #[test]
    fn missing_section_deserializes_from_defaults() {
        #[derive(Debug, Deserialize, Default)]
        struct General {
            user: Option<String>,
        }
        let cfg = ConfigTree::parse("").unwrap();
        let general: General = cfg.section_as("general").unwrap();
        assert!(general.user.is_none());
    }

    #[test]
    fn renders_back_to_parseable_text() {
        let mut cfg = ConfigTree::builtin().unwrap();
        cfg.put("tables.cs_max_packets", "500").unwrap();
        let again = ConfigTree::parse(&cfg.to_string()).unwrap();
        assert_eq!(again, cfg);
    }
}
