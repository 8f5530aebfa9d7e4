//! The plugin options: what the proxy server expects of us, as opposed to where to connect.
//!
//! Options come either inline, as `Key=Value;Key=Value` (a backslash escapes the next character,
//! so values may hold `;` or `=`), or as a path to a JSON file holding an object with the same
//! keys. A string is considered inline if it contains both a `;` and a `=`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::tls::Browser;

use super::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct PluginConfig {
    /// The host name sent in the server_name extension.
    pub server_name: String,

    /// The secret shared with the server.
    pub key: String,

    /// The length of the replay window, in seconds.
    pub ticket_time_hint: u64,

    /// The browser whose ClientHello to imitate.
    pub browser: Browser,

    /// Whether to send the ClientHello along with the SYN.
    pub fast_open: bool,
}

impl PluginConfig {
    /// Loads the plugin options from an inline options string or a JSON file path.
    pub fn load(options: &str) -> Result<Self, ConfigError> {
        if is_inline(options) {
            Self::from_inline(options)
        } else {
            Self::from_file(options)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_string(),
            source,
        })?;

        Self::from_json(&json)
    }

    pub fn from_inline(options: &str) -> Result<Self, ConfigError> {
        let mut map = Map::new();
        for (key, value) in split_inline(options)? {
            let value = typed_value(&key, value)?;
            map.insert(key, value);
        }

        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

fn is_inline(options: &str) -> bool {
    options.contains(';') && options.contains('=')
}

/// Inline values are all strings, but some fields aren't.
fn typed_value(key: &str, value: String) -> Result<Value, ConfigError> {
    let invalid = |value: String| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    };

    match key {
        "TicketTimeHint" => match value.trim().parse::<u64>() {
            Ok(number) => Ok(Value::from(number)),
            Err(_) => Err(invalid(value)),
        },
        "FastOpen" => match value.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            v if v.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(invalid(value)),
        },
        _ => Ok(Value::String(value)),
    }
}

fn finish_pair(pairs: &mut Vec<(String, String)>, key: &mut String, value: &mut String, has_value: bool) -> Result<(), ConfigError> {
    if !has_value {
        if key.trim().is_empty() {
            key.clear();
            return Ok(());
        }

        return Err(ConfigError::MalformedOptions(format!("Missing '=' after {key}")));
    }

    let key = std::mem::take(key).trim().to_string();
    if key.is_empty() {
        return Err(ConfigError::MalformedOptions(String::from("Found a value without a key")));
    }

    pairs.push((key, std::mem::take(value)));
    Ok(())
}

/// Splits `Key=Value;Key=Value` into pairs, resolving backslash escapes. Empty entries are skipped.
fn split_inline(options: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut has_value = false;

    let mut chars = options.chars();
    while let Some(c) = chars.next() {
        let c = match c {
            '\\' => match chars.next() {
                Some(escaped) => escaped,
                None => return Err(ConfigError::MalformedOptions(String::from("Options end with a lone backslash"))),
            },
            '=' if !has_value => {
                has_value = true;
                continue;
            }
            ';' => {
                finish_pair(&mut pairs, &mut key, &mut value, has_value)?;
                has_value = false;
                continue;
            }
            c => c,
        };

        if has_value {
            value.push(c);
        } else {
            key.push(c);
        }
    }

    finish_pair(&mut pairs, &mut key, &mut value, has_value)?;
    Ok(pairs)
}
