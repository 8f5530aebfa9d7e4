use crate::args::{StartupArguments, DEFAULT_CONFIG_PATH, DEFAULT_LOCAL_HOST, DEFAULT_REMOTE_PORT};

use super::ConfigError;

pub const ENV_LOCAL_HOST: &str = "SS_LOCAL_HOST";
pub const ENV_LOCAL_PORT: &str = "SS_LOCAL_PORT";
pub const ENV_REMOTE_HOST: &str = "SS_REMOTE_HOST";
pub const ENV_REMOTE_PORT: &str = "SS_REMOTE_PORT";
pub const ENV_PLUGIN_OPTIONS: &str = "SS_PLUGIN_OPTIONS";

/// Where to listen, where to connect, and where to find the plugin options. Required fields are
/// left optional here and validated when building the [`State`](super::State).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub local_host: String,
    pub local_port: Option<u16>,
    pub remote_host: Option<String>,
    pub remote_port: u16,
    pub plugin_options: String,
}

fn parse_env_port(name: &'static str, value: String) -> Result<Option<u16>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<u16>() {
        Ok(port) if port != 0 => Ok(Some(port)),
        _ => Err(ConfigError::InvalidPort { name, value }),
    }
}

impl Settings {
    /// Reads the settings a parent proxy passes to its plugins through the environment. Returns
    /// `Ok(None)` if we weren't started as a plugin, which is told by `SS_LOCAL_HOST` being unset
    /// or empty.
    pub fn from_env<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let local_host = match lookup(ENV_LOCAL_HOST).filter(|host| !host.is_empty()) {
            Some(host) => host,
            None => return Ok(None),
        };

        let local_port = match lookup(ENV_LOCAL_PORT) {
            Some(value) => parse_env_port(ENV_LOCAL_PORT, value)?,
            None => None,
        };

        let remote_port = match lookup(ENV_REMOTE_PORT) {
            Some(value) => parse_env_port(ENV_REMOTE_PORT, value)?.unwrap_or(DEFAULT_REMOTE_PORT),
            None => DEFAULT_REMOTE_PORT,
        };

        let plugin_options = lookup(ENV_PLUGIN_OPTIONS)
            .filter(|options| !options.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        Ok(Some(Self {
            local_host,
            local_port,
            remote_host: lookup(ENV_REMOTE_HOST).filter(|host| !host.is_empty()),
            remote_port,
            plugin_options,
        }))
    }

    /// Builds the settings from the command line, for when we run standalone.
    pub fn from_arguments(arguments: StartupArguments) -> Self {
        Self {
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            local_port: arguments.local_port,
            remote_host: arguments.remote_host,
            remote_port: arguments.remote_port,
            plugin_options: arguments.plugin_options,
        }
    }
}
