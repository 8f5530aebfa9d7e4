use std::time::{Duration, SystemTime};

use crate::{
    tls::{
        client_hello::MAX_SERVER_NAME_LEN,
        token::{derive_key, KEY_LEN, OPAQUE_LEN},
        Browser,
    },
    utils::random_array,
};

use super::{ConfigError, PluginConfig, Settings, TimeSource};

/// The buffer sizes used by each direction of a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCapacities {
    /// How much to read from the local connection at once. Each read becomes one record.
    pub local_read: usize,

    /// The largest record payload accepted from the remote.
    pub remote_read: usize,
}

impl Default for RelayCapacities {
    fn default() -> Self {
        Self {
            local_read: 10240,
            remote_read: 20480,
        }
    }
}

/// Everything a session needs to know. Built once at startup, then only ever read.
pub struct State {
    local_host: String,
    local_port: u16,
    remote_host: String,
    remote_port: u16,
    server_name: String,
    browser: Browser,
    fast_open: bool,
    replay_window: Duration,
    key: [u8; KEY_LEN],
    opaque: [u8; OPAQUE_LEN],
    clock: Box<dyn TimeSource>,
    relay_capacities: RelayCapacities,
}

impl State {
    /// Validates the configuration, then derives the key and generates the opaque value.
    pub fn new(settings: Settings, plugin: PluginConfig, clock: Box<dyn TimeSource>) -> Result<Self, ConfigError> {
        let local_port = settings.local_port.ok_or(ConfigError::MissingLocalPort)?;
        let remote_host = settings.remote_host.ok_or(ConfigError::MissingRemoteHost)?;

        if plugin.key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }

        if plugin.ticket_time_hint == 0 {
            return Err(ConfigError::ZeroTicketTimeHint);
        }

        if plugin.server_name.len() > MAX_SERVER_NAME_LEN {
            return Err(ConfigError::ServerNameTooLong(plugin.server_name.len()));
        }

        Ok(Self {
            local_host: settings.local_host,
            local_port,
            remote_host,
            remote_port: settings.remote_port,
            server_name: plugin.server_name,
            browser: plugin.browser,
            fast_open: plugin.fast_open,
            replay_window: Duration::from_secs(plugin.ticket_time_hint),
            key: derive_key(&plugin.key),
            opaque: random_array().map_err(ConfigError::Random)?,
            clock,
            relay_capacities: RelayCapacities::default(),
        })
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    pub fn replay_window(&self) -> Duration {
        self.replay_window
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn opaque(&self) -> &[u8; OPAQUE_LEN] {
        &self.opaque
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    pub fn fast_open(&self) -> bool {
        self.fast_open
    }

    pub fn local_host(&self) -> &str {
        &self.local_host
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    pub fn relay_capacities(&self) -> RelayCapacities {
        self.relay_capacities
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use crate::utils::test_utils::FixedClock;

    use super::*;

    fn settings() -> Settings {
        Settings {
            local_host: String::from("127.0.0.1"),
            local_port: Some(1984),
            remote_host: Some(String::from("proxy.example.com")),
            remote_port: 443,
            plugin_options: String::new(),
        }
    }

    fn plugin() -> PluginConfig {
        PluginConfig {
            server_name: String::from("www.example.com"),
            key: String::from("K"),
            ticket_time_hint: 60,
            browser: Browser::Firefox,
            fast_open: true,
        }
    }

    fn clock() -> Box<dyn TimeSource> {
        Box::new(FixedClock(UNIX_EPOCH + Duration::from_secs(1000)))
    }

    #[test]
    fn test_valid() {
        let state = State::new(settings(), plugin(), clock()).unwrap();
        assert_eq!(state.local_port(), 1984);
        assert_eq!(state.remote_host(), "proxy.example.com");
        assert_eq!(state.server_name(), "www.example.com");
        assert_eq!(state.browser(), Browser::Firefox);
        assert!(state.fast_open());
        assert_eq!(state.replay_window(), Duration::from_secs(60));
        assert_eq!(state.key(), &derive_key("K"));
        assert_eq!(state.now(), UNIX_EPOCH + Duration::from_secs(1000));
        assert_eq!(state.relay_capacities(), RelayCapacities::default());
    }

    #[test]
    fn test_opaque_is_per_state() {
        let a = State::new(settings(), plugin(), clock()).unwrap();
        let b = State::new(settings(), plugin(), clock()).unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.opaque(), b.opaque());
    }

    #[test]
    fn test_validation_order() {
        let mut s = settings();
        s.local_port = None;
        s.remote_host = None;
        let mut p = plugin();
        p.key.clear();
        p.ticket_time_hint = 0;

        let result = State::new(s.clone(), p.clone(), clock());
        assert!(matches!(result, Err(ConfigError::MissingLocalPort)));

        s.local_port = Some(1);
        let result = State::new(s.clone(), p.clone(), clock());
        assert!(matches!(result, Err(ConfigError::MissingRemoteHost)));

        s.remote_host = Some(String::from("h"));
        let result = State::new(s.clone(), p.clone(), clock());
        assert!(matches!(result, Err(ConfigError::EmptyKey)));

        p.key.push('K');
        let result = State::new(s.clone(), p.clone(), clock());
        assert!(matches!(result, Err(ConfigError::ZeroTicketTimeHint)));

        p.ticket_time_hint = 1;
        assert!(State::new(s, p, clock()).is_ok());
    }

    #[test]
    fn test_server_name_length_limit() {
        let mut p = plugin();
        p.server_name = "a".repeat(MAX_SERVER_NAME_LEN);
        assert!(State::new(settings(), p.clone(), clock()).is_ok());

        p.server_name = "a".repeat(70_000);
        let result = State::new(settings(), p, clock());
        assert!(matches!(result, Err(ConfigError::ServerNameTooLong(70_000))));
    }
}
