use std::time::SystemTime;

/// Where the handshake token gets the current time from.
pub trait TimeSource {
    fn now(&self) -> SystemTime;
}

/// The system's wall clock.
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
