use std::{fmt, str::FromStr};

use serde::Deserialize;

/// The browser whose ClientHello we imitate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chrome => write!(f, "chrome"),
            Self::Firefox => write!(f, "firefox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBrowser(pub String);

impl fmt::Display for UnknownBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown browser \"{}\", expected chrome or firefox", self.0)
    }
}

impl FromStr for Browser {
    type Err = UnknownBrowser;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("chrome") {
            Ok(Self::Chrome)
        } else if s.eq_ignore_ascii_case("firefox") {
            Ok(Self::Firefox)
        } else {
            Err(UnknownBrowser(s.to_string()))
        }
    }
}

impl TryFrom<String> for Browser {
    type Error = UnknownBrowser;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("chrome".parse(), Ok(Browser::Chrome));
        assert_eq!("Firefox".parse(), Ok(Browser::Firefox));
        assert_eq!("safari".parse::<Browser>(), Err(UnknownBrowser(String::from("safari"))));
    }

    #[test]
    fn test_deserialize() {
        assert_eq!(serde_json::from_str::<Browser>("\"FIREFOX\"").unwrap(), Browser::Firefox);
        assert!(serde_json::from_str::<Browser>("\"lynx\"").is_err());
    }
}
