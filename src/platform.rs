//! Build targets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A platform the orchestrator can build for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// WeChat mini program
    Wx,
    /// QQ mini program
    Qq,
    /// Alipay mini program
    Ali,
    /// Baidu smart program
    Bu,
    /// ByteDance mini program
    Tt,
    /// Quick app
    Quick,
    /// Browser build
    H5,
}

impl Platform {
    pub const ALL: [Platform; 7] = [
        Platform::Wx,
        Platform::Qq,
        Platform::Ali,
        Platform::Bu,
        Platform::Tt,
        Platform::Quick,
        Platform::H5,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Wx => "wx",
            Platform::Qq => "qq",
            Platform::Ali => "ali",
            Platform::Bu => "bu",
            Platform::Tt => "tt",
            Platform::Quick => "quick",
            Platform::H5 => "h5",
        }
    }

    /// Value exported as `ANU_ENV` to the compiler
    pub fn runtime_marker(&self) -> &'static str {
        match self {
            Platform::H5 => "web",
            other => other.name(),
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Platform::H5)
    }

    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(Platform::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| {
                format!(
                    "Unsupported platform: {}. Valid options: {}",
                    s,
                    Self::supported_names()
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_platforms() {
        for platform in Platform::ALL {
            assert_eq!(platform.name().parse::<Platform>(), Ok(platform));
        }
        assert_eq!("QUICK".parse::<Platform>(), Ok(Platform::Quick));
    }

    #[test]
    fn test_parse_unknown_platform() {
        let err = "android".parse::<Platform>().unwrap_err();
        assert!(err.contains("android"));
        assert!(err.contains("wx"));
    }

    #[test]
    fn test_runtime_marker() {
        assert_eq!(Platform::H5.runtime_marker(), "web");
        assert_eq!(Platform::Quick.runtime_marker(), "quick");
        assert!(Platform::H5.is_web());
        assert!(!Platform::Wx.is_web());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Platform::Ali).unwrap();
        assert_eq!(json, "\"ali\"");
    }
}
