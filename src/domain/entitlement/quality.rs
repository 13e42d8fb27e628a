//! Video quality tiers that pricing and purchases are keyed on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    Sd480,
    Hd720,
    #[default]
    Hd1080,
    Uhd4k,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::Sd480,
        Quality::Hd720,
        Quality::Hd1080,
        Quality::Uhd4k,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Sd480 => "480p",
            Quality::Hd720 => "720p",
            Quality::Hd1080 => "1080p",
            Quality::Uhd4k => "4K",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "quality",
                    format!("expected one of 480p, 720p, 1080p, 4K; got '{}'", s),
                )
            })
    }
}

impl TryFrom<String> for Quality {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(q: Quality) -> Self {
        q.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("4k".parse::<Quality>().unwrap(), Quality::Uhd4k);
        assert_eq!("720P".parse::<Quality>().unwrap(), Quality::Hd720);
        assert!("8K".parse::<Quality>().is_err());
    }

    #[test]
    fn default_is_1080p() {
        assert_eq!(Quality::default(), Quality::Hd1080);
    }

    #[test]
    fn serializes_as_label() {
        assert_eq!(serde_json::to_string(&Quality::Uhd4k).unwrap(), "\"4K\"");
    }
}
