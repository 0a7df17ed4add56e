use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aviation ceiling/visibility classification, least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightCategory {
    Vfr,
    Mvfr,
    Ifr,
    Lifr,
}

impl FlightCategory {
    pub const ALL: [FlightCategory; 4] = [
        FlightCategory::Vfr,
        FlightCategory::Mvfr,
        FlightCategory::Ifr,
        FlightCategory::Lifr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightCategory::Vfr => "VFR",
            FlightCategory::Mvfr => "MVFR",
            FlightCategory::Ifr => "IFR",
            FlightCategory::Lifr => "LIFR",
        }
    }

    /// Trims and uppercases `text` before matching. Anything that is not one
    /// of the four literals yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "VFR" => Some(FlightCategory::Vfr),
            "MVFR" => Some(FlightCategory::Mvfr),
            "IFR" => Some(FlightCategory::Ifr),
            "LIFR" => Some(FlightCategory::Lifr),
            _ => None,
        }
    }
}

impl fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown flight category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for FlightCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        assert_eq!(FlightCategory::parse(" vfr "), Some(FlightCategory::Vfr));
        assert_eq!(FlightCategory::parse("Mvfr"), Some(FlightCategory::Mvfr));
        assert_eq!(FlightCategory::parse("IFR\n"), Some(FlightCategory::Ifr));
        assert_eq!(FlightCategory::parse("lifr"), Some(FlightCategory::Lifr));
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert_eq!(FlightCategory::parse(""), None);
        assert_eq!(FlightCategory::parse("UNKN"), None);
        assert_eq!(FlightCategory::parse("V FR"), None);
        assert!("SVFR".parse::<FlightCategory>().is_err());
    }

    #[test]
    fn test_display_matches_literal() {
        for cat in FlightCategory::ALL {
            assert_eq!(FlightCategory::parse(&cat.to_string()), Some(cat));
        }
    }
}
