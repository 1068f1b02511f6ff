//! User-facing language selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language used for rendered messages. The calendar UI defaults to Hebrew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Hebrew,
    English,
}

impl Locale {
    /// Returns the BCP 47 language code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Hebrew => "he",
            Self::English => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "he" | "hebrew" => Ok(Self::Hebrew),
            "en" | "english" => Ok(Self::English),
            other => Err(format!("unknown locale: {other}")),
        }
    }
}
