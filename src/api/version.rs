//! API version parsing and ordering.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ProtocolError, Result};

const VERSION_PATTERN: &str = r"^\s*(\d+)\.(\d+)\.(\d+)(.*?)\s*$";

static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

fn version_regex() -> &'static Regex {
    VERSION_REGEX.get_or_init(|| Regex::new(VERSION_PATTERN).expect("valid regex pattern"))
}

/// Version reported by `apiinfo.version`, e.g. `7.0.0` or `7.2.0rc1`.
///
/// Ordering compares `major`, `minor` and `revision` numerically; the textual
/// suffix only breaks ties, with the bare release sorting first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct APIVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub suffix: String,
}

impl APIVersion {
    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            suffix: String::new(),
        }
    }

    /// `(major, minor)` pair, e.g. `(6, 4)` for `6.4.12`.
    pub fn major_minor(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    /// Long-term support releases are `X.0` without a pre-release suffix.
    pub fn is_lts(&self) -> bool {
        self.suffix.is_empty() && self.minor == 0
    }
}

impl FromStr for APIVersion {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        let caps = version_regex()
            .captures(raw)
            .ok_or_else(|| ProtocolError::InvalidVersion(raw.to_string()))?;

        let number = |idx: usize| -> Result<u32> {
            caps.get(idx)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| ProtocolError::InvalidVersion(raw.to_string()))
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            revision: number(3)?,
            suffix: caps.get(4).map_or(String::new(), |m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for APIVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}{}", self.major, self.minor, self.revision, self.suffix)
    }
}
