//! Platform and buildpack API versions
//!
//! Behavioral differences between lifecycle callers are gated on a
//! two-component version string ("0.4", "0.6", ...). Comparison is
//! numeric on (major, minor).

use crate::error::{LaminaError, LaminaResult};
use std::fmt;
use std::str::FromStr;

/// A parsed API version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a version string, e.g. "0.6". A bare major ("1") is "1.0".
    pub fn parse(s: &str) -> LaminaResult<Self> {
        s.parse()
    }

    pub fn at_least(&self, other: Version) -> bool {
        *self >= other
    }

    pub fn less_than(&self, other: Version) -> bool {
        *self < other
    }
}

impl FromStr for Version {
    type Err = LaminaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LaminaError::InvalidVersion(s.to_string());

        let mut parts = s.split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { major, minor })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
