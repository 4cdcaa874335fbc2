//! Cache partition name
//!
//! The canonical page cache and the warmup lock are both namespaced by a
//! partition (for example an email domain served by this deployment).

use std::fmt;

/// Default partition used when none is configured
pub const DEFAULT_PARTITION: &str = "global";

/// Maximum partition name length
const MAX_PARTITION_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("partition name must not be empty")]
    Empty,

    #[error("partition name longer than 64 characters")]
    TooLong,

    #[error("partition name contains invalid character '{0}'")]
    InvalidChar(char),
}

/// Validated partition name, safe to embed in a Redis key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition(String);

impl Partition {
    /// Create a partition, rejecting names that would break key structure
    pub fn new(name: impl Into<String>) -> Result<Self, PartitionError> {
        let name = name.into().trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(PartitionError::Empty);
        }
        if name.len() > MAX_PARTITION_LEN {
            return Err(PartitionError::TooLong);
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(PartitionError::InvalidChar(c));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self(DEFAULT_PARTITION.to_string())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Partition {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
