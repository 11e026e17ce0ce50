//! Overflow policies for the async write queue
//!
//! When the queue is full, the policy decides which task gives way.

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy for handling queue overflow
///
/// # Example
///
/// ```
/// use rust_scoped_logger::core::OverflowPolicy;
///
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropNewest);
/// assert_eq!("3".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::BlockUntilSpace);
/// assert_eq!("drop_oldest".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::DropOldest);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Remove the most recently queued pending task, then enqueue the new one
    #[default]
    DropNewest,

    /// Remove the earliest queued pending task, then enqueue the new one
    DropOldest,

    /// Wait for space in bounded slices until the task is accepted.
    ///
    /// Applies backpressure to the producer. Nothing is dropped unless the
    /// consumer has already terminated.
    BlockUntilSpace,

    /// Discard the task being submitted
    DropCurrent,
}

impl OverflowPolicy {
    /// Numeric code used in configuration files
    pub fn code(&self) -> u8 {
        match self {
            OverflowPolicy::DropNewest => 1,
            OverflowPolicy::DropOldest => 2,
            OverflowPolicy::BlockUntilSpace => 3,
            OverflowPolicy::DropCurrent => 4,
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::BlockUntilSpace => write!(f, "BlockUntilSpace"),
            OverflowPolicy::DropCurrent => write!(f, "DropCurrent"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "1" | "dropnewest" => Ok(OverflowPolicy::DropNewest),
            "2" | "dropoldest" => Ok(OverflowPolicy::DropOldest),
            "3" | "blockuntilspace" | "block" => Ok(OverflowPolicy::BlockUntilSpace),
            "4" | "dropcurrent" => Ok(OverflowPolicy::DropCurrent),
            _ => Err(LoggerError::config(
                "OverflowPolicy",
                format!("unknown overflow policy '{}'", s),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropNewest);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
        assert_eq!(OverflowPolicy::BlockUntilSpace.to_string(), "BlockUntilSpace");
        assert_eq!(OverflowPolicy::DropCurrent.to_string(), "DropCurrent");
    }

    #[test]
    fn test_codes_round_trip() {
        for policy in [
            OverflowPolicy::DropNewest,
            OverflowPolicy::DropOldest,
            OverflowPolicy::BlockUntilSpace,
            OverflowPolicy::DropCurrent,
        ] {
            assert_eq!(policy.code().to_string().parse::<OverflowPolicy>().unwrap(), policy);
            assert_eq!(policy.to_string().parse::<OverflowPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_unknown_policy() {
        assert!("5".parse::<OverflowPolicy>().is_err());
        assert!("sometimes".parse::<OverflowPolicy>().is_err());
    }
}
