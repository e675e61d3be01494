/// Task priority
///
/// Priorities are integers from 1 to 5 where 5 is the most important.
/// The only way to build a [`Priority`] is through a range-checked
/// constructor, so an out-of-range priority cannot reach the store.
///
/// # Example
///
/// ```
/// use lifeos_shared::models::Priority;
///
/// let p = Priority::new(5).unwrap();
/// assert_eq!(p.get(), 5);
/// assert!(Priority::new(6).is_err());
/// assert_eq!(Priority::default().get(), 3);
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a priority is outside 1-5
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Priority must be between {min} and {max}, got {value}", min = Priority::MIN, max = Priority::MAX)]
pub struct InvalidPriority {
    /// The rejected value
    pub value: i64,
}

/// Priority on a 1-5 scale (5 = highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Lowest priority
    pub const MIN: u8 = 1;

    /// Highest priority
    pub const MAX: u8 = 5;

    /// Creates a priority, rejecting values outside 1-5
    pub fn new(value: u8) -> Result<Self, InvalidPriority> {
        Self::try_from(i64::from(value))
    }

    /// Returns the numeric priority
    pub fn get(self) -> u8 {
        self.0
    }

    /// Renders the priority as filled/empty stars
    pub fn stars(self) -> String {
        let filled = usize::from(self.0);
        let empty = usize::from(Self::MAX) - filled;
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }
}

impl Default for Priority {
    /// New tasks start in the middle of the scale
    fn default() -> Self {
        Priority(3)
    }
}

impl TryFrom<i64> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(InvalidPriority { value });
        }
        Ok(Priority(value as u8))
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| InvalidPriority { value: 0 })?;
        Self::try_from(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
