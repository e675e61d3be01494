/// Task categories
///
/// Every task belongs to exactly one category from a fixed set. Categories
/// are stored and displayed by name ("Personal", "Work", ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an unknown category name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

/// Task category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    /// Personal errands and life admin
    #[default]
    Personal,

    /// Job-related work
    Work,

    /// Study and skill building
    Learning,

    /// Exercise, appointments, wellbeing
    Health,

    /// Money matters
    Finance,

    /// Anything else
    Other,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 6] = [
        Category::Personal,
        Category::Work,
        Category::Learning,
        Category::Health,
        Category::Finance,
        Category::Other,
    ];

    /// Returns the display/storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "Personal",
            Category::Work => "Work",
            Category::Learning => "Learning",
            Category::Health => "Health",
            Category::Finance => "Finance",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive lookup by name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownCategory(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_as_str() {
        assert_eq!(Category::Personal.as_str(), "Personal");
        assert_eq!(Category::Finance.as_str(), "Finance");
        assert_eq!(Category::Other.to_string(), "Other");
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("work".parse::<Category>().unwrap(), Category::Work);
        assert_eq!(" HEALTH ".parse::<Category>().unwrap(), Category::Health);
        assert_eq!(
            "Chores".parse::<Category>(),
            Err(UnknownCategory("Chores".to_string()))
        );
    }

    #[test]
    fn test_category_serde_uses_names() {
        let json = serde_json::to_string(&Category::Learning).unwrap();
        assert_eq!(json, "\"Learning\"");
        let parsed: Category = serde_json::from_str("\"Work\"").unwrap();
        assert_eq!(parsed, Category::Work);
        assert!(serde_json::from_str::<Category>("\"Chores\"").is_err());
    }

    #[test]
    fn test_default_category() {
        assert_eq!(Category::default(), Category::Personal);
    }
}
