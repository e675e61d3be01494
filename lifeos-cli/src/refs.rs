/// Record references
///
/// Commands take a `<ref>` instead of a full UUID. A reference is either a
/// 1-based position in the list the user last saw, or a prefix of the id
/// (case-insensitive, with or without hyphens). A position wins when both readings
/// are possible.

use uuid::Uuid;

use crate::error::{CliError, CliResult};

/// Ids in the order the last inbox and task listings showed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listings {
    /// Last inbox listing
    pub inbox: Vec<Uuid>,

    /// Last task listing (board, today or completed)
    pub tasks: Vec<Uuid>,
}

/// Resolves `reference` against the last `listed` ids, then against every
/// id in `known`
///
/// # Errors
///
/// `CliError::Reference` if nothing or more than one id matches.
pub fn resolve<'a, I>(reference: &str, listed: &[Uuid], known: I) -> CliResult<Uuid>
where
    I: IntoIterator<Item = &'a Uuid>,
{
    let reference = reference.trim();

    if let Ok(position) = reference.parse::<usize>() {
        if position >= 1 && position <= listed.len() {
            return Ok(listed[position - 1]);
        }
    }

    let prefix = reference.to_ascii_lowercase();
    if prefix.is_empty() {
        return Err(CliError::Reference("Empty reference".to_string()));
    }

    let mut matches = known
        .into_iter()
        .filter(|id| {
            id.simple().to_string().starts_with(&prefix)
                || id.hyphenated().to_string().starts_with(&prefix)
        });

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(*id),
        (Some(_), Some(_)) => Err(CliError::Reference(format!(
            "'{}' matches more than one record, type more of the id",
            reference
        ))),
        (None, _) => Err(CliError::Reference(format!("Nothing matches '{}'", reference))),
    }
}

/// First 8 characters of an id, as shown in listings
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_position_wins() {
        let a = id("11111111-0000-0000-0000-000000000000");
        let b = id("22222222-0000-0000-0000-000000000000");
        let listed = vec![b, a];

        assert_eq!(resolve("1", &listed, &listed).unwrap(), b);
        assert_eq!(resolve(" 2 ", &listed, &listed).unwrap(), a);
    }

    #[test]
    fn test_prefix_lookup() {
        let a = id("abcdef00-0000-0000-0000-000000000000");
        let b = id("abc12300-0000-0000-0000-000000000000");
        let known = vec![a, b];

        assert_eq!(resolve("ABCD", &[], &known).unwrap(), a);
        assert!(matches!(resolve("abc", &[], &known), Err(CliError::Reference(_))));
        assert!(matches!(resolve("ffff", &[], &known), Err(CliError::Reference(_))));
        assert!(matches!(resolve("", &[], &known), Err(CliError::Reference(_))));
    }

    #[test]
    fn test_prefix_past_short_id() {
        let a = id("abcdef01-2345-6789-abcd-ef0123456789");
        let b = id("abcdef01-9999-6789-abcd-ef0123456789");
        let known = vec![a, b];

        assert!(matches!(resolve(&short_id(a), &[], &known), Err(CliError::Reference(_))));
        assert_eq!(resolve("abcdef0123", &[], &known).unwrap(), a);
        assert_eq!(resolve("abcdef01-23", &[], &known).unwrap(), a);
        assert_eq!(resolve("ABCDEF019", &[], &known).unwrap(), b);
    }

    #[test]
    fn test_out_of_range_position_falls_back_to_prefix() {
        let a = id("90000000-0000-0000-0000-000000000000");
        let listed = vec![id("10000000-0000-0000-0000-000000000000")];

        assert_eq!(resolve("9", &listed, &[a]).unwrap(), a);
    }

    #[test]
    fn test_short_id() {
        let a = id("abcdef01-2345-6789-abcd-ef0123456789");
        assert_eq!(short_id(a), "abcdef01");
    }
}
