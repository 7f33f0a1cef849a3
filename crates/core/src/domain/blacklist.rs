// Recipient denylist

use std::collections::HashSet;
use std::sync::Arc;

/// Numbers rejected when no denylist is configured
pub const DEFAULT_BLACKLISTED_NUMBERS: [&str; 2] = ["4153518780", "4153518781"];

/// Immutable set of phone numbers that must never receive a notification.
///
/// Built once at startup and shared read-only by every execution; cloning
/// only bumps a reference count.
#[derive(Debug, Clone, Default)]
pub struct BlacklistSet {
    numbers: Arc<HashSet<String>>,
}

impl BlacklistSet {
    pub fn new<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            numbers: Arc::new(numbers.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a comma-separated list, skipping blank entries
    pub fn from_csv(csv: &str) -> Self {
        Self::new(
            csv.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty()),
        )
    }

    pub fn contains(&self, phone_number: &str) -> bool {
        self.numbers.contains(phone_number)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_default_numbers() {
        let blacklist = BlacklistSet::new(DEFAULT_BLACKLISTED_NUMBERS);
        assert!(blacklist.contains("4153518780"));
        assert!(blacklist.contains("4153518781"));
        assert!(!blacklist.contains("4159999999"));
        assert_eq!(blacklist.len(), 2);
    }

    #[test]
    fn test_from_csv_trims_and_skips_blanks() {
        let blacklist = BlacklistSet::from_csv(" 111 , ,222,");
        assert_eq!(blacklist.len(), 2);
        assert!(blacklist.contains("111"));
        assert!(blacklist.contains("222"));
    }

    #[test]
    fn test_empty_set() {
        let blacklist = BlacklistSet::default();
        assert!(blacklist.is_empty());
        assert!(!blacklist.contains(""));
    }
}
