use std::{cmp::Ordering, fmt};

use crate::models::CatalogItem;

/// Orderings offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOption {
    /// Most recently added first; undated items last.
    #[default]
    DateAddedNewest,
    /// Oldest additions first; undated items first.
    DateAddedOldest,
    /// Alphabetical.
    NameAsc,
    /// Reverse alphabetical.
    NameDesc,
    /// Grouped released, coming soon, distant future, unknown.
    ReleaseStatus,
}

impl SortOption {
    /// All options in menu order.
    pub const ALL: [SortOption; 5] = [
        Self::DateAddedNewest,
        Self::DateAddedOldest,
        Self::NameAsc,
        Self::NameDesc,
        Self::ReleaseStatus,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::DateAddedNewest => "Date Added (Newest First)",
            Self::DateAddedOldest => "Date Added (Oldest First)",
            Self::NameAsc => "Name (A-Z)",
            Self::NameDesc => "Name (Z-A)",
            Self::ReleaseStatus => "Release Status",
        }
    }

    /// Inverse of [`label`](Self::label).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.label() == label)
    }

    /// Following option, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|option| *option == self)
            .unwrap_or_default();
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    fn compare(self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        let by_name = || a.name.cmp(&b.name);
        match self {
            Self::DateAddedNewest => match (a.date_added, b.date_added) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(by_name),
            // `None` orders before `Some`, which puts undated items first.
            Self::DateAddedOldest => a.date_added.cmp(&b.date_added).then_with(by_name),
            Self::NameAsc => by_name(),
            Self::NameDesc => b.name.cmp(&a.name),
            Self::ReleaseStatus => a
                .release_status
                .rank()
                .cmp(&b.release_status.rank())
                .then_with(by_name),
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reorder `items` in place. `None` leaves the order untouched.
pub fn sort(items: &mut [CatalogItem], option: Option<SortOption>) {
    if let Some(option) = option {
        items.sort_by(|a, b| option.compare(a, b));
    }
}

/// Sorted copy of `items`.
pub fn sorted(items: &[CatalogItem], option: Option<SortOption>) -> Vec<CatalogItem> {
    let mut items = items.to_vec();
    sort(&mut items, option);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseStatus;
    use chrono::{TimeZone, Utc};

    fn dated(name: &str, day: Option<u32>) -> CatalogItem {
        let mut item = CatalogItem::named(None, name);
        item.date_added = day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap());
        item
    }

    fn names(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn newest_first_puts_undated_last() {
        let items = vec![dated("A", Some(1)), dated("B", Some(2)), dated("C", None)];
        let sorted = sorted(&items, Some(SortOption::DateAddedNewest));
        assert_eq!(names(&sorted), vec!["B", "A", "C"]);
    }

    #[test]
    fn oldest_first_puts_undated_first() {
        let items = vec![dated("A", Some(1)), dated("B", Some(2)), dated("C", None)];
        let sorted = sorted(&items, Some(SortOption::DateAddedOldest));
        assert_eq!(names(&sorted), vec!["C", "A", "B"]);
    }

    #[test]
    fn equal_dates_break_ties_by_name() {
        let items = vec![dated("Zeta", Some(3)), dated("Alpha", Some(3)), dated("Mid", None)];
        let sorted = sorted(&items, Some(SortOption::DateAddedNewest));
        assert_eq!(names(&sorted), vec!["Alpha", "Zeta", "Mid"]);
    }

    #[test]
    fn release_status_groups_by_rank() {
        let mut items = vec![
            dated("Unknown One", None),
            dated("Soon", None),
            dated("Out", None),
            dated("Later", None),
        ];
        items[1].release_status = ReleaseStatus::ComingSoon;
        items[2].release_status = ReleaseStatus::Released;
        items[3].release_status = ReleaseStatus::DistantFuture;

        sort(&mut items, Some(SortOption::ReleaseStatus));
        assert_eq!(names(&items), vec!["Out", "Soon", "Later", "Unknown One"]);
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        let items = vec![
            dated("b", Some(2)),
            dated("a", None),
            dated("c", Some(2)),
            dated("d", Some(5)),
        ];
        for option in SortOption::ALL {
            let once = sorted(&items, Some(option));
            let twice = sorted(&once, Some(option));
            assert_eq!(once, twice, "{option}");
        }
    }

    #[test]
    fn unknown_label_is_identity() {
        let items = vec![dated("b", None), dated("a", None)];
        let option = SortOption::from_label("Popularity");
        assert!(option.is_none());
        assert_eq!(names(&sorted(&items, option)), vec!["b", "a"]);
    }

    #[test]
    fn labels_round_trip_and_cycle() {
        for option in SortOption::ALL {
            assert_eq!(SortOption::from_label(option.label()), Some(option));
        }
        assert_eq!(SortOption::ReleaseStatus.next(), SortOption::DateAddedNewest);
        assert_eq!(SortOption::NameAsc.next(), SortOption::NameDesc);
    }
}
