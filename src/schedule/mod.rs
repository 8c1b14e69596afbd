//! Traditional reading schedule calculator.
//!
//! Tehillim is traditionally divided two ways: a 7-part split for reading the
//! whole book over a week, and a 30-part split for reading it over the days
//! of a (30-day) month. Both tables are fixed by tradition and never computed
//! at runtime.

use chrono::{Datelike, NaiveDate};

use crate::texts::MAX_CHAPTER;

/// An inclusive range of chapters assigned to one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    pub from: u32,
    pub to: u32,
}

impl ChapterRange {
    const fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    /// Whether this range is a single chapter.
    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.from == self.to
    }

    /// Iterates the chapters in this range.
    pub fn chapters(&self) -> impl Iterator<Item = u32> {
        self.from..=self.to
    }

    /// Hebrew label for the range, e.g. "פרק 23" or "פרקים 1–9".
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_single() {
            format!("פרק {}", self.from)
        } else {
            format!("פרקים {}–{}", self.from, self.to)
        }
    }
}

/// Weekly split, indexed by ISO weekday (Monday = 1 .. Sunday = 7).
const WEEKLY_SPLIT: [ChapterRange; 7] = [
    ChapterRange::new(1, 29),
    ChapterRange::new(30, 50),
    ChapterRange::new(51, 72),
    ChapterRange::new(73, 89),
    ChapterRange::new(90, 106),
    ChapterRange::new(107, 119),
    ChapterRange::new(120, 150),
];

/// Monthly split, indexed by day of a 30-day month. Days 25–28 all read
/// Psalm 119, which is further divided into four parts.
const MONTHLY_SPLIT: [ChapterRange; 30] = [
    ChapterRange::new(1, 9),
    ChapterRange::new(10, 17),
    ChapterRange::new(18, 22),
    ChapterRange::new(23, 28),
    ChapterRange::new(29, 34),
    ChapterRange::new(35, 38),
    ChapterRange::new(39, 43),
    ChapterRange::new(44, 48),
    ChapterRange::new(49, 54),
    ChapterRange::new(55, 59),
    ChapterRange::new(60, 65),
    ChapterRange::new(66, 68),
    ChapterRange::new(69, 71),
    ChapterRange::new(72, 76),
    ChapterRange::new(77, 78),
    ChapterRange::new(79, 82),
    ChapterRange::new(83, 87),
    ChapterRange::new(88, 89),
    ChapterRange::new(90, 96),
    ChapterRange::new(97, 103),
    ChapterRange::new(104, 105),
    ChapterRange::new(106, 107),
    ChapterRange::new(108, 112),
    ChapterRange::new(113, 118),
    ChapterRange::new(119, 119),
    ChapterRange::new(119, 119),
    ChapterRange::new(119, 119),
    ChapterRange::new(119, 119),
    ChapterRange::new(120, 134),
    ChapterRange::new(135, 150),
];

/// Returns the weekly portion for the given date.
///
/// Keyed by ISO weekday, so Monday reads chapters 1–29 and Shabbat closes
/// the book with 120–150.
#[must_use]
pub fn weekly_portion(date: NaiveDate) -> (u32, ChapterRange) {
    let weekday = date.weekday().number_from_monday();
    (weekday, WEEKLY_SPLIT[(weekday - 1) as usize])
}

/// Returns the monthly portion for the given date.
///
/// The 31st of a longer month reads the day-30 portion again, so the cycle
/// always finishes within the calendar month.
#[must_use]
pub fn monthly_portion(date: NaiveDate) -> (u32, ChapterRange) {
    let day = date.day().min(30);
    (day, MONTHLY_SPLIT[(day - 1) as usize])
}

/// Whether the given monthly day reads a part of Psalm 119 rather than a
/// full-chapter range.
#[must_use]
pub const fn is_psalm119_day(day: u32) -> bool {
    day >= 25 && day <= 28
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_covers_all_chapters_contiguously() {
        let mut next = 1;
        for range in WEEKLY_SPLIT {
            assert_eq!(range.from, next);
            assert!(range.to >= range.from);
            next = range.to + 1;
        }
        assert_eq!(next, MAX_CHAPTER + 1);
    }

    #[test]
    fn test_monthly_covers_all_chapters() {
        let mut next = 1;
        for range in MONTHLY_SPLIT {
            if range.from == 119 && range.to == 119 && next == 120 {
                // Days 26-28 repeat Psalm 119.
                continue;
            }
            assert_eq!(range.from, next);
            next = range.to + 1;
        }
        assert_eq!(next, MAX_CHAPTER + 1);
    }

    #[test]
    fn test_weekly_portion_by_weekday() {
        // 2024-01-01 was a Monday.
        let (day, range) = weekly_portion(date(2024, 1, 1));
        assert_eq!(day, 1);
        assert_eq!(range, ChapterRange::new(1, 29));

        // Sunday closes the week.
        let (day, range) = weekly_portion(date(2024, 1, 7));
        assert_eq!(day, 7);
        assert_eq!(range, ChapterRange::new(120, 150));
    }

    #[test]
    fn test_monthly_portion_day_one_and_thirty() {
        let (day, range) = monthly_portion(date(2024, 3, 1));
        assert_eq!(day, 1);
        assert_eq!(range, ChapterRange::new(1, 9));

        let (day, range) = monthly_portion(date(2024, 3, 30));
        assert_eq!(day, 30);
        assert_eq!(range, ChapterRange::new(135, 150));
    }

    #[test]
    fn test_monthly_portion_day_31_maps_to_30() {
        let (day, range) = monthly_portion(date(2024, 3, 31));
        assert_eq!(day, 30);
        assert_eq!(range, ChapterRange::new(135, 150));
    }

    #[test]
    fn test_monthly_psalm119_days() {
        for d in 25..=28 {
            assert!(is_psalm119_day(d));
            let (_, range) = monthly_portion(date(2024, 3, d));
            assert_eq!(range, ChapterRange::new(119, 119));
        }
        assert!(!is_psalm119_day(24));
        assert!(!is_psalm119_day(29));
    }

    #[test]
    fn test_portions_are_deterministic() {
        let d = date(2025, 8, 31);
        assert_eq!(weekly_portion(d), weekly_portion(d));
        assert_eq!(monthly_portion(d), monthly_portion(d));
    }

    #[test]
    fn test_range_label() {
        assert_eq!(ChapterRange::new(5, 5).label(), "פרק 5");
        assert_eq!(ChapterRange::new(1, 9).label(), "פרקים 1–9");
    }
}
