use serde::{Deserialize, Serialize};
use std::fmt;

/// A span of source text.
///
/// Lines are 1-based, columns are 0-based character offsets. The end position
/// is exclusive on its line, the same convention the annotator uses for node
/// ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextRange {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl TextRange {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Like [`TextRange::new`] but returns `None` when the end lies before the start.
    pub fn checked(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Option<Self> {
        let range = Self::new(start_line, start_col, end_line, end_col);
        range.is_well_formed().then_some(range)
    }

    pub fn is_well_formed(&self) -> bool {
        (self.start_line, self.start_col) <= (self.end_line, self.end_col)
    }

    /// True when `other` starts strictly after and ends strictly before `self`.
    pub fn contains_smaller(&self, other: &TextRange) -> bool {
        (other.start_line > self.start_line
            || other.start_line == self.start_line && other.start_col > self.start_col)
            && (other.end_line < self.end_line
                || other.end_line == self.end_line && other.end_col < self.end_col)
    }

    /// Boundary-inclusive variant of [`TextRange::contains_smaller`].
    pub fn contains_smaller_eq(&self, other: &TextRange) -> bool {
        (other.start_line > self.start_line
            || other.start_line == self.start_line && other.start_col >= self.start_col)
            && (other.end_line < self.end_line
                || other.end_line == self.end_line && other.end_col <= self.end_col)
    }

    pub fn is_smaller_in(&self, other: &TextRange) -> bool {
        other.contains_smaller(self)
    }

    pub fn not_smaller_in(&self, other: &TextRange) -> bool {
        !other.contains_smaller(self)
    }

    pub fn is_smaller_eq_in(&self, other: &TextRange) -> bool {
        other.contains_smaller_eq(self)
    }

    pub fn not_smaller_eq_in(&self, other: &TextRange) -> bool {
        !other.contains_smaller_eq(self)
    }

    /// Start position in `line.col` form.
    pub fn start_index(&self) -> String {
        format!("{}.{}", self.start_line, self.start_col)
    }

    /// End position in `line.col` form.
    pub fn end_index(&self) -> String {
        format!("{}.{}", self.end_line, self.end_col)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TR({}, {})", self.start_index(), self.end_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    fn range(t: (u8, u8, u8, u8)) -> TextRange {
        TextRange::new(t.0 as usize, t.1 as usize, t.2 as usize, t.3 as usize)
    }

    #[test]
    fn test_strict_containment() {
        let outer = TextRange::new(1, 0, 3, 10);
        let inner = TextRange::new(1, 4, 3, 2);
        assert!(outer.contains_smaller(&inner));
        assert!(inner.is_smaller_in(&outer));
        assert!(!inner.contains_smaller(&outer));

        // shares the start boundary
        let touching = TextRange::new(1, 0, 2, 0);
        assert!(!outer.contains_smaller(&touching));
        assert!(outer.contains_smaller_eq(&touching));
        assert!(touching.not_smaller_in(&outer));
        assert!(touching.is_smaller_eq_in(&outer));
    }

    #[test]
    fn test_display_forms() {
        let r = TextRange::new(1, 2, 3, 4);
        assert_eq!(r.start_index(), "1.2");
        assert_eq!(r.end_index(), "3.4");
        assert_eq!(r.to_string(), "TR(1.2, 3.4)");
    }

    #[test]
    fn test_checked_rejects_reversed() {
        assert!(TextRange::checked(2, 0, 1, 5).is_none());
        assert!(TextRange::checked(2, 5, 2, 1).is_none());
        assert_eq!(TextRange::checked(2, 1, 2, 1), Some(TextRange::new(2, 1, 2, 1)));
    }

    #[test]
    fn prop_strict_implies_inclusive() {
        fn prop(a: (u8, u8, u8, u8), b: (u8, u8, u8, u8)) -> TestResult {
            let (a, b) = (range(a), range(b));
            if !a.is_well_formed() || !b.is_well_formed() {
                return TestResult::discard();
            }
            TestResult::from_bool(!a.contains_smaller(&b) || a.contains_smaller_eq(&b))
        }
        QuickCheck::new().quickcheck(prop as fn((u8, u8, u8, u8), (u8, u8, u8, u8)) -> TestResult);
    }

    #[test]
    fn prop_reflexivity() {
        fn prop(a: (u8, u8, u8, u8)) -> bool {
            let a = range(a);
            !a.contains_smaller(&a) && a.contains_smaller_eq(&a)
        }
        QuickCheck::new().quickcheck(prop as fn((u8, u8, u8, u8)) -> bool);
    }
}
