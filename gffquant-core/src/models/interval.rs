use std::cmp::Ordering;

use num_traits::{PrimInt, Unsigned};

/// A half-open range `[start, end)` carrying a payload.
///
/// Ordering and equality only look at the coordinates, never at `val`.
#[derive(Eq, Debug, Clone)]
pub struct Interval<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    pub start: I,
    pub end: I,
    pub val: T,
}

impl<I, T> Interval<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    /// Whether this interval shares at least one position with `[start, end)`.
    #[inline]
    pub fn overlaps(&self, start: I, end: I) -> bool {
        self.start < end && start < self.end
    }

    /// Number of positions covered; zero for empty or inverted intervals.
    #[inline]
    pub fn width(&self) -> I {
        self.end.checked_sub(&self.start).unwrap_or_else(I::zero)
    }
}

impl<I, T> Ord for Interval<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}

impl<I, T> PartialOrd for Interval<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I, T> PartialEq for Interval<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 10, false)]
    #[case(50, 150, true)]
    #[case(199, 300, true)]
    #[case(120, 130, true)]
    #[case(200, 300, false)]
    #[case(0, 100, false)]
    fn test_half_open_overlap(#[case] start: u32, #[case] end: u32, #[case] expected: bool) {
        let iv = Interval {
            start: 100u32,
            end: 200,
            val: (),
        };
        assert_eq!(iv.overlaps(start, end), expected);
    }

    #[rstest]
    fn test_equality_ignores_payload() {
        let a = Interval {
            start: 5u32,
            end: 9,
            val: "a",
        };
        let b = Interval {
            start: 5u32,
            end: 9,
            val: "b",
        };
        assert_eq!(a, b);
        assert_eq!(a.width(), 4);
    }
}
