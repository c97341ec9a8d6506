//! The query interface of the interval search structures.

use num_traits::{PrimInt, Unsigned};

pub use gffquant_core::models::Interval;

///
/// A static set of intervals answering overlap queries against half-open
/// ranges `[start, end)`. Intervals touching the range only at an end point
/// do not overlap it.
///
pub trait Overlapper<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    /// Build the structure from intervals in any order.
    fn build(intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized;

    /// Borrow every interval overlapping `[start, end)`, in no particular order.
    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a>;

    fn find(&self, start: I, end: I) -> Vec<Interval<I, T>> {
        self.find_iter(start, end).cloned().collect()
    }

    fn has_overlap(&self, start: I, end: I) -> bool {
        self.find_iter(start, end).next().is_some()
    }
}
