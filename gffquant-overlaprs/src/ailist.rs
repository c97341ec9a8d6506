use num_traits::{PrimInt, Unsigned};

use super::Overlapper;
use gffquant_core::models::Interval;

/// Intervals covering at least this many of their successors are pushed
/// down into the next sublist.
const MIN_COVERAGE: usize = 10;

/// An Augmented Interval List.
///
/// From the following article: <https://academic.oup.com/bioinformatics/article/35/23/4907/5509521>
///
/// Intervals are split into start-sorted sublists; long intervals that would
/// swallow many of their neighbours are moved to later sublists, so the
/// running maximum of end positions stays tight and a query can stop
/// scanning as soon as that maximum falls at or below the query start.
///
/// ```
/// use gffquant_overlaprs::{AIList, Overlapper, Interval};
///
/// let genes = vec![
///     Interval { start: 1000u32, end: 2000, val: "GENE1" },
///     Interval { start: 1500, end: 2500, val: "GENE2" },
///     Interval { start: 5000, end: 6000, val: "GENE3" },
/// ];
///
/// let ailist = AIList::build(genes);
/// assert_eq!(ailist.find(1800, 2200).len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct AIList<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    sublists: Vec<Sublist<I, T>>,
}

#[derive(Debug, Clone)]
struct Sublist<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    starts: Vec<I>,
    /// running maximum of end positions
    max_ends: Vec<I>,
    intervals: Vec<Interval<I, T>>,
}

impl<I, T> Sublist<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    fn from_sorted(intervals: Vec<Interval<I, T>>) -> Self {
        let starts = intervals.iter().map(|iv| iv.start).collect();
        let max_ends = intervals
            .iter()
            .scan(I::zero(), |max_end, iv| {
                *max_end = (*max_end).max(iv.end);
                Some(*max_end)
            })
            .collect();
        Sublist {
            starts,
            max_ends,
            intervals,
        }
    }

    /// Index one past the last interval that starts before `end`.
    fn upper_bound(&self, end: I) -> usize {
        self.starts.partition_point(|&s| s < end)
    }
}

impl<I, T> AIList<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    /// Split start-sorted intervals into the ones kept at this level and the
    /// ones that cover too many successors.
    fn decompose(intervals: Vec<Interval<I, T>>) -> (Vec<Interval<I, T>>, Vec<Interval<I, T>>) {
        let mut kept = Vec::with_capacity(intervals.len());
        let mut pushed_down = Vec::new();

        for (index, iv) in intervals.iter().enumerate() {
            let covered = intervals
                .iter()
                .skip(index + 1)
                .take(MIN_COVERAGE * 2 - 1)
                .filter(|next| iv.end > next.end)
                .count();
            if covered >= MIN_COVERAGE {
                pushed_down.push(iv.clone());
            } else {
                kept.push(iv.clone());
            }
        }
        (kept, pushed_down)
    }

    /// Returns the number of intervals in the AIList.
    pub fn len(&self) -> usize {
        self.sublists.iter().map(|sl| sl.intervals.len()).sum()
    }

    /// Returns `true` if the AIList contains no intervals.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I, T> Overlapper<I, T> for AIList<I, T>
where
    I: PrimInt + Unsigned,
    T: Eq + Clone,
{
    fn build(mut intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized,
    {
        intervals.sort();

        let mut sublists = Vec::new();
        while !intervals.is_empty() {
            let (kept, pushed_down) = Self::decompose(intervals);
            // nothing left to separate: keep the rest together
            if kept.is_empty() {
                sublists.push(Sublist::from_sorted(pushed_down));
                break;
            }
            sublists.push(Sublist::from_sorted(kept));
            intervals = pushed_down;
        }

        AIList { sublists }
    }

    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a> {
        Box::new(self.sublists.iter().flat_map(move |sl| {
            let upper = sl.upper_bound(end);
            (0..upper)
                .rev()
                .take_while(move |&i| sl.max_ends[i] > start)
                .map(move |i| &sl.intervals[i])
                .filter(move |iv| iv.end > start)
        }))
    }
}
