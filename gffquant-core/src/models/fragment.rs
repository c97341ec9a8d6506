///
/// The genomic envelope of a merged read pair: `[min(start), max(end))`.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub struct Fragment {
    pub rid: usize,
    pub start: u32,
    pub end: u32,
}

impl Fragment {
    ///
    /// Merge two mate alignments on the same reference into one fragment.
    ///
    /// # Arguments
    /// - rid: reference both mates align to
    /// - mate1: `(start, end)` of the first observed mate
    /// - mate2: `(start, end)` of the second observed mate
    pub fn from_mates(rid: usize, mate1: (u32, u32), mate2: (u32, u32)) -> Self {
        let (start, end) = calculate_fragment_borders(mate1.0, mate1.1, mate2.0, mate2.1);
        Fragment { rid, start, end }
    }

    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// Borders of the fragment spanned by two mates.
pub fn calculate_fragment_borders(start1: u32, end1: u32, start2: u32, end2: u32) -> (u32, u32) {
    (start1.min(start2), end1.max(end2))
}
