pub mod alignment;
pub mod feature;
pub mod fragment;
pub mod interval;

// re-export for cleaner imports
pub use self::alignment::AlignmentRecord;
pub use self::feature::Feature;
pub use self::fragment::Fragment;
pub use self::interval::Interval;
