pub mod consts;
pub mod counters;
pub mod errors;
pub mod events;
pub mod manager;
pub mod modes;
pub mod overlap_counter;
pub mod tables;

// re-exports
pub use counters::*;
pub use errors::*;
pub use events::*;
pub use manager::*;
pub use modes::*;
pub use overlap_counter::*;
pub use tables::*;
