//! The stateful stream processors
//!
//! Each processor consumes events one at a time and synchronously produces
//! zero or more output events, buffering where its semantics require full
//! visibility (linear fill runs, open windows, same-key dedup runs).

pub mod aggregator;
pub mod align;
pub mod collapser;
pub mod deduper;
pub mod filler;
pub mod mapper;
pub mod offset;
pub mod rate;
pub mod selector;
pub mod taker;

pub use aggregator::Aggregator;
pub use align::Aligner;
pub use collapser::Collapser;
pub use deduper::Deduper;
pub use filler::Filler;
pub use mapper::{Filter, Mapper};
pub use offset::Offset;
pub use rate::Rate;
pub use selector::Selector;
pub use taker::Taker;
