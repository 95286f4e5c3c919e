//! Tournament graph: which feeder fills which slot, and how results flow
//! downstream through the feeds-into links.

pub mod propagate;
pub mod slots;

pub use propagate::{PendingBatch, force_propagate_all, merge_batch, propagate};
