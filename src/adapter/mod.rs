//! Ready-made visitors that transform a class on its way from a producer to a consumer.

mod compute_maxs;
pub mod descriptor;
mod instrument;
mod rename;

pub use compute_maxs::{compute_maxs, ComputeMaxs};
pub use instrument::MethodEntryHook;
pub use rename::ClassRenamer;
