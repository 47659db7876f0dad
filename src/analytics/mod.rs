pub mod manager;
pub mod sink;

pub use manager::VisitManager;
pub use sink::{VisitDelta, VisitSink};
