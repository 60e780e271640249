//! Part planning and the shared part table.
//!
//! Splits a download into fixed-size parts, orders them for scheduling
//! (tail-first rotation and optional seek bias), and keeps per-part progress
//! in an arena that workers update without per-part locks.

mod part;
mod plan;
mod table;

pub use part::{Part, PartStatus};
pub use plan::{plan_parts, SchedulePolicy};
pub use table::{PartSlot, PartTable};
