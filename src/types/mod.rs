//! Leaf types shared across the scheduler.
//!
//! - [`time`]: the [`Time`] timestamp used by both clock disciplines
//! - [`id`]: the [`StrandId`] identity token

pub mod id;
pub mod time;

pub use id::StrandId;
pub use time::Time;
