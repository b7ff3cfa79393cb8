//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Overdue purge: removes expired cache entries at a configured interval

mod purge;

pub use purge::spawn_purge_task;
