//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a shared cache.
//!
//! # Tasks
//! - Sweep: removes entries for deleted files and releases expired values

mod sweep;

pub use sweep::spawn_sweep_task;
