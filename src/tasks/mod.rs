//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache.
//!
//! # Tasks
//! - Expiration sweeper: removes stale entries at a fixed interval

mod sweeper;

pub(crate) use sweeper::{Sweep, Sweeper};
