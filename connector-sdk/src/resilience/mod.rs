//! Resilience patterns for service clients
//!
//! This module provides:
//! - Affine backoff schedules compatible with the `backoff` crate
//! - A bounded attempt loop with progressive per-attempt timeouts

mod retry;

pub use backoff::backoff::Backoff;
pub use retry::{Attempt, RetryExecutor, RetryExhausted, RetryPolicy, StepBackoff};
