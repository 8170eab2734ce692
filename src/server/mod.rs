//! The embedded HTTP servers backing the workload process:
//! the latency-controllable sleep server the network task calls into,
//! and the diagnostics server profiling tools attach to.

pub mod diag;
mod sleep;

pub use self::sleep::{SleepServer, SleepService};
