//! Core of the heat-event outage workflow: weather window detection, building-model schedule rewriting,
//! batch bookkeeping and result aggregation.
//!
//! Nothing in here reads environment variables or global configuration. Every path and setting is passed in
//! by the caller, usually the `ubem` binary after it resolved its configuration.

#[macro_use]
extern crate tracing;

pub mod batch;
mod calendar;
pub mod idf;
pub mod results;
pub mod schedule;
pub mod weather;

pub use batch::{
    BatchItem,
    BatchReport,
    Outcome,
};
pub use calendar::{
    CalendarDate,
    InvalidDate,
};
