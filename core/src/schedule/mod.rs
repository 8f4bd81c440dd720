//! Rewrites HVAC availability schedules of building models to simulate outages.

mod batch;
mod compact;
mod mutation;
mod mutator;
mod outage;

pub use batch::BatchScheduleMutator;
pub use compact::{
    effective_availability,
    outage_schedule,
};
pub use mutation::{
    MutationOptions,
    MutationSummary,
    ScheduleMutation,
    VersionChange,
};
pub use mutator::ScheduleMutator;
pub use outage::{
    OutageAction,
    OutagePeriod,
};

use crate::{
    idf::IdfError,
    CalendarDate,
};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Model(#[from] IdfError),

    #[error("No schedule can be attached: {reason}")]
    ScheduleNotFound { reason: String },

    #[error("Outage period {start} - {end} is not a valid date range")]
    InvalidDateRange { start: CalendarDate, end: CalendarDate },

    #[error("Failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
