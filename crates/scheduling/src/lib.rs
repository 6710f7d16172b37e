//! Self-contained schedule entries for in-process task scheduling.
//!
//! Each [`ScheduleEntry`] knows whether "now" matches its configured
//! recurrence ([`ScheduleEntry::is_due`]) and how to execute its work once
//! per due occurrence ([`ScheduleEntry::invoke`]), with optional predicate
//! gating, overlap-prevention identity, and one-shot lifecycles. The polling
//! cadence, failure isolation, and overlap enforcement belong to the
//! surrounding driver, which talks to entries through the read-only query
//! surface and the [`Unscheduler`] callback.
//!
//! Split into submodules:
//! - [`cron`] — 5-field cron rules, parsed eagerly, matched zone-locally
//! - [`entry`] — due evaluation, the invoke pipeline, lifecycle
//! - [`builder`] — fluent configuration surface
//! - [`target`] — execution targets and the resolver/driver boundary traits
//! - [`error`] — error taxonomy

pub mod builder;
pub mod cron;
pub mod entry;
pub mod error;
pub mod target;

pub use builder::EntryBuilder;
pub use cron::CronRule;
pub use entry::{ScheduleEntry, TimeSpec};
pub use error::{Result, ScheduleError};
pub use target::{
    AsyncAction, CancellableJob, ExecutionTarget, Job, JobResolver, JobScope, Predicate,
    ResolvedJob, SyncAction, Unscheduler,
};
