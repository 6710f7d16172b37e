//! Schedule entry runtime: due evaluation, the invoke pipeline, and the
//! lifecycle/overlap facts a driver polls.
//!
//! Entries are passive. The surrounding driver owns all cadence: it decides
//! when to call [`ScheduleEntry::is_due`], serializes invocations that share
//! an overlap key, and honors unschedule requests issued by one-shot entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use crate::cron::CronRule;
use crate::error::ScheduleError;
use crate::target::{ExecutionTarget, Predicate, Unscheduler};

/// Recurrence rule: a cron base plus an optional sub-minute interval.
///
/// Installing an interval keeps a permissive `* * * * *` cron base so that
/// appended weekday restrictions still participate in due evaluation.
#[derive(Debug, Clone)]
pub struct TimeSpec {
    pub(crate) cron: CronRule,
    /// Weekdays appended by the fluent selectors. A union: the entry is due
    /// on any listed day. Empty means no restriction beyond the cron field.
    pub(crate) restricted_days: Vec<Weekday>,
    /// Sub-minute period in whole seconds (1..=59).
    pub(crate) interval_secs: Option<u32>,
}

impl TimeSpec {
    pub(crate) fn every_minute() -> TimeSpec {
        TimeSpec {
            cron: CronRule::unrestricted(),
            restricted_days: Vec::new(),
            interval_secs: None,
        }
    }

    pub(crate) fn restrict_day(&mut self, day: Weekday) {
        if !self.restricted_days.contains(&day) {
            self.restricted_days.push(day);
        }
    }

    fn is_due(&self, local: &DateTime<Tz>) -> bool {
        let day = local.weekday();
        let weekday_due = self.cron.weekday_matches(day)
            && (self.restricted_days.is_empty() || self.restricted_days.contains(&day));

        match self.interval_secs {
            Some(period) => seconds_due(local.second(), period) && weekday_due,
            None => weekday_due && self.cron.matches(&local.naive_local()),
        }
    }
}

/// Sub-minute due check. The top of every minute always matches, so periods
/// that do not divide 60 evenly still fire consistently at each minute
/// boundary; other seconds match on exact multiples of the period.
fn seconds_due(second: u32, period: u32) -> bool {
    if second == 0 {
        true
    } else {
        period != 0 && second % period == 0
    }
}

/// A self-contained schedule entry: knows whether "now" matches its
/// recurrence and how to execute its work exactly once per due occurrence.
///
/// Built via [`EntryBuilder`](crate::builder::EntryBuilder); this type is
/// the runtime view the driver holds.
pub struct ScheduleEntry {
    pub(crate) id: String,
    pub(crate) spec: TimeSpec,
    pub(crate) zone: Tz,
    pub(crate) target: ExecutionTarget,
    pub(crate) predicate: Option<Predicate>,
    pub(crate) prevent_overlapping: bool,
    pub(crate) run_once: bool,
    pub(crate) run_once_at_start: bool,
    pub(crate) has_run: AtomicBool,
    pub(crate) unscheduler: Option<Arc<dyn Unscheduler>>,
}

impl ScheduleEntry {
    /// Whether this entry's recurrence matches `now_utc`, evaluated in the
    /// entry's configured zone. Pure and non-blocking; safe from any thread.
    pub fn is_due(&self, now_utc: DateTime<Utc>) -> bool {
        let local = now_utc.with_timezone(&self.zone);
        self.spec.is_due(&local)
    }

    /// Execute one due occurrence: predicate gate, then target dispatch,
    /// then the lifecycle transition.
    ///
    /// A false predicate skips dispatch but still runs the lifecycle
    /// transition, so a one-shot entry counts the skip as its one permitted
    /// execution. Any error propagates to the driver uncaught and leaves the
    /// lifecycle untouched: a failed one-shot entry stays schedulable and is
    /// retried on its next due tick.
    pub async fn invoke(&self, cancel: CancellationToken) -> Result<(), ScheduleError> {
        if let Some(predicate) = &self.predicate {
            if !predicate().await {
                tracing::debug!(entry_id = %self.id, "predicate gate is closed, skipping dispatch");
                self.complete_lifecycle();
                return Ok(());
            }
        }

        match &self.target {
            ExecutionTarget::Sync(action) => action()?,
            ExecutionTarget::Async(action) => action().await?,
            ExecutionTarget::Resolved {
                tag,
                args,
                resolver,
            } => {
                tracing::debug!(entry_id = %self.id, tag = %tag, "resolving scheduled job");
                // The scope drops when this arm exits, resolution or run
                // failure included.
                let mut scope = resolver.create_scope();
                let job = scope.resolve(tag, args.as_ref())?;
                job.run(cancel).await?;
            }
        }

        self.complete_lifecycle();
        Ok(())
    }

    /// Marks the first completed invocation and, for one-shot entries,
    /// issues a single unschedule request. The false→true transition happens
    /// exactly once and never resets.
    fn complete_lifecycle(&self) {
        let first = !self.has_run.swap(true, Ordering::SeqCst);
        if first && self.run_once {
            tracing::info!(entry_id = %self.id, "one-shot entry retiring");
            if let Some(unscheduler) = &self.unscheduler {
                unscheduler.try_unschedule(&self.id);
            }
        }
    }

    /// Stable identity; doubles as the overlap-prevention key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the driver must serialize invocations sharing this entry's
    /// overlap key. Enforcement is entirely the driver's.
    pub fn should_prevent_overlapping(&self) -> bool {
        self.prevent_overlapping
    }

    /// Key under which overlapping invocations are serialized. Defaults to a
    /// generated unique token, so unrelated entries never collide.
    pub fn overlap_key(&self) -> &str {
        &self.id
    }

    /// True for pure cron recurrence (minute granularity). Drivers typically
    /// evaluate cron-based entries only at the top of each minute and
    /// interval-based entries every second.
    pub fn is_cron_based(&self) -> bool {
        self.spec.interval_secs.is_none()
    }

    /// Hint the driver reads once, before regular polling begins, to run
    /// the entry immediately regardless of due-ness.
    pub fn should_run_once_at_start(&self) -> bool {
        self.run_once_at_start
    }

    /// Tag of the resolved job target, if this entry uses one.
    pub fn job_tag(&self) -> Option<&str> {
        match &self.target {
            ExecutionTarget::Resolved { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Whether at least one invocation (or predicate skip) has completed.
    pub fn has_run_at_least_once(&self) -> bool {
        self.has_run.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ScheduleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleEntry")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .field("zone", &self.zone)
            .field("target", &self.target)
            .field("prevent_overlapping", &self.prevent_overlapping)
            .field("run_once", &self.run_once)
            .field("run_once_at_start", &self.run_once_at_start)
            .field("has_run", &self.has_run.load(Ordering::SeqCst))
            .finish()
    }
}
