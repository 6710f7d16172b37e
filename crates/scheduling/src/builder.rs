//! Fluent configuration surface for schedule entries.
//!
//! [`EntryBuilder`] is the configuration-time view: owned, consumed and
//! returned by every call. [`build`](EntryBuilder::build) produces the
//! runtime [`ScheduleEntry`] the driver polls, so runtime-only operations
//! cannot be reached mid-configuration.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Weekday;
use chrono_tz::Tz;
use futures_util::FutureExt;
use uuid::Uuid;

use crate::cron::CronRule;
use crate::entry::{ScheduleEntry, TimeSpec};
use crate::error::ScheduleError;
use crate::target::{ExecutionTarget, JobResolver, Predicate, Unscheduler};

/// Builder for a [`ScheduleEntry`]. Created by one of the target-selecting
/// constructors ([`call`](Self::call), [`call_async`](Self::call_async),
/// [`job`](Self::job)); defaults to every minute, UTC, and a generated
/// unique identifier.
pub struct EntryBuilder {
    id: String,
    spec: TimeSpec,
    zone: Tz,
    target: ExecutionTarget,
    predicate: Option<Predicate>,
    prevent_overlapping: bool,
    run_once: bool,
    run_once_at_start: bool,
    unscheduler: Option<Arc<dyn Unscheduler>>,
}

impl EntryBuilder {
    fn new(target: ExecutionTarget) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            spec: TimeSpec::every_minute(),
            zone: chrono_tz::UTC,
            target,
            predicate: None,
            prevent_overlapping: false,
            run_once: false,
            run_once_at_start: false,
            unscheduler: None,
        }
    }

    /// Schedule an inline synchronous action.
    pub fn call<F>(action: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(ExecutionTarget::Sync(Arc::new(action)))
    }

    /// Schedule an inline asynchronous action.
    pub fn call_async<F, Fut>(action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(ExecutionTarget::Async(Arc::new(move || {
            action().boxed()
        })))
    }

    /// Schedule a job resolved through `resolver` at each invocation,
    /// identified by `tag`.
    pub fn job(tag: impl Into<String>, resolver: Arc<dyn JobResolver>) -> Self {
        Self::new(ExecutionTarget::Resolved {
            tag: tag.into(),
            args: None,
            resolver,
        })
    }

    /// Bind constructor arguments handed to the resolver. Only meaningful
    /// for [`job`](Self::job) targets; ignored otherwise.
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        if let ExecutionTarget::Resolved { args: slot, .. } = &mut self.target {
            *slot = Some(args);
        }
        self
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Recurrence
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn with_rule(mut self, rule: CronRule) -> Self {
        self.spec.cron = rule;
        self.spec.interval_secs = None;
        self
    }

    fn with_interval(mut self, secs: u32) -> Self {
        self.spec.cron = CronRule::unrestricted();
        self.spec.interval_secs = Some(secs);
        self
    }

    /// `* * * * *`
    pub fn every_minute(self) -> Self {
        self.with_rule(CronRule::unrestricted())
    }

    /// `*/5 * * * *`
    pub fn every_five_minutes(self) -> Self {
        self.with_rule(CronRule::every_n_minutes(5))
    }

    /// `*/10 * * * *`
    pub fn every_ten_minutes(self) -> Self {
        self.with_rule(CronRule::every_n_minutes(10))
    }

    /// `*/15 * * * *`
    pub fn every_fifteen_minutes(self) -> Self {
        self.with_rule(CronRule::every_n_minutes(15))
    }

    /// `*/30 * * * *`
    pub fn every_thirty_minutes(self) -> Self {
        self.with_rule(CronRule::every_n_minutes(30))
    }

    /// `0 * * * *`
    pub fn hourly(self) -> Self {
        self.with_rule(CronRule::hourly_at(0))
    }

    /// `m * * * *`
    pub fn hourly_at(self, minute: u32) -> Self {
        self.with_rule(CronRule::hourly_at(minute))
    }

    /// `0 0 * * *`
    pub fn daily(self) -> Self {
        self.with_rule(CronRule::daily_at(0, 0))
    }

    /// `0 h * * *`
    pub fn daily_at_hour(self, hour: u32) -> Self {
        self.with_rule(CronRule::daily_at(hour, 0))
    }

    /// `m h * * *`
    pub fn daily_at(self, hour: u32, minute: u32) -> Self {
        self.with_rule(CronRule::daily_at(hour, minute))
    }

    /// `0 0 * * 1` — Monday midnight.
    pub fn weekly(self) -> Self {
        self.with_rule(CronRule::weekly())
    }

    /// `0 0 1 * *` — first of the month, midnight.
    pub fn monthly(self) -> Self {
        self.with_rule(CronRule::monthly())
    }

    /// Arbitrary 5-field cron expression. The only fallible textual surface:
    /// a malformed expression is rejected here, never during a tick.
    pub fn cron(self, expr: &str) -> Result<Self, ScheduleError> {
        let rule = CronRule::parse(expr)?;
        Ok(self.with_rule(rule))
    }

    /// Sub-minute interval of 1 second.
    pub fn every_second(self) -> Self {
        self.with_interval(1)
    }

    /// Sub-minute interval of 5 seconds.
    pub fn every_five_seconds(self) -> Self {
        self.with_interval(5)
    }

    /// Sub-minute interval of 10 seconds.
    pub fn every_ten_seconds(self) -> Self {
        self.with_interval(10)
    }

    /// Sub-minute interval of 15 seconds.
    pub fn every_fifteen_seconds(self) -> Self {
        self.with_interval(15)
    }

    /// Sub-minute interval of 30 seconds.
    pub fn every_thirty_seconds(self) -> Self {
        self.with_interval(30)
    }

    /// Arbitrary sub-minute interval, validated to 1..=59 seconds.
    pub fn every_seconds(self, secs: u32) -> Result<Self, ScheduleError> {
        if secs == 0 || secs >= 60 {
            return Err(ScheduleError::InvalidInterval(secs));
        }
        Ok(self.with_interval(secs))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Weekday restriction (union-append; survives recurrence changes)
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn restrict(mut self, day: Weekday) -> Self {
        self.spec.restrict_day(day);
        self
    }

    pub fn monday(self) -> Self {
        self.restrict(Weekday::Mon)
    }

    pub fn tuesday(self) -> Self {
        self.restrict(Weekday::Tue)
    }

    pub fn wednesday(self) -> Self {
        self.restrict(Weekday::Wed)
    }

    pub fn thursday(self) -> Self {
        self.restrict(Weekday::Thu)
    }

    pub fn friday(self) -> Self {
        self.restrict(Weekday::Fri)
    }

    pub fn saturday(self) -> Self {
        self.restrict(Weekday::Sat)
    }

    pub fn sunday(self) -> Self {
        self.restrict(Weekday::Sun)
    }

    /// Monday through Friday.
    pub fn weekdays(self) -> Self {
        self.monday().tuesday().wednesday().thursday().friday()
    }

    /// Saturday and Sunday.
    pub fn weekends(self) -> Self {
        self.saturday().sunday()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Modifiers
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Evaluate due-ness in `zone` instead of UTC.
    pub fn zoned(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    /// Install an async gating predicate. When it resolves false the
    /// invocation skips target dispatch but still advances the lifecycle.
    pub fn when<F, Fut>(mut self, predicate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.predicate = Some(Arc::new(move || predicate().boxed()));
        self
    }

    /// Require the driver to serialize invocations sharing `key`.
    pub fn prevent_overlapping(mut self, key: impl Into<String>) -> Self {
        self.id = key.into();
        self.prevent_overlapping = true;
        self
    }

    /// Set the entry's identifier without enabling overlap prevention.
    pub fn assign_identifier(mut self, key: impl Into<String>) -> Self {
        self.id = key.into();
        self
    }

    /// Ask the driver to run this entry immediately at startup, before
    /// regular due-polling begins.
    pub fn run_once_at_start(mut self) -> Self {
        self.run_once_at_start = true;
        self
    }

    /// Retire the entry after its first completed invocation.
    pub fn once(mut self) -> Self {
        self.run_once = true;
        self
    }

    /// Hand the entry the driver callback it uses to retire itself.
    pub fn unschedule_with(mut self, unscheduler: Arc<dyn Unscheduler>) -> Self {
        self.unscheduler = Some(unscheduler);
        self
    }

    /// Finish configuration, yielding the runtime entry.
    pub fn build(self) -> ScheduleEntry {
        ScheduleEntry {
            id: self.id,
            spec: self.spec,
            zone: self.zone,
            target: self.target,
            predicate: self.predicate,
            prevent_overlapping: self.prevent_overlapping,
            run_once: self.run_once,
            run_once_at_start: self.run_once_at_start,
            has_run: AtomicBool::new(false),
            unscheduler: self.unscheduler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    #[test]
    fn default_identifiers_are_unique() {
        let a = EntryBuilder::call(|| Ok(())).build();
        let b = EntryBuilder::call(|| Ok(())).build();
        assert_ne!(a.overlap_key(), b.overlap_key());
        assert!(!a.should_prevent_overlapping());
    }

    #[test]
    fn prevent_overlapping_shares_keys() {
        let a = EntryBuilder::call(|| Ok(())).prevent_overlapping("sync").build();
        let b = EntryBuilder::call(|| Ok(())).prevent_overlapping("sync").build();
        assert_eq!(a.overlap_key(), b.overlap_key());
        assert!(a.should_prevent_overlapping());
        assert!(b.should_prevent_overlapping());
    }

    #[test]
    fn assign_identifier_does_not_enable_overlap() {
        let entry = EntryBuilder::call(|| Ok(())).assign_identifier("named").build();
        assert_eq!(entry.id(), "named");
        assert!(!entry.should_prevent_overlapping());
    }

    #[test]
    fn invalid_cron_is_rejected_at_configuration() {
        assert!(EntryBuilder::call(|| Ok(())).cron("not a cron").is_err());
        assert!(EntryBuilder::call(|| Ok(())).cron("* * * *").is_err());
    }

    #[test]
    fn interval_is_validated_at_configuration() {
        assert!(matches!(
            EntryBuilder::call(|| Ok(())).every_seconds(0),
            Err(ScheduleError::InvalidInterval(0))
        ));
        assert!(matches!(
            EntryBuilder::call(|| Ok(())).every_seconds(60),
            Err(ScheduleError::InvalidInterval(60))
        ));
        assert!(EntryBuilder::call(|| Ok(())).every_seconds(59).is_ok());
    }

    #[test]
    fn interval_entries_are_not_cron_based() {
        let interval = EntryBuilder::call(|| Ok(())).every_five_seconds().build();
        assert!(!interval.is_cron_based());

        let cron = EntryBuilder::call(|| Ok(())).hourly().build();
        assert!(cron.is_cron_based());
    }

    #[test]
    fn weekday_restriction_survives_recurrence_change() {
        // Restriction appended before the recurrence selector still applies.
        let entry = EntryBuilder::call(|| Ok(()))
            .monday()
            .every_ten_seconds()
            .build();
        // June 17 2024 = Monday, June 18 = Tuesday.
        assert!(entry.is_due(Utc.with_ymd_and_hms(2024, 6, 17, 9, 0, 10).unwrap()));
        assert!(!entry.is_due(Utc.with_ymd_and_hms(2024, 6, 18, 9, 0, 10).unwrap()));
    }

    #[test]
    fn hourly_at_and_daily_at_place_fields() {
        let hourly = EntryBuilder::call(|| Ok(())).hourly_at(15).build();
        assert!(hourly.is_due(Utc.with_ymd_and_hms(2024, 6, 15, 7, 15, 0).unwrap()));
        assert!(!hourly.is_due(Utc.with_ymd_and_hms(2024, 6, 15, 7, 16, 0).unwrap()));

        let daily = EntryBuilder::call(|| Ok(())).daily_at(13, 30).build();
        assert!(daily.is_due(Utc.with_ymd_and_hms(2024, 6, 15, 13, 30, 0).unwrap()));
        assert!(!daily.is_due(Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap()));
    }

    #[test]
    fn weekly_and_monthly_shorthands() {
        // June 17 2024 = Monday; July 1 2024 = first of month.
        let weekly = EntryBuilder::call(|| Ok(())).weekly().build();
        assert!(weekly.is_due(Utc.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap()));
        assert!(!weekly.is_due(Utc.with_ymd_and_hms(2024, 6, 18, 0, 0, 0).unwrap()));

        let monthly = EntryBuilder::call(|| Ok(())).monthly().build();
        assert!(monthly.is_due(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()));
        assert!(!monthly.is_due(Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn run_once_at_start_is_a_readable_hint() {
        let entry = EntryBuilder::call(|| Ok(())).run_once_at_start().build();
        assert!(entry.should_run_once_at_start());
        assert!(!EntryBuilder::call(|| Ok(())).build().should_run_once_at_start());
    }
}
