//! Execution targets and the boundary traits a host driver supplies:
//! job resolution (scoped factory) and unscheduling (registry callback).

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::ScheduleError;

/// Synchronous inline action.
pub type SyncAction = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous inline action.
pub type AsyncAction = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Async boolean gate evaluated before target dispatch. A false result is a
/// normal skip, not an error.
pub type Predicate = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// A unit of schedulable work produced by a [`JobResolver`].
#[async_trait]
pub trait Job: Send {
    async fn run(&mut self) -> anyhow::Result<()>;
}

/// A job that cooperates with cancellation. The active token is injected
/// before [`Job::run`] is called; observing it is the job's responsibility.
pub trait CancellableJob: Job {
    fn set_cancel_token(&mut self, token: CancellationToken);
}

/// Resolver output. The variant is the single dispatch point deciding
/// whether the cancellation token is forwarded into the job.
pub enum ResolvedJob {
    Plain(Box<dyn Job>),
    Cancellable(Box<dyn CancellableJob>),
}

impl ResolvedJob {
    pub(crate) async fn run(self, token: CancellationToken) -> anyhow::Result<()> {
        match self {
            ResolvedJob::Plain(mut job) => job.run().await,
            ResolvedJob::Cancellable(mut job) => {
                job.set_cancel_token(token);
                job.run().await
            }
        }
    }
}

/// Factory boundary supplied by the host application. The core depends only
/// on this narrow interface, not on a full dependency container.
pub trait JobResolver: Send + Sync {
    /// Open a short-lived resolution scope for a single invocation.
    fn create_scope(&self) -> Box<dyn JobScope>;
}

/// A short-lived resolution context. Dropped unconditionally after the
/// invocation completes or fails; release logic belongs in `Drop`.
pub trait JobScope: Send {
    /// Produce a job instance for `tag`, using the constructor arguments
    /// bound at configuration time if any.
    fn resolve(
        &mut self,
        tag: &str,
        args: Option<&serde_json::Value>,
    ) -> Result<ResolvedJob, ScheduleError>;
}

/// Driver capability the entry calls back into when a one-shot entry
/// retires. Handed to the entry at construction.
pub trait Unscheduler: Send + Sync {
    /// Remove the entry with `id` from the driver's registry. Must be
    /// idempotent and safe to call while the entry is mid-invocation.
    fn try_unschedule(&self, id: &str);
}

/// What an entry runs when it comes due.
pub enum ExecutionTarget {
    /// Inline synchronous closure, invoked directly.
    Sync(SyncAction),
    /// Inline asynchronous closure, invoked directly.
    Async(AsyncAction),
    /// A job resolved through the host's factory at each invocation.
    Resolved {
        tag: String,
        args: Option<serde_json::Value>,
        resolver: Arc<dyn JobResolver>,
    },
}

impl std::fmt::Debug for ExecutionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionTarget::Sync(_) => f.write_str("Sync"),
            ExecutionTarget::Async(_) => f.write_str("Async"),
            ExecutionTarget::Resolved { tag, .. } => write!(f, "Resolved({tag})"),
        }
    }
}
