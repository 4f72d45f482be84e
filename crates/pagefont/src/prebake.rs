//! Cancellable background work
//!
//! Pre-baking resolves a configured character set off the render thread. The
//! executor is injected so hosts can run it on their own pool (or inline, in
//! tests). Completion is reported through a oneshot channel; a job that is
//! dropped without reporting (executor refused it, job panicked) counts as failed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Unit of work handed to a [`TaskExecutor`]
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks somewhere, usually on another thread
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Cooperative cancellation flag shared between a job and its [`TaskHandle`]
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a pre-bake job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrebakeOutcome {
    Completed { resolved: usize },
    Cancelled { resolved: usize },
    Failed(String),
}

impl PrebakeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Handle to a spawned job
pub struct TaskHandle {
    token: CancellationToken,
    receiver: oneshot::Receiver<PrebakeOutcome>,
    outcome: Option<PrebakeOutcome>,
}

impl TaskHandle {
    /// Ask the job to stop at its next checkpoint
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the job has reported an outcome (never blocks)
    pub fn is_finished(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                self.outcome = Some(dropped());
                true
            }
        }
    }

    /// Block until the job reports an outcome
    pub fn wait(&mut self) -> PrebakeOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = pollster::block_on(&mut self.receiver).unwrap_or_else(|_| dropped());
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.token.is_cancelled())
            .field("outcome", &self.outcome)
            .finish()
    }
}

fn dropped() -> PrebakeOutcome {
    PrebakeOutcome::Failed("task dropped before reporting".to_string())
}

/// Hand `job` to `executor` and return a handle to it
pub fn spawn_task<F>(executor: &dyn TaskExecutor, job: F) -> TaskHandle
where
    F: FnOnce(&CancellationToken) -> PrebakeOutcome + Send + 'static,
{
    let token = CancellationToken::new();
    let (sender, receiver) = oneshot::channel();
    let job_token = token.clone();
    executor.execute(Box::new(move || {
        let outcome = job(&job_token);
        let _ = sender.send(outcome);
    }));
    TaskHandle {
        token,
        receiver,
        outcome: None,
    }
}

/// One named OS thread per task
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl TaskExecutor for ThreadExecutor {
    fn execute(&self, task: Task) {
        if let Err(e) = std::thread::Builder::new()
            .name("pagefont-prebake".to_string())
            .spawn(task)
        {
            tracing::warn!("Failed to spawn pre-bake thread: {}", e);
        }
    }
}

/// Runs tasks on a tokio runtime's blocking pool
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running in, if any
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl TaskExecutor for TokioExecutor {
    fn execute(&self, task: Task) {
        drop(self.handle.spawn_blocking(task));
    }
}

/// Runs tasks immediately on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}
