use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
};

use futures::channel::{mpsc, oneshot};

use crate::{
    UnixTimestamp,
    io::{IoResult, IoTask, IoTaskError, IoTaskId},
};

use super::executor::LocalExecutor;

/// The shape of an actor whose logic runs as a single future inside a
/// [`Driver`].
pub(crate) trait Actor {
    type IoTaskAction: Debug;
    type IoResult: Debug + 'static;
    type StepResults;
    type Output: Debug;
    type Input: Debug;
    type Complete;
    /// Identifies which kind of result answers a task
    type IoKind: Debug + Copy + PartialEq;

    fn task_kind(task: &Self::IoTaskAction) -> Self::IoKind;
    fn result_kind(result: &Self::IoResult) -> Self::IoKind;

    fn finish_step(
        outputs: Vec<Self::Output>,
        new_io_tasks: Vec<IoTask<Self::IoTaskAction>>,
    ) -> Self::StepResults;
}

/// Runs an actor future, turning the I/O it awaits into [`IoTask`]s and
/// routing [`IoResult`]s back to the awaiting code.
pub(crate) struct Driver<A: Actor> {
    now: Arc<Mutex<UnixTimestamp>>,
    io_tasks: HashMap<IoTaskId, PendingIo<A>>,
    rx_output: mpsc::UnboundedReceiver<DriverOutput<A>>,
    tx_input: mpsc::UnboundedSender<A::Input>,
    executor: LocalExecutor<A::Complete>,
}

struct PendingIo<A: Actor> {
    kind: A::IoKind,
    reply: oneshot::Sender<A::IoResult>,
}

pub(crate) struct SpawnArgs<A: Actor> {
    pub(crate) now: Arc<Mutex<UnixTimestamp>>,
    pub(crate) io: ActorIo<A>,
    pub(crate) rx_input: mpsc::UnboundedReceiver<A::Input>,
}

pub(crate) enum DriverOutput<A: Actor> {
    Io {
        task: A::IoTaskAction,
        reply: oneshot::Sender<A::IoResult>,
    },
    Output(A::Output),
}

impl<A: Actor> std::fmt::Debug for DriverOutput<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverOutput::Io { task, reply: _ } => write!(f, "Io({task:?})"),
            DriverOutput::Output(output) => write!(f, "Output({output:?})"),
        }
    }
}

pub(crate) enum StepResult<A: Actor> {
    Suspend(A::StepResults),
    Complete {
        results: A::StepResults,
        complete: A::Complete,
    },
}

impl<A: Actor> Driver<A> {
    pub(crate) fn spawn<S, F>(now: UnixTimestamp, spawn: S) -> Self
    where
        S: FnOnce(SpawnArgs<A>) -> F,
        F: Future<Output = A::Complete> + Send + 'static,
    {
        let now = Arc::new(Mutex::new(now));
        let (tx_output, rx_output) = mpsc::unbounded();
        let (tx_input, rx_input) = mpsc::unbounded();
        let future = spawn(SpawnArgs {
            io: ActorIo { tx_output },
            rx_input,
            now: now.clone(),
        });
        Self {
            now,
            io_tasks: HashMap::new(),
            rx_output,
            tx_input,
            executor: LocalExecutor::spawn(future),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.executor.is_finished()
    }

    pub(crate) fn handle_input(&mut self, now: UnixTimestamp, input: A::Input) {
        *self.now.lock().unwrap() = now;
        if self.tx_input.unbounded_send(input).is_err() {
            tracing::debug!("actor input dropped as the actor has finished");
        }
    }

    pub(crate) fn handle_io_complete(
        &mut self,
        now: UnixTimestamp,
        result: IoResult<A::IoResult>,
    ) -> Result<(), IoTaskError> {
        *self.now.lock().unwrap() = now;
        let Some(pending) = self.io_tasks.remove(&result.task_id) else {
            return Err(IoTaskError::UnknownTask(result.task_id));
        };
        let result_kind = A::result_kind(&result.payload);
        if pending.kind != result_kind {
            let expected = format!("{:?}", pending.kind);
            self.io_tasks.insert(result.task_id, pending);
            return Err(IoTaskError::MismatchedResult {
                task_id: result.task_id,
                expected,
                found: format!("{result_kind:?}"),
            });
        }
        // A dropped receiver means the task was fire and forget
        let _ = pending.reply.send(result.payload);
        Ok(())
    }

    pub(crate) fn step(&mut self, now: UnixTimestamp) -> StepResult<A> {
        *self.now.lock().unwrap() = now;
        let future_result = self.executor.run_until_stalled();
        let mut outputs = Vec::new();
        let mut new_io_tasks = Vec::new();
        while let Ok(Some(out)) = self.rx_output.try_next() {
            match out {
                DriverOutput::Io { task, reply } => {
                    let task_id = IoTaskId::new();
                    let kind = A::task_kind(&task);
                    self.io_tasks.insert(task_id, PendingIo { kind, reply });
                    new_io_tasks.push(IoTask {
                        task_id,
                        action: task,
                    });
                }
                DriverOutput::Output(output) => outputs.push(output),
            }
        }
        let results = A::finish_step(outputs, new_io_tasks);
        match future_result {
            Some(complete) => StepResult::Complete { results, complete },
            None => StepResult::Suspend(results),
        }
    }
}

/// The handle actor code uses to request I/O and emit outputs
pub(crate) struct ActorIo<A: Actor> {
    tx_output: mpsc::UnboundedSender<DriverOutput<A>>,
}

impl<A: Actor> Clone for ActorIo<A> {
    fn clone(&self) -> Self {
        Self {
            tx_output: self.tx_output.clone(),
        }
    }
}

impl<A: Actor> ActorIo<A> {
    pub(crate) fn perform_io(
        &self,
        task: A::IoTaskAction,
    ) -> impl Future<Output = A::IoResult> + 'static {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx_output
            .unbounded_send(DriverOutput::Io { task, reply: tx });
        async move {
            match rx.await {
                Ok(result) => result,
                // The sender only goes away together with the driver, after
                // which this future is never polled again
                Err(_) => futures::future::pending().await,
            }
        }
    }

    /// Issue a task whose result nobody waits for. The task is still
    /// correlated by the driver, so completing it twice is still an error.
    pub(crate) fn fire_and_forget_io(&self, task: A::IoTaskAction) {
        let _ = self.tx_output.unbounded_send(DriverOutput::Io {
            task,
            reply: oneshot::channel().0,
        });
    }

    pub(crate) fn emit_event(&self, event: A::Output) {
        let _ = self.tx_output.unbounded_send(DriverOutput::Output(event));
    }
}
