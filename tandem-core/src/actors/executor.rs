use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use futures::{
    FutureExt,
    task::{ArcWake, FutureObj, waker},
};

/// Drives exactly one future, on the calling thread, until it stalls.
///
/// Nothing here ever blocks: a future waiting on I/O is simply left pending
/// until the driver feeds it a result and polls again.
pub(crate) struct LocalExecutor<T> {
    running: Option<FutureObj<'static, T>>,
}

struct WokenFlag(AtomicBool);

impl ArcWake for WokenFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.store(true, Ordering::SeqCst);
    }
}

impl<T> LocalExecutor<T> {
    pub(crate) fn spawn<Fut: Future<Output = T> + Send + 'static>(fut: Fut) -> Self {
        Self {
            running: Some(FutureObj::new(Box::new(fut))),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.running.is_none()
    }

    /// Poll the future until it can't make progress.
    ///
    /// Returns the output the one time the future completes, and `None`
    /// both while it is pending and on any call after completion.
    pub(crate) fn run_until_stalled(&mut self) -> Option<T> {
        let flag = Arc::new(WokenFlag(AtomicBool::new(false)));
        let waker = waker(flag.clone());
        let mut cx = Context::from_waker(&waker);
        loop {
            let running = self.running.as_mut()?;
            match running.poll_unpin(&mut cx) {
                Poll::Ready(result) => {
                    self.running = None;
                    return Some(result);
                }
                // Futures such as FuturesUnordered wake themselves while
                // being polled, in which case there is more work to do now.
                Poll::Pending if flag.0.swap(false, Ordering::SeqCst) => continue,
                Poll::Pending => return None,
            }
        }
    }
}
