//! Progress values and the cancellable progress stream

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::ModelError;

/// Fraction of an operation completed, in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Progress {
    pub fraction: f32,
}

impl Progress {
    pub const DONE: Progress = Progress { fraction: 1.0 };

    pub fn new(fraction: f32) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Whether the operation has completed
    pub fn is_done(&self) -> bool {
        self.fraction == 1.0
    }

    pub fn percent(&self) -> f32 {
        self.fraction * 100.0
    }
}

/// Throttles per-file progress: a value is reported only once it has grown
/// by at least one percentage point, or when it reaches exactly 1.0.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    last_percent: f32,
}

impl ProgressThrottle {
    pub(crate) fn new() -> Self {
        Self { last_percent: -1.0 }
    }

    pub(crate) fn offer(&mut self, fraction: f32) -> Option<Progress> {
        let percent = fraction * 100.0;
        let finished = fraction == 1.0 && self.last_percent < 100.0;
        if percent - self.last_percent >= 1.0 || finished {
            let report = percent.max(self.last_percent);
            self.last_percent = report;
            Some(Progress::new(report / 100.0))
        } else {
            None
        }
    }
}

/// Unweighted mean over a fixed number of independently progressing legs
#[derive(Debug)]
pub(crate) struct LegProgress {
    fractions: Vec<f32>,
    last: f32,
}

impl LegProgress {
    pub(crate) fn new(legs: usize) -> Self {
        Self {
            fractions: vec![0.0; legs],
            last: -1.0,
        }
    }

    /// Record progress of one leg; returns the combined value if it grew
    pub(crate) fn update(&mut self, leg: usize, progress: Progress) -> Option<Progress> {
        let slot = self.fractions.get_mut(leg)?;
        *slot = slot.max(progress.fraction);

        let mean = self.fractions.iter().sum::<f32>() / self.fractions.len() as f32;
        if mean > self.last {
            self.last = mean;
            Some(Progress::new(mean))
        } else {
            None
        }
    }
}

/// Sending half handed to the worker of a [`ProgressStream`]
#[derive(Debug, Clone)]
pub(crate) struct ProgressSink {
    tx: mpsc::UnboundedSender<Result<Progress, ModelError>>,
}

impl ProgressSink {
    pub(crate) fn send(&self, progress: Progress) {
        // The receiver only goes away together with the worker.
        let _ = self.tx.send(Ok(progress));
    }
}

/// Stream of progress updates for one download operation.
///
/// The stream ends after `Progress(1.0)` on success, or with a single `Err`
/// item on failure. Dropping it aborts the underlying work, including any
/// in-flight request or backoff sleep.
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<Result<Progress, ModelError>>,
    task: JoinHandle<()>,
    finished: bool,
}

impl ProgressStream {
    /// Run `work` on a new task, forwarding what it reports
    pub(crate) fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(ProgressSink) -> Fut,
        Fut: Future<Output = Result<(), ModelError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ProgressSink { tx: tx.clone() };
        let work = work(sink);

        let task = tokio::spawn(async move {
            if let Err(err) = work.await {
                let _ = tx.send(Err(err));
            }
        });

        Self {
            rx,
            task,
            finished: false,
        }
    }

    /// Drive the stream to the end and return the last reported progress
    pub async fn wait(mut self) -> Result<Progress, ModelError> {
        use futures::StreamExt;

        let mut last = Progress::new(0.0);
        while let Some(item) = self.next().await {
            last = item?;
        }
        Ok(last)
    }
}

impl Stream for ProgressStream {
    type Item = Result<Progress, ModelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
            Poll::Pending => return Poll::Pending,
            Poll::Ready(None) => {}
        }

        // Channel closed: surface a panicked or aborted worker as an error
        // instead of a silent end.
        let joined = match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(joined) => joined,
            Poll::Pending => return Poll::Pending,
        };
        self.finished = true;

        match joined {
            Ok(()) => Poll::Ready(None),
            Err(err) => {
                warn!("Download task ended abnormally: {}", err);
                Poll::Ready(Some(Err(ModelError::Aborted(err.to_string()))))
            }
        }
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Lock that ignores poisoning; progress state stays usable after a panic
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_progress_clamped() {
        assert_eq!(Progress::new(1.5), Progress::DONE);
        assert_eq!(Progress::new(-0.1).fraction, 0.0);
        assert!(Progress::DONE.is_done());
        assert!(!Progress::new(0.99).is_done());
    }

    #[test]
    fn test_throttle_requires_one_percent() {
        let mut throttle = ProgressThrottle::new();
        assert_eq!(throttle.offer(0.0), Some(Progress::new(0.0)));
        assert_eq!(throttle.offer(0.005), None);
        assert!(throttle.offer(0.011).is_some());
        assert_eq!(throttle.offer(0.015), None);
    }

    #[test]
    fn test_throttle_never_goes_backwards() {
        let mut throttle = ProgressThrottle::new();
        throttle.offer(0.5);
        assert_eq!(throttle.offer(0.3), None);
        assert_eq!(throttle.offer(0.505), None);
        let next = throttle.offer(0.52).unwrap();
        assert!(next.fraction > 0.5);
    }

    #[test]
    fn test_throttle_always_reports_completion_once() {
        let mut throttle = ProgressThrottle::new();
        throttle.offer(0.995);
        assert_eq!(throttle.offer(1.0), Some(Progress::DONE));
        assert_eq!(throttle.offer(1.0), None);
    }

    #[test]
    fn test_leg_progress_unweighted_mean() {
        let mut legs = LegProgress::new(4);
        assert_eq!(legs.update(0, Progress::DONE), Some(Progress::new(0.25)));
        assert_eq!(legs.update(1, Progress::new(0.5)), Some(Progress::new(0.375)));
        // a leg reporting less than before does not pull the mean down
        assert_eq!(legs.update(1, Progress::new(0.2)), None);
        legs.update(1, Progress::DONE);
        legs.update(2, Progress::DONE);
        assert_eq!(legs.update(3, Progress::DONE), Some(Progress::DONE));
        assert_eq!(legs.update(5, Progress::DONE), None);
    }

    #[tokio::test]
    async fn test_stream_forwards_progress_then_ends() {
        let stream = ProgressStream::spawn(|sink| async move {
            sink.send(Progress::new(0.5));
            sink.send(Progress::DONE);
            Ok(())
        });
        let items: Vec<_> = stream.map(|p| p.unwrap().fraction).collect().await;
        assert_eq!(items, vec![0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_stream_error_is_last_item() {
        let stream = ProgressStream::spawn(|sink| async move {
            sink.send(Progress::new(0.1));
            Err(ModelError::UnknownVariant("x".to_string()))
        });
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ModelError::UnknownVariant(_))));
    }

    #[tokio::test]
    async fn test_stream_reports_panicked_worker() {
        let stream = ProgressStream::spawn(|_sink| async move {
            if true {
                panic!("worker blew up");
            }
            Ok(())
        });
        let result = stream.wait().await;
        assert!(matches!(result, Err(ModelError::Aborted(_))));
    }
}
