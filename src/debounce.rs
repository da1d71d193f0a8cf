use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default delay between the last edit and classification
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// A result together with the input it was computed for
#[derive(Debug, Clone, PartialEq)]
pub struct Published<T> {
    pub input: String,
    pub value: T,
}

/// Debounced re-classification of a changing input.
///
/// Every edit restarts the delay. Only the value present when the delay
/// expires is classified, and a result is published only if no newer edit
/// arrived while it was being computed.
pub struct Debouncer<T> {
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    tx: Arc<watch::Sender<Option<Published<T>>>>,
}

impl<T> Debouncer<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            tx: Arc::new(tx),
        }
    }

    /// Receive published results; `None` means results were cleared
    pub fn subscribe(&self) -> watch::Receiver<Option<Published<T>>> {
        self.tx.subscribe()
    }

    /// Record a new input value, superseding any pending work
    pub fn schedule<F, Fut>(&mut self, input: impl Into<String>, task: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let input = input.into().trim().to_string();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_pending();

        if input.is_empty() {
            self.tx.send_replace(None);
            return;
        }

        let delay = self.delay;
        let current = Arc::clone(&self.generation);
        let tx = Arc::clone(&self.tx);

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let value = task(input.clone()).await;

            // An abort can arrive after the task finished its await
            if current.load(Ordering::SeqCst) == generation {
                tx.send_replace(Some(Published { input, value }));
            } else {
                debug!("Discarding superseded result for {:?}", input);
            }
        }));
    }

    /// Drop pending work without publishing anything
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_pending();
    }

    /// Wait for the pending task, if any, to finish
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending.take() {
            // A cancelled task is not an error here
            let _ = handle.await;
        }
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const DELAY: Duration = Duration::from_millis(30);

    #[tokio::test]
    async fn test_only_last_input_is_classified() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(DELAY);
        let rx = debouncer.subscribe();

        for input in ["a", "ar", "ark", "ark:"] {
            let calls = Arc::clone(&calls);
            debouncer.schedule(input, move |text| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                text.len()
            });
        }
        debouncer.settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let published = rx.borrow().clone().unwrap();
        assert_eq!(published.input, "ark:");
        assert_eq!(published.value, 4);
    }

    #[tokio::test]
    async fn test_slow_result_is_discarded_when_superseded() {
        let mut debouncer = Debouncer::new(Duration::from_millis(5));
        let rx = debouncer.subscribe();

        debouncer.schedule("first", |text| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            text
        });
        // Let the first task get past its delay and into the slow call
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.schedule("second", |text| async move { text });
        debouncer.settle().await;

        assert_eq!(rx.borrow().as_ref().unwrap().value, "second");
    }

    #[tokio::test]
    async fn test_empty_input_clears_results() {
        let mut debouncer = Debouncer::new(DELAY);
        let rx = debouncer.subscribe();

        debouncer.schedule("doi:10.1000/1", |text| async move { text });
        debouncer.settle().await;
        assert!(rx.borrow().is_some());

        debouncer.schedule("   ", |text| async move { text });
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_cancel_publishes_nothing() {
        let mut debouncer = Debouncer::new(DELAY);
        let rx = debouncer.subscribe();

        debouncer.schedule("ark:/13030/tf5p30086k", |text| async move { text });
        debouncer.cancel();
        debouncer.settle().await;
        tokio::time::sleep(DELAY * 2).await;

        assert!(rx.borrow().is_none());
    }
}
