use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::record::RecordRow;
use crate::remote::{RecordService, ServiceFailure};

/// One push of a wired data source. Data and error are exclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Data(Vec<RecordRow>),
    Error(ServiceFailure),
}

impl From<Result<Vec<RecordRow>, ServiceFailure>> for Delivery {
    fn from(result: Result<Vec<RecordRow>, ServiceFailure>) -> Self {
        match result {
            Ok(rows) => Delivery::Data(rows),
            Err(failure) => Delivery::Error(failure),
        }
    }
}

/// Keyed subscription to the opportunities of an account.
///
/// The callback runs on the runtime whenever the key changes to a new
/// account or `refresh` is called. A delivery whose key went stale while the
/// request was in flight is dropped and the current key is fetched instead.
/// Once unsubscribed (or dropped) the callback is never called again.
pub struct Subscription {
    key: watch::Sender<(Option<String>, u64)>,
    active: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn wire<F>(
        runtime: &Handle,
        service: Arc<dyn RecordService>,
        key: Option<String>,
        callback: F,
    ) -> Self
    where
        F: Fn(Delivery) + Send + Sync + 'static,
    {
        let (tx, mut rx) = watch::channel((key, 0u64));
        let active = Arc::new(Mutex::new(true));
        let flag = Arc::clone(&active);

        let task = runtime.spawn(async move {
            loop {
                let current = rx.borrow_and_update().0.clone();
                if let Some(account_id) = current {
                    debug!("Fetching opportunities for {account_id}");
                    let delivery = Delivery::from(service.get_opportunities(&account_id).await);
                    // Held while the callback runs, so cancel waits for it
                    let active = flag.lock().unwrap_or_else(PoisonError::into_inner);
                    if !*active {
                        break;
                    }
                    match rx.has_changed() {
                        Ok(true) => {
                            trace!("Dropping stale delivery for {account_id}");
                            continue;
                        }
                        Ok(false) => callback(delivery),
                        Err(_) => break,
                    }
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            key: tx,
            active,
            task,
        }
    }

    pub fn key(&self) -> Option<String> {
        self.key.borrow().0.clone()
    }

    /// Rekey the subscription. Returns true when the key actually changed,
    /// which triggers a new delivery.
    pub fn set_key(&self, key: Option<String>) -> bool {
        self.key.send_if_modified(|(current, _)| {
            if *current != key {
                *current = key;
                true
            } else {
                false
            }
        })
    }

    /// Ask for a new delivery with the current key.
    pub fn refresh(&self) {
        self.key.send_modify(|(_, generation)| *generation += 1);
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn cancel(&self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    struct Opportunities {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Opportunities {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }
    }

    #[async_trait]
    impl RecordService for Opportunities {
        async fn find_cases_by_subject(&self, _: &str, _: &str) -> Result<Vec<RecordRow>, ServiceFailure> {
            Ok(Vec::new())
        }

        async fn get_opportunities(&self, account_id: &str) -> Result<Vec<RecordRow>, ServiceFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            if account_id == "broken" {
                return Err(ServiceFailure::service("boom"));
            }
            Ok(vec![RecordRow::new().with("AccountId", account_id)])
        }
    }

    fn subscribe(
        service: Arc<Opportunities>,
        key: Option<&str>,
    ) -> (Subscription, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = Subscription::wire(&Handle::current(), service, key.map(String::from), move |d| {
            let _ = tx.send(d);
        });
        (sub, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Delivery {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no delivery")
            .expect("channel closed")
    }

    fn account_of(delivery: &Delivery) -> String {
        match delivery {
            Delivery::Data(rows) => rows[0].text("AccountId"),
            Delivery::Error(_) => panic!("unexpected error delivery"),
        }
    }

    #[tokio::test]
    async fn delivers_for_initial_key_and_on_rekey() {
        let service = Opportunities::new(Duration::ZERO);
        let (sub, mut rx) = subscribe(service.clone(), Some("001A"));
        assert_eq!(account_of(&next(&mut rx).await), "001A");

        assert!(sub.set_key(Some("001B".into())));
        assert_eq!(account_of(&next(&mut rx).await), "001B");

        // same key again is not a change
        assert!(!sub.set_key(Some("001B".into())));
        assert_eq!(sub.key().as_deref(), Some("001B"));
    }

    #[tokio::test]
    async fn waits_for_a_key() {
        let service = Opportunities::new(Duration::ZERO);
        let (sub, mut rx) = subscribe(service.clone(), None);
        sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);

        sub.set_key(Some("001A".into()));
        assert_eq!(account_of(&next(&mut rx).await), "001A");
    }

    #[tokio::test]
    async fn refresh_redelivers_and_errors_are_forwarded() {
        let service = Opportunities::new(Duration::ZERO);
        let (sub, mut rx) = subscribe(service.clone(), Some("broken"));
        assert!(matches!(next(&mut rx).await, Delivery::Error(_)));

        sub.refresh();
        assert!(matches!(next(&mut rx).await, Delivery::Error(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_callback_after_unsubscribe() {
        let service = Opportunities::new(Duration::from_millis(50));
        let (sub, mut rx) = subscribe(service.clone(), Some("001A"));
        sub.unsubscribe();
        sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_delivery_is_replaced_by_current_key() {
        let service = Opportunities::new(Duration::from_millis(50));
        let (sub, mut rx) = subscribe(service.clone(), Some("001A"));
        sleep(Duration::from_millis(10)).await;
        sub.set_key(Some("001B".into()));
        assert_eq!(account_of(&next(&mut rx).await), "001B");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unsubscribe_waits_for_a_running_callback() {
        let service = Opportunities::new(Duration::ZERO);
        let (started_tx, mut started) = mpsc::unbounded_channel();
        let finished = Arc::new(AtomicUsize::new(0));
        let done = Arc::clone(&finished);
        let sub = Subscription::wire(&Handle::current(), service, Some("001A".into()), move |_| {
            let _ = started_tx.send(());
            std::thread::sleep(Duration::from_millis(100));
            done.fetch_add(1, Ordering::SeqCst);
        });

        timeout(Duration::from_secs(2), started.recv()).await.unwrap();
        sub.unsubscribe();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
