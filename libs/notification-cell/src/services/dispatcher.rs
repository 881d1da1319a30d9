use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;

use crate::models::{Notification, NotificationError};
use crate::services::gateway::{LogGateway, NotificationGateway, WebhookGateway};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Fire-and-forget notification queue served by a fixed pool of workers.
///
/// `dispatch` never waits on delivery. Delivery failures are logged and
/// counted; they never reach the caller that enqueued the message.
pub struct NotificationDispatcher {
    sender: RwLock<Option<mpsc::Sender<Notification>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    gateway_name: &'static str,
}

impl NotificationDispatcher {
    /// Spawns the worker pool; must be called inside a tokio runtime.
    pub fn start(
        gateway: Arc<dyn NotificationGateway>,
        worker_count: usize,
        queue_capacity: usize,
        delivery_timeout: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());
        let gateway_name = gateway.name();

        let workers = (0..worker_count.max(1))
            .map(|i| {
                let worker = Worker {
                    name: format!("notification-worker-{}", i),
                    gateway: Arc::clone(&gateway),
                    receiver: Arc::clone(&receiver),
                    counters: Arc::clone(&counters),
                    delivery_timeout,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        info!(
            "Notification dispatcher started with {} workers via {} gateway",
            worker_count.max(1),
            gateway_name
        );

        Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
            gateway_name,
        }
    }

    /// Webhook delivery when a relay URL is configured, log delivery otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let gateway: Arc<dyn NotificationGateway> = match &config.notification_webhook_url {
            Some(url) => Arc::new(WebhookGateway::new(url.clone(), config.notification_from.clone())),
            None => Arc::new(LogGateway::new(config.notification_from.clone())),
        };

        Self::start(
            gateway,
            config.notification_workers,
            config.notification_queue_capacity,
            Duration::from_secs(config.notification_timeout_seconds),
        )
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway_name
    }

    /// Enqueues without waiting. A full or closed queue drops the message.
    pub fn dispatch(&self, notification: Notification) {
        let guard = self.sender.read().unwrap_or_else(|poisoned| poisoned.into_inner());

        let result = match guard.as_ref() {
            Some(sender) => sender.try_send(notification).map_err(|e| match e {
                mpsc::error::TrySendError::Full(n) => (NotificationError::QueueFull, n),
                mpsc::error::TrySendError::Closed(n) => (NotificationError::QueueClosed, n),
            }),
            None => Err((NotificationError::QueueClosed, notification)),
        };

        match result {
            Ok(()) => debug!("Notification queued"),
            Err((e, dropped)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    kind = %dropped.kind,
                    appointment_id = %dropped.appointment_id,
                    "Dropping notification for {}: {}",
                    dropped.recipient,
                    e
                );
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Closes the queue and waits for the workers to drain what is left.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Notification worker ended abnormally: {}", e);
            }
        }

        info!("Notification dispatcher stopped: {:?}", self.stats());
    }
}

struct Worker {
    name: String,
    gateway: Arc<dyn NotificationGateway>,
    receiver: Arc<Mutex<mpsc::Receiver<Notification>>>,
    counters: Arc<Counters>,
    delivery_timeout: Duration,
}

impl Worker {
    async fn run(self) {
        debug!("Worker loop started: {}", self.name);

        loop {
            let next = self.receiver.lock().await.recv().await;
            let Some(notification) = next else {
                break;
            };

            match self.deliver(&notification).await {
                Ok(()) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        kind = %notification.kind,
                        appointment_id = %notification.appointment_id,
                        "Notification delivery failure for {}: {}",
                        notification.recipient,
                        e
                    );
                }
            }
        }

        debug!("Worker loop ended: {}", self.name);
    }

    #[instrument(skip(self, notification), fields(worker = %self.name, notification_id = %notification.id))]
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        match timeout(self.delivery_timeout, self.gateway.deliver(notification)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout {
                seconds: self.delivery_timeout.as_secs(),
            }),
        }
    }
}
