use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::PortalClient;
use crate::error::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelSignal {
    Ready,
    Lost,
}

/// Source of liveness signals for the booking UI's live-update channel.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn subscribe(&self) -> Result<broadcast::Receiver<ChannelSignal>, BookingError>;

    async fn unsubscribe(&self);
}

/// In-process push channel backed by a tokio broadcast.
pub struct BroadcastPushChannel {
    sender: broadcast::Sender<ChannelSignal>,
    subscribers: AtomicUsize,
}

impl BroadcastPushChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscribers: AtomicUsize::new(0),
        }
    }

    /// Publish a signal, returning how many receivers got it.
    pub fn publish(&self, signal: ChannelSignal) -> usize {
        match self.sender.send(signal) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for push signal {:?}", signal);
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushChannel for BroadcastPushChannel {
    async fn subscribe(&self) -> Result<broadcast::Receiver<ChannelSignal>, BookingError> {
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        Ok(self.sender.subscribe())
    }

    async fn unsubscribe(&self) {
        let _ = self
            .subscribers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// Display-only connection flag for the booking UI.
///
/// Starts disconnected and follows whatever the attached push channel
/// reports. Nothing in the reservation flow reads it.
pub struct ConnectivityMonitor {
    status: Arc<watch::Sender<bool>>,
    attached: Mutex<Option<(JoinHandle<()>, Arc<dyn PushChannel>)>>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn set_connected(status: &watch::Sender<bool>, connected: bool) {
    let changed = status.send_if_modified(|current| {
        if *current != connected {
            *current = connected;
            true
        } else {
            false
        }
    });
    if changed {
        info!(
            "Live-update channel {}",
            if connected { "connected" } else { "disconnected" }
        );
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (status, _) = watch::channel(false);
        Self {
            status: Arc::new(status),
            attached: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.status.borrow()
    }

    /// Stream of the flag: the current value first, then every change.
    pub fn changes(&self) -> impl Stream<Item = bool> + Send + 'static {
        let receiver = self.status.subscribe();
        stream::unfold((receiver, true), |(mut receiver, first)| async move {
            if !first {
                receiver.changed().await.ok()?;
            }
            let connected = *receiver.borrow_and_update();
            Some((connected, (receiver, false)))
        })
    }

    /// Follow `channel`, replacing any channel attached before.
    pub async fn attach(&self, channel: Arc<dyn PushChannel>) -> Result<(), BookingError> {
        self.detach().await;

        let mut receiver = channel.subscribe().await?;
        let status = Arc::clone(&self.status);

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(ChannelSignal::Ready) => set_connected(&status, true),
                    Ok(ChannelSignal::Lost) => set_connected(&status, false),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Connectivity monitor skipped {} push signals", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        set_connected(&status, false);
                        break;
                    }
                }
            }
        });

        *self.attached.lock().await = Some((task, channel));
        Ok(())
    }

    pub async fn detach(&self) {
        if let Some((task, channel)) = self.attached.lock().await.take() {
            task.abort();
            channel.unsubscribe().await;
            set_connected(&self.status, false);
        }
    }
}

/// Probe the backend every `every` and publish Ready/Lost when reachability changes.
pub fn spawn_heartbeat(
    client: PortalClient,
    channel: Arc<BroadcastPushChannel>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        let mut last: Option<bool> = None;

        loop {
            ticker.tick().await;
            let reachable = client.ping().await;
            if last != Some(reachable) {
                debug!("Backend reachability changed to {}", reachable);
                channel.publish(if reachable {
                    ChannelSignal::Ready
                } else {
                    ChannelSignal::Lost
                });
                last = Some(reachable);
            }
        }
    })
}
