use crate::config::ConfigStore;
use crate::credentials::CredentialStore;
use crate::types::{ConnectionStatus, OutboundEnvelope};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Single-slot consumer of raw inbound push frames. Frames are handed over
/// one at a time in arrival order; the callback must return quickly.
pub type EventSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Outcome of one push send attempt. Explicitly distinguishes "the frame
/// went to the live connection" from "the attempt was skipped", so the
/// dispatcher's fallback decision is a plain match instead of a boolean
/// guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendAttempt {
    Sent,
    NotSent(NotSentReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSentReason {
    NotConnected,
    TransportGone,
    Encode,
}

impl SendAttempt {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// The persistent low-latency connection to the server.
///
/// State machine: `Disconnected → (connect) → Connecting → Connected`, back
/// to `Disconnected` on a clean drop and to `Error` on a failed dial; a new
/// `connect()` restarts from either terminal state. Status transitions are
/// published through a watch channel so observers (a settings display, the
/// runtime) see them asynchronously.
pub struct PushChannel {
    status_tx: watch::Sender<ConnectionStatus>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    sink: Mutex<Option<EventSink>>,
    pub(super) config: ConfigStore,
    pub(super) credentials: CredentialStore,
}

impl PushChannel {
    pub fn new(config: ConfigStore, credentials: CredentialStore) -> Arc<Self> {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Arc::new(Self {
            status_tx,
            outbound: Mutex::new(None),
            sink: Mutex::new(None),
            config,
            credentials,
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Register the single event sink. Last writer wins; replacing the sink
    /// is an explicit operation, never a side effect of anything else.
    pub fn set_event_sink(&self, sink: EventSink) {
        *self.sink.lock() = Some(sink);
    }

    /// Start connecting. A no-op while a connection attempt is in flight or
    /// a connection is live, so repeated calls never reset the transport.
    pub fn connect(self: Arc<Self>) {
        if !self.begin_connect() {
            return;
        }
        tokio::spawn(async move {
            super::socket::run(self).await;
        });
    }

    /// Serialize and forward to the live connection. Fails immediately when
    /// not connected; never queues, never blocks, never panics. "Not
    /// connected" is an expected, recoverable condition for callers.
    pub fn try_send(&self, envelope: &OutboundEnvelope) -> SendAttempt {
        if self.status() != ConnectionStatus::Connected {
            return SendAttempt::NotSent(NotSentReason::NotConnected);
        }
        let raw = match serde_json::to_string(envelope) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "outbound envelope failed to encode");
                return SendAttempt::NotSent(NotSentReason::Encode);
            }
        };

        let guard = self.outbound.lock();
        match guard.as_ref() {
            Some(tx) if tx.send(raw).is_ok() => SendAttempt::Sent,
            Some(_) => SendAttempt::NotSent(NotSentReason::TransportGone),
            None => SendAttempt::NotSent(NotSentReason::NotConnected),
        }
    }

    /// Claim the connecting slot. Returns false when already connecting or
    /// connected.
    pub(super) fn begin_connect(&self) -> bool {
        let mut claimed = false;
        self.status_tx.send_if_modified(|status| {
            if matches!(
                *status,
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            ) {
                return false;
            }
            *status = ConnectionStatus::Connecting;
            claimed = true;
            true
        });
        claimed
    }

    pub(super) fn connection_ready(&self, tx: mpsc::UnboundedSender<String>) {
        *self.outbound.lock() = Some(tx);
        self.status_tx.send_replace(ConnectionStatus::Connected);
    }

    pub(super) fn connection_lost(&self, errored: bool) {
        *self.outbound.lock() = None;
        self.status_tx.send_replace(if errored {
            ConnectionStatus::Error
        } else {
            ConnectionStatus::Disconnected
        });
    }

    /// Hand an inbound frame to the registered sink. Frames arriving with no
    /// sink registered are dropped; delivery is best-effort, not
    /// at-least-once.
    pub(super) fn dispatch_frame(&self, raw: &str) {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => sink(raw),
            None => tracing::trace!("push frame dropped, no event sink registered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn channel() -> Arc<PushChannel> {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigStore::with_path(dir.path().join("config.json"));
        let credentials = CredentialStore::with_default_backends(crate::Session::new());
        PushChannel::new(config, credentials)
    }

    #[test]
    fn try_send_fails_immediately_when_disconnected() {
        let push = channel();
        let attempt = push.try_send(&OutboundEnvelope::channel_message("c1", "hi"));
        assert_eq!(attempt, SendAttempt::NotSent(NotSentReason::NotConnected));
    }

    #[test]
    fn try_send_forwards_serialized_envelope_when_connected() {
        let push = channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        push.connection_ready(tx);

        let attempt = push.try_send(&OutboundEnvelope::channel_message("c1", "hi"));
        assert_eq!(attempt, SendAttempt::Sent);

        let raw = rx.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["kind"], "send_channel_message");
        assert_eq!(json["channel_id"], "c1");
    }

    #[test]
    fn try_send_reports_transport_gone_when_writer_dropped() {
        let push = channel();
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        push.connection_ready(tx);
        drop(rx);

        let attempt = push.try_send(&OutboundEnvelope::channel_message("c1", "hi"));
        assert_eq!(attempt, SendAttempt::NotSent(NotSentReason::TransportGone));
    }

    #[test]
    fn begin_connect_is_idempotent_while_in_flight() {
        let push = channel();
        assert!(push.begin_connect());
        assert_eq!(push.status(), ConnectionStatus::Connecting);
        assert!(!push.begin_connect());

        let (tx, _rx) = mpsc::unbounded_channel();
        push.connection_ready(tx);
        assert!(!push.begin_connect());
    }

    #[test]
    fn connect_restarts_after_error_or_drop() {
        let push = channel();
        assert!(push.begin_connect());
        push.connection_lost(true);
        assert_eq!(push.status(), ConnectionStatus::Error);
        assert!(push.begin_connect());

        push.connection_lost(false);
        assert_eq!(push.status(), ConnectionStatus::Disconnected);
        assert!(push.begin_connect());
    }

    #[test]
    fn frames_without_a_sink_are_dropped_silently() {
        let push = channel();
        push.dispatch_frame("{\"event\":\"new_message\"}");
    }

    #[test]
    fn sink_replacement_is_last_writer_wins() {
        let push = channel();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        push.set_event_sink(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = second.clone();
        push.set_event_sink(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        push.dispatch_frame("{}");
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn status_transitions_reach_watchers() {
        let push = channel();
        let watcher = push.watch_status();
        assert_eq!(*watcher.borrow(), ConnectionStatus::Disconnected);

        push.begin_connect();
        assert_eq!(*watcher.borrow(), ConnectionStatus::Connecting);

        let (tx, _rx) = mpsc::unbounded_channel();
        push.connection_ready(tx);
        assert_eq!(*watcher.borrow(), ConnectionStatus::Connected);
    }
}
