use crate::api::{ApiError, RequestClient};
use crate::push::{EventSink, PushChannel, SendAttempt};
use crate::types::{
    InboundEvent, Invalidation, OutboundEnvelope, SendOutcome, EVENT_NEW_MESSAGE,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Push-side seam for the dispatcher: a synchronous, non-queuing send plus
/// the single-slot event sink registration.
pub trait PushSend: Send + Sync {
    fn try_send(&self, envelope: &OutboundEnvelope) -> SendAttempt;
    fn set_event_sink(&self, sink: EventSink);
}

impl PushSend for PushChannel {
    fn try_send(&self, envelope: &OutboundEnvelope) -> SendAttempt {
        PushChannel::try_send(self, envelope)
    }

    fn set_event_sink(&self, sink: EventSink) {
        PushChannel::set_event_sink(self, sink)
    }
}

/// Reliable-transport seam used when the push attempt reports failure.
#[async_trait]
pub trait MessagePoster: Send + Sync {
    async fn post_channel_message(&self, channel_id: &str, body: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl MessagePoster for RequestClient {
    async fn post_channel_message(&self, channel_id: &str, body: &str) -> Result<(), ApiError> {
        self.send_channel_message(channel_id, body).await
    }
}

const INVALIDATION_BUFFER: usize = 64;

/// Inbound routing state, shared between the dispatcher and the sink closure
/// it hands to the push channel.
struct Routing {
    subscription: Mutex<Option<String>>,
    invalidations: broadcast::Sender<Invalidation>,
}

impl Routing {
    /// Consume one raw push frame. Malformed payloads are expected under
    /// version skew and are dropped without surfacing anything; `new_message`
    /// for the active channel emits exactly one invalidation; every other
    /// kind or channel is dropped without side effect.
    fn route(&self, raw: &str) {
        let event: InboundEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(_) => {
                tracing::debug!("dropping malformed push payload");
                return;
            }
        };

        if event.event != EVENT_NEW_MESSAGE {
            return;
        }
        let Some(channel_id) = event.channel_id else {
            return;
        };

        let matches_active = self
            .subscription
            .lock()
            .as_deref()
            .is_some_and(|active| active == channel_id);
        if !matches_active {
            return;
        }

        // Nobody listening yet is fine; the view layer refetches on mount.
        let _ = self.invalidations.send(Invalidation { channel_id });
    }
}

/// Orchestrates outbound delivery and inbound invalidation.
///
/// Sends prefer the push transport and fall back, sequentially and at most
/// once, to the reliable transport. Inbound push events are matched against
/// the single active channel subscription and turned into [`Invalidation`]
/// signals for the view layer; everything else is dropped.
pub struct Dispatcher {
    push: Arc<dyn PushSend>,
    poster: Arc<dyn MessagePoster>,
    routing: Arc<Routing>,
    sink_registered: AtomicBool,
}

impl Dispatcher {
    pub fn new(push: Arc<dyn PushSend>, poster: Arc<dyn MessagePoster>) -> Arc<Self> {
        let (invalidations, _) = broadcast::channel(INVALIDATION_BUFFER);
        Arc::new(Self {
            push,
            poster,
            routing: Arc::new(Routing {
                subscription: Mutex::new(None),
                invalidations,
            }),
            sink_registered: AtomicBool::new(false),
        })
    }

    /// Stream of invalidation signals. At-least-once per stale view; lagging
    /// receivers may observe coalesced delivery, which callers treat as a
    /// single refetch trigger anyway.
    pub fn invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.routing.invalidations.subscribe()
    }

    pub fn active_subscription(&self) -> Option<String> {
        self.routing.subscription.lock().clone()
    }

    /// Deliver one message: push first, and iff the push attempt reports it
    /// did not go out, exactly one fallback call on the reliable transport.
    /// The two paths never run concurrently. The outcome says only whether
    /// the message was delivered, not which transport carried it.
    pub async fn send_message(&self, channel_id: &str, body: &str) -> SendOutcome {
        let envelope = OutboundEnvelope::channel_message(channel_id, body);
        match self.push.try_send(&envelope) {
            SendAttempt::Sent => SendOutcome::Delivered,
            SendAttempt::NotSent(reason) => {
                tracing::debug!(?reason, channel_id, "push send skipped, using http fallback");
                match self.poster.post_channel_message(channel_id, body).await {
                    Ok(()) => SendOutcome::Delivered,
                    Err(e) => {
                        tracing::warn!(error = %e, channel_id, "message failed on both transports");
                        SendOutcome::Failed
                    }
                }
            }
        }
    }

    /// Focus on a channel, replacing any prior subscription (last writer
    /// wins). Events for the previously subscribed channel are simply no
    /// longer matched. The first call registers this dispatcher as the push
    /// channel's event sink.
    pub fn subscribe(&self, channel_id: &str) {
        *self.routing.subscription.lock() = Some(channel_id.to_string());

        if !self.sink_registered.swap(true, Ordering::SeqCst) {
            let routing = self.routing.clone();
            self.push
                .set_event_sink(Arc::new(move |raw| routing.route(raw)));
        }
    }

    /// Feed one raw push frame through inbound routing. Exposed for hosts
    /// that bridge frames from their own transport.
    pub fn handle_event(&self, raw: &str) {
        self.routing.route(raw);
    }
}
