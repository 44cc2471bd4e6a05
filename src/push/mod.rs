mod channel;
mod socket;

pub use channel::{EventSink, NotSentReason, PushChannel, SendAttempt};
