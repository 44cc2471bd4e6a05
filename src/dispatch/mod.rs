mod dispatcher;

pub use dispatcher::{Dispatcher, MessagePoster, PushSend};
