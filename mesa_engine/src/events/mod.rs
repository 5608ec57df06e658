mod broker;
mod channel;
mod event_types;
mod hooks;

pub use broker::{OrderBroker, Subscription};
pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
