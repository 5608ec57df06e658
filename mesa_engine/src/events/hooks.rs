use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, NewOrderEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub new_order_producer: Vec<EventProducer<NewOrderEvent>>,
}

pub struct EventHandlers {
    pub on_new_order: Option<EventHandler<NewOrderEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_new_order = hooks.on_new_order.map(|f| EventHandler::new(buffer_size, f));
        Self { on_new_order }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_new_order {
            result.new_order_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_new_order {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_new_order: Option<Handler<NewOrderEvent>>,
}

impl EventHooks {
    pub fn on_new_order<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NewOrderEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_new_order = Some(Arc::new(f));
        self
    }
}
