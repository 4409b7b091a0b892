use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderApprovedEvent, StockShortfallEvent};

/// The producer ends of all registered hooks. Owned by the engine, which publishes into every
/// subscribed channel after the corresponding transition.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_approved_producer: Vec<EventProducer<OrderApprovedEvent>>,
    pub stock_shortfall_producer: Vec<EventProducer<StockShortfallEvent>>,
}

pub struct EventHandlers {
    pub on_order_approved: Option<EventHandler<OrderApprovedEvent>>,
    pub on_stock_shortfall: Option<EventHandler<StockShortfallEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_approved = hooks.on_order_approved.map(|f| EventHandler::new(buffer_size, f));
        let on_stock_shortfall = hooks.on_stock_shortfall.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_approved, on_stock_shortfall }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_approved {
            result.order_approved_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_stock_shortfall {
            result.stock_shortfall_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_approved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_stock_shortfall {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_approved: Option<Handler<OrderApprovedEvent>>,
    pub on_stock_shortfall: Option<Handler<StockShortfallEvent>>,
}

impl EventHooks {
    pub fn on_order_approved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderApprovedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_approved = Some(Arc::new(f));
        self
    }

    pub fn on_stock_shortfall<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StockShortfallEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_stock_shortfall = Some(Arc::new(f));
        self
    }
}
