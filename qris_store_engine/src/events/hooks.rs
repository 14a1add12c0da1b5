use std::{future::Future, pin::Pin, sync::Arc};

use tokio::task::JoinHandle;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    LowStockEvent,
    ManipulationEvent,
    OrderAnnulledEvent,
    OrderPaidEvent,
    SaleReportEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub sale_report_producer: Vec<EventProducer<SaleReportEvent>>,
    pub order_annulled_producer: Vec<EventProducer<OrderAnnulledEvent>>,
    pub manipulation_producer: Vec<EventProducer<ManipulationEvent>>,
    pub low_stock_producer: Vec<EventProducer<LowStockEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        publish(&self.order_paid_producer, event).await;
    }

    pub async fn publish_sale_report(&self, event: SaleReportEvent) {
        publish(&self.sale_report_producer, event).await;
    }

    pub async fn publish_order_annulled(&self, event: OrderAnnulledEvent) {
        publish(&self.order_annulled_producer, event).await;
    }

    pub async fn publish_manipulation(&self, event: ManipulationEvent) {
        publish(&self.manipulation_producer, event).await;
    }

    pub async fn publish_low_stock(&self, event: LowStockEvent) {
        publish(&self.low_stock_producer, event).await;
    }
}

async fn publish<E: Clone + Send + Sync>(producers: &[EventProducer<E>], event: E) {
    for producer in producers {
        producer.publish_event(event.clone()).await;
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_sale_report: Option<EventHandler<SaleReportEvent>>,
    pub on_order_annulled: Option<EventHandler<OrderAnnulledEvent>>,
    pub on_manipulation: Option<EventHandler<ManipulationEvent>>,
    pub on_low_stock: Option<EventHandler<LowStockEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_paid: hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f)),
            on_sale_report: hooks.on_sale_report.map(|f| EventHandler::new(buffer_size, f)),
            on_order_annulled: hooks.on_order_annulled.map(|f| EventHandler::new(buffer_size, f)),
            on_manipulation: hooks.on_manipulation.map(|f| EventHandler::new(buffer_size, f)),
            on_low_stock: hooks.on_low_stock.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_sale_report {
            result.sale_report_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_annulled {
            result.order_annulled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_manipulation {
            result.manipulation_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_low_stock {
            result.low_stock_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per configured hook. Each task ends once all producers for its event type are dropped.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(handler) = self.on_order_paid {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_sale_report {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_order_annulled {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_manipulation {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_low_stock {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_sale_report: Option<Handler<SaleReportEvent>>,
    pub on_order_annulled: Option<Handler<OrderAnnulledEvent>>,
    pub on_manipulation: Option<Handler<ManipulationEvent>>,
    pub on_low_stock: Option<Handler<LowStockEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f) as Handler<OrderPaidEvent>);
        self
    }

    pub fn on_sale_report<F>(&mut self, f: F) -> &mut Self
    where F: Fn(SaleReportEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_sale_report = Some(Arc::new(f) as Handler<SaleReportEvent>);
        self
    }

    pub fn on_order_annulled<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderAnnulledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_order_annulled = Some(Arc::new(f) as Handler<OrderAnnulledEvent>);
        self
    }

    pub fn on_manipulation<F>(&mut self, f: F) -> &mut Self
    where F: Fn(ManipulationEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_manipulation = Some(Arc::new(f) as Handler<ManipulationEvent>);
        self
    }

    pub fn on_low_stock<F>(&mut self, f: F) -> &mut Self
    where F: Fn(LowStockEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_low_stock = Some(Arc::new(f) as Handler<LowStockEvent>);
        self
    }
}
