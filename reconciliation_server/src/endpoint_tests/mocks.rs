use gateway_tools::WebhookEvent;
use mockall::mock;
use reconciliation_engine::{
    db_types::{GatewayOutcome, LineItem, NewOrder, Order, OrderReference, PaymentStatus},
    traits::{ReviewFlag, StockOutcome},
    OrderManagement,
    ReconciliationDatabase,
    ReconciliationError,
};

use crate::integrations::gateway::{AdapterError, GatewayAdapter, WebhookError};

mock! {
    pub ReconDb {}
    impl OrderManagement for ReconDb {
        async fn fetch_order_by_reference(&self, reference: &OrderReference) -> Result<Option<Order>, ReconciliationError>;
        async fn fetch_order_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Order>, ReconciliationError>;
        async fn fetch_line_items(&self, order_id: i64) -> Result<Vec<LineItem>, ReconciliationError>;
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError>;
    }
    impl ReconciliationDatabase for ReconDb {
        fn url(&self) -> &str;
        async fn transition_payment_status(
            &self,
            order_id: i64,
            expected: PaymentStatus,
            target: PaymentStatus,
            transaction_id: &str,
        ) -> Result<Option<Order>, ReconciliationError>;
        async fn apply_stock_for_order(&self, order: &Order) -> Result<StockOutcome, ReconciliationError>;
        async fn record_conflict(&self, order: &Order, incoming: PaymentStatus, transaction_id: &str) -> Result<(), ReconciliationError>;
        async fn fetch_review_flags(&self, reference: &OrderReference) -> Result<Vec<ReviewFlag>, ReconciliationError>;
        async fn close(&mut self) -> Result<(), ReconciliationError>;
    }
}

mock! {
    pub Adapter {}
    impl GatewayAdapter for Adapter {
        fn parse_webhook<'a>(&self, signature: Option<&'a str>, event: &WebhookEvent) -> Result<GatewayOutcome, WebhookError>;
        async fn fetch_transaction(&self, transaction_id: &str) -> Result<GatewayOutcome, AdapterError>;
    }
}
