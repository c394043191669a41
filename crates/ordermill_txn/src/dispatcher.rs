//! Transaction dispatcher: one store session plus one instance of each
//! handler, routing typed calls from the workload driver. Construction
//! binds the worker to a cluster contact point round-robin by worker
//! index and fails fast on an empty contact-point list.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::consistency::Consistency;
use crate::error::{TxnError, TxnResult};
use crate::store::{Connector, Session};
use crate::txn::{
    Delivery, DeliveryInput, DeliveryOutput, NewOrder, NewOrderInput, NewOrderOutput, OrderStatus,
    OrderStatusInput, OrderStatusOutput, Payment, PaymentInput, PaymentOutput, PopularItem,
    PopularItemInput, PopularItemOutput, RelatedCustomer, RelatedCustomerInput,
    RelatedCustomerOutput, StockLevel, StockLevelInput, StockLevelOutput, TopBalance,
    TopBalanceOutput,
};

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Logical worker index; selects the contact point round-robin.
    pub worker_index: usize,
    /// Consistency-level string from deployment configuration.
    pub consistency: String,
    pub contact_points: Vec<String>,
    pub keyspace: String,
    /// Deadline for each store round trip.
    pub op_timeout: Duration,
}

/// Pure contact-point binding: `contact_points[index % len]`.
pub fn bind_contact_point(worker_index: usize, contact_points: &[String]) -> Option<&str> {
    if contact_points.is_empty() {
        return None;
    }
    Some(contact_points[worker_index % contact_points.len()].as_str())
}

pub struct Dispatcher {
    session: Arc<Session>,
    new_order: NewOrder,
    payment: Payment,
    delivery: Delivery,
    order_status: OrderStatus,
    stock_level: StockLevel,
    popular_item: PopularItem,
    top_balance: TopBalance,
    related_customer: RelatedCustomer,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub async fn connect(connector: &dyn Connector, config: DispatcherConfig) -> TxnResult<Self> {
        let contact = bind_contact_point(config.worker_index, &config.contact_points)
            .ok_or_else(|| TxnError::Validation("contact point list is empty".to_string()))?
            .to_string();
        let consistency = Consistency::from_config(&config.consistency);

        let store = connector
            .connect(&contact, &config.keyspace, consistency)
            .await?;
        info!(
            worker = config.worker_index,
            contact_point = %contact,
            %consistency,
            keyspace = %config.keyspace,
            "dispatcher connected"
        );

        let session = Arc::new(Session::new(
            store,
            consistency,
            config.op_timeout,
            contact,
            config.keyspace,
        ));
        Ok(Self::with_session(session))
    }

    /// Assemble a dispatcher around an already-established session.
    pub fn with_session(session: Arc<Session>) -> Self {
        Self {
            new_order: NewOrder::new(session.clone()),
            payment: Payment::new(session.clone()),
            delivery: Delivery::new(session.clone()),
            order_status: OrderStatus::new(session.clone()),
            stock_level: StockLevel::new(session.clone()),
            popular_item: PopularItem::new(session.clone()),
            top_balance: TopBalance::new(session.clone()),
            related_customer: RelatedCustomer::new(session.clone()),
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn process_new_order(&self, input: NewOrderInput) -> TxnResult<NewOrderOutput> {
        self.new_order.execute(input).await
    }

    pub async fn process_payment(&self, input: PaymentInput) -> TxnResult<PaymentOutput> {
        self.payment.execute(input).await
    }

    pub async fn process_delivery(&self, input: DeliveryInput) -> TxnResult<DeliveryOutput> {
        self.delivery.execute(input).await
    }

    pub async fn process_order_status(
        &self,
        input: OrderStatusInput,
    ) -> TxnResult<OrderStatusOutput> {
        self.order_status.execute(input).await
    }

    pub async fn process_stock_level(&self, input: StockLevelInput) -> TxnResult<StockLevelOutput> {
        self.stock_level.execute(input).await
    }

    pub async fn process_popular_item(
        &self,
        input: PopularItemInput,
    ) -> TxnResult<PopularItemOutput> {
        self.popular_item.execute(input).await
    }

    pub async fn process_top_balance(&self) -> TxnResult<TopBalanceOutput> {
        self.top_balance.execute().await
    }

    pub async fn process_related_customer(
        &self,
        input: RelatedCustomerInput,
    ) -> TxnResult<RelatedCustomerOutput> {
        self.related_customer.execute(input).await
    }
}
