//! The eight transaction handlers. Each owns the query sequence and
//! business logic for one transaction type and talks to the store through a
//! shared [`crate::store::Session`].

pub mod delivery;
pub mod new_order;
pub mod order_status;
pub mod payment;
pub mod popular_item;
pub mod related_customer;
pub mod stock_level;
pub mod top_balance;

pub use delivery::{Delivery, DeliveryInput, DeliveryOutput, DistrictDelivery};
pub use new_order::{NewOrder, NewOrderInput, NewOrderLine, NewOrderOutput, OrderLineRequest};
pub use order_status::{OrderStatus, OrderStatusInput, OrderStatusOutput};
pub use payment::{Payment, PaymentInput, PaymentOutput};
pub use popular_item::{PopularItem, PopularItemInput, PopularItemOutput};
pub use related_customer::{CustomerRef, RelatedCustomer, RelatedCustomerInput, RelatedCustomerOutput};
pub use stock_level::{StockLevel, StockLevelInput, StockLevelOutput};
pub use top_balance::{TopBalance, TopBalanceEntry, TopBalanceOutput};
