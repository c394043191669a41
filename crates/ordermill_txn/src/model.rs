//! Row payload types for the TPC-C business entities, serialized as JSON
//! values in the column store.

use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Every warehouse serves exactly ten districts.
pub const DISTRICTS_PER_WAREHOUSE: u32 = 10;

/// A NewOrder carries between one and fifteen lines.
pub const MAX_ORDER_LINES: usize = 15;

/// TopBalance reports the ten customers with the highest balance.
pub const TOP_BALANCE_LIMIT: usize = 10;

/// Retry budget for conditional writes (order-id allocation, stock
/// decrement) before the transaction reports a conflict.
pub const CAS_RETRY_BUDGET: u32 = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Warehouse {
    pub name: String,
    pub tax: Decimal,
    pub ytd: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    pub tax: Decimal,
    /// Monotonically increasing; the id the next order will take. Only ever
    /// advanced through a conditional write.
    pub next_order_id: u32,
    pub ytd: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub first: String,
    pub middle: String,
    pub last: String,
    pub credit: String,
    pub credit_limit: Decimal,
    pub discount: Decimal,
    pub balance: Decimal,
    pub ytd_payment: Decimal,
    pub payment_count: u32,
    pub delivery_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub customer_id: u32,
    pub entry_ts: u64,
    /// None until Delivery assigns a carrier.
    pub carrier_id: Option<u32>,
    pub line_count: u32,
    pub all_local: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: u32,
    pub supply_warehouse_id: u32,
    pub quantity: u32,
    pub amount: Decimal,
    /// None until Delivery stamps the line.
    pub delivery_ts: Option<u64>,
    pub dist_info: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stock {
    pub quantity: i64,
    pub ytd: u64,
    pub order_count: u32,
    pub remote_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: Decimal,
}

/// Pending-delivery marker; the row key carries the order id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueEntry {
    pub queued_ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: Decimal,
    pub paid_ts: u64,
}

/// Restock rule: a decrement that would drop the quantity below ten wraps
/// to `quantity + 91 - ordered` instead of going negative.
pub fn restock(quantity: i64, ordered: i64) -> i64 {
    if quantity - ordered < 10 {
        quantity + 91 - ordered
    } else {
        quantity - ordered
    }
}

/// Wall-clock timestamp in microseconds since the epoch.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restock_wraps_below_ten() {
        assert_eq!(restock(8, 3), 96);
        assert_eq!(restock(12, 3), 100);
        assert_eq!(restock(10, 1), 100);
    }

    #[test]
    fn restock_plain_decrement_above_floor() {
        assert_eq!(restock(50, 3), 47);
        assert_eq!(restock(13, 3), 10);
    }
}
