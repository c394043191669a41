mod common;

use rust_decimal::Decimal;

use ordermill_txn::keys;
use ordermill_txn::model::Customer;
use ordermill_txn::txn::{
    NewOrderInput, OrderLineRequest, OrderStatusInput, PopularItemInput, RelatedCustomerInput,
    StockLevelInput,
};
use ordermill_txn::{Table, TxnError};

async fn place_order(
    fx: &common::Fixture,
    warehouse_id: u32,
    district_id: u32,
    customer_id: u32,
    items: &[(u32, u32)],
) -> u32 {
    fx.dispatcher
        .process_new_order(NewOrderInput {
            warehouse_id,
            district_id,
            customer_id,
            lines: items
                .iter()
                .map(|&(item_id, quantity)| OrderLineRequest {
                    item_id,
                    supply_warehouse_id: warehouse_id,
                    quantity,
                })
                .collect(),
        })
        .await
        .unwrap()
        .order_id
}

#[tokio::test]
async fn order_status_returns_most_recent_order() {
    let fx = common::fixture().await;
    place_order(&fx, 1, 1, 1, &[(1, 1)]).await;
    place_order(&fx, 1, 1, 2, &[(2, 1)]).await;
    let latest = place_order(&fx, 1, 1, 1, &[(3, 2), (4, 1)]).await;

    let out = fx
        .dispatcher
        .process_order_status(OrderStatusInput {
            warehouse_id: 1,
            district_id: 1,
            customer_id: 1,
        })
        .await
        .unwrap();

    assert_eq!(out.order_id, latest);
    assert_eq!(out.customer_last, "last-1");
    assert_eq!(out.carrier_id, None);
    assert_eq!(out.lines.len(), 2);
    assert_eq!(out.lines[0].item_id, 3);
    assert_eq!(out.lines[0].quantity, 2);
    assert!(out.lines.iter().all(|l| l.delivery_ts.is_none()));
}

#[tokio::test]
async fn order_status_without_orders_is_not_found() {
    let fx = common::fixture().await;
    let err = fx
        .dispatcher
        .process_order_status(OrderStatusInput {
            warehouse_id: 1,
            district_id: 1,
            customer_id: 3,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TxnError::NotFound { entity: "order", .. }));
}

#[tokio::test]
async fn stock_level_counts_items_below_threshold() {
    let fx = common::fixture().await;
    place_order(&fx, 1, 1, 1, &[(10, 1), (11, 1)]).await;
    place_order(&fx, 1, 1, 2, &[(11, 1), (12, 1)]).await;

    common::set_stock_quantity(&fx.session, 1, 10, 5).await;
    common::set_stock_quantity(&fx.session, 1, 11, 30).await;
    common::set_stock_quantity(&fx.session, 1, 12, 7).await;

    let out = fx
        .dispatcher
        .process_stock_level(StockLevelInput {
            warehouse_id: 1,
            district_id: 1,
            threshold: 10,
            window: 20,
        })
        .await
        .unwrap();
    assert_eq!(out.distinct_items, 3);
    assert_eq!(out.low_stock_items, 2);
    assert_eq!(out.examined_orders, 2);
}

#[tokio::test]
async fn stock_level_with_empty_window_is_zero() {
    let fx = common::fixture().await;
    place_order(&fx, 1, 1, 1, &[(10, 1)]).await;
    common::set_stock_quantity(&fx.session, 1, 10, 0).await;

    let out = fx
        .dispatcher
        .process_stock_level(StockLevelInput {
            warehouse_id: 1,
            district_id: 1,
            threshold: 1_000_000,
            window: 0,
        })
        .await
        .unwrap();
    assert_eq!(out.low_stock_items, 0);
    assert_eq!(out.distinct_items, 0);
    assert_eq!(out.examined_orders, 0);
}

#[tokio::test]
async fn popular_item_aggregates_quantities_over_the_window() {
    let fx = common::fixture().await;
    place_order(&fx, 1, 1, 1, &[(20, 5)]).await;
    place_order(&fx, 1, 1, 2, &[(21, 3), (20, 2)]).await;

    let out = fx
        .dispatcher
        .process_popular_item(PopularItemInput {
            warehouse_id: 1,
            district_id: 1,
            window: 2,
        })
        .await
        .unwrap();

    assert_eq!(out.orders.len(), 2);
    assert_eq!(out.popular.len(), 1);
    assert_eq!(out.popular[0].item_id, 20);
    assert_eq!(out.popular[0].total_quantity, 7);
    assert_eq!(out.popular[0].name, "item-20");
    assert!(out
        .orders
        .iter()
        .any(|o| o.customer_first == "first-2" && o.customer_last == "last-2"));
}

#[tokio::test]
async fn popular_item_window_sees_only_recent_orders() {
    let fx = common::fixture().await;
    place_order(&fx, 1, 1, 1, &[(30, 9)]).await;
    place_order(&fx, 1, 1, 1, &[(31, 1)]).await;

    let out = fx
        .dispatcher
        .process_popular_item(PopularItemInput {
            warehouse_id: 1,
            district_id: 1,
            window: 1,
        })
        .await
        .unwrap();
    assert_eq!(out.orders.len(), 1);
    assert_eq!(out.popular[0].item_id, 31);
}

#[tokio::test]
async fn top_balance_orders_across_pages() {
    let fx = common::fixture().await;
    // 150 extra customers across both warehouses forces the paged scan to
    // take more than one round trip.
    for n in 0..150u32 {
        let w = n % common::WAREHOUSES + 1;
        let d = n % 10 + 1;
        let c = 100 + n;
        fx.session
            .put(
                Table::Customer,
                keys::customer(w, d, c),
                &Customer {
                    first: format!("bulk-{n}"),
                    middle: "OE".to_string(),
                    last: format!("bulk-last-{n}"),
                    credit: "GC".to_string(),
                    credit_limit: Decimal::from(50_000),
                    discount: Decimal::ZERO,
                    balance: Decimal::from(n),
                    ytd_payment: Decimal::ZERO,
                    payment_count: 0,
                    delivery_count: 0,
                },
            )
            .await
            .unwrap();
    }

    let out = fx.dispatcher.process_top_balance().await.unwrap();
    assert_eq!(out.customers.len(), 10);
    // Largest magnitude wins and the list is sorted descending.
    assert_eq!(out.customers[0].balance, Decimal::from(149));
    for pair in out.customers.windows(2) {
        assert!(pair[0].balance.abs() >= pair[1].balance.abs());
    }
    // Names were joined in.
    assert!(!out.customers[0].warehouse_name.is_empty());
    assert!(!out.customers[0].district_name.is_empty());
}

#[tokio::test]
async fn top_balance_ranks_by_magnitude() {
    let fx = common::fixture().await;
    // A deep debt outranks a smaller positive balance.
    common::set_customer_balance(&fx.session, 1, 1, 1, Decimal::new(-50_000, 2)).await;
    common::set_customer_balance(&fx.session, 2, 1, 1, Decimal::from(120)).await;

    let out = fx.dispatcher.process_top_balance().await.unwrap();
    assert_eq!(out.customers[0].balance, Decimal::new(-50_000, 2));
    assert_eq!(out.customers[0].customer_id, 1);
    assert_eq!(out.customers[0].warehouse_id, 1);
    assert_eq!(out.customers[1].balance, Decimal::from(120));
    assert_eq!(out.customers[1].warehouse_id, 2);
}

#[tokio::test]
async fn related_customer_shares_at_least_one_item() {
    let fx = common::fixture().await;
    place_order(&fx, 1, 1, 1, &[(7, 1), (8, 1)]).await;
    // Same district, shares item 7.
    place_order(&fx, 1, 1, 2, &[(7, 2)]).await;
    // Same district, no shared item.
    place_order(&fx, 1, 1, 3, &[(9, 1)]).await;
    // Other district of the same warehouse, shares item 8.
    place_order(&fx, 1, 2, 1, &[(8, 3)]).await;

    let out = fx
        .dispatcher
        .process_related_customer(RelatedCustomerInput {
            warehouse_id: 1,
            district_id: 1,
            customer_id: 1,
        })
        .await
        .unwrap();

    let refs: Vec<(u32, u32, u32)> = out
        .customers
        .iter()
        .map(|r| (r.warehouse_id, r.district_id, r.customer_id))
        .collect();
    assert!(refs.contains(&(1, 1, 2)));
    assert!(refs.contains(&(1, 2, 1)));
    assert!(!refs.contains(&(1, 1, 3)));
    // The input customer is never their own relative.
    assert!(!refs.contains(&(1, 1, 1)));
}

#[tokio::test]
async fn related_customer_without_history_is_empty() {
    let fx = common::fixture().await;
    let out = fx
        .dispatcher
        .process_related_customer(RelatedCustomerInput {
            warehouse_id: 1,
            district_id: 1,
            customer_id: 1,
        })
        .await
        .unwrap();
    assert!(out.customers.is_empty());
}
