//! Benchmark driver for the TPC-C-style transaction mix.
//!
//! Seeds the in-memory store emulation, spawns one task per worker (each
//! owning its own dispatcher bound round-robin to a contact point), fires
//! a weighted transaction mix until the deadline, and writes a JSON run
//! summary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ordermill_txn::model::DISTRICTS_PER_WAREHOUSE;
use ordermill_txn::txn::{
    DeliveryInput, NewOrderInput, OrderLineRequest, OrderStatusInput, PaymentInput,
    PopularItemInput, RelatedCustomerInput, StockLevelInput,
};
use ordermill_txn::{
    Consistency, Dispatcher, DispatcherConfig, MemConnector, MemStore, Session, TxnError,
};

mod seed;

/// CLI entry point wrapper.
#[derive(Parser, Debug)]
#[command(name = "ordermill-workload")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
}

/// CLI options for running the transaction mix.
#[derive(Parser, Debug, Clone)]
struct RunArgs {
    /// Comma-separated cluster contact points, bound to workers round-robin.
    #[arg(long, default_value = "mem://a,mem://b,mem://c")]
    nodes: String,

    /// Consistency level: case-insensitive `ONE`, anything else is QUORUM.
    #[arg(long, default_value = "QUORUM")]
    consistency: String,

    /// Keyspace holding the benchmark tables.
    #[arg(long, default_value = "ordermill")]
    keyspace: String,

    /// Number of concurrent workers (one dispatcher each).
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Warehouses to seed; districts are fixed at 10 per warehouse.
    #[arg(long, default_value_t = 2)]
    warehouses: u32,

    /// Customers seeded per district.
    #[arg(long, default_value_t = 30)]
    customers_per_district: u32,

    /// Items in the catalog.
    #[arg(long, default_value_t = 100)]
    items: u32,

    /// Total runtime of the mix.
    #[arg(long, default_value = "30s")]
    duration: humantime::Duration,

    /// Random seed (0 picks a random seed).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Per-round-trip store timeout.
    #[arg(long, default_value = "5s")]
    op_timeout: humantime::Duration,

    /// Mix weights; relative, not required to sum to 100.
    #[arg(long, default_value_t = 41)]
    new_order_weight: u32,
    #[arg(long, default_value_t = 41)]
    payment_weight: u32,
    #[arg(long, default_value_t = 4)]
    delivery_weight: u32,
    #[arg(long, default_value_t = 5)]
    order_status_weight: u32,
    #[arg(long, default_value_t = 4)]
    stock_level_weight: u32,
    #[arg(long, default_value_t = 2)]
    popular_item_weight: u32,
    #[arg(long, default_value_t = 1)]
    top_balance_weight: u32,
    #[arg(long, default_value_t = 2)]
    related_customer_weight: u32,

    /// Write the JSON run summary to this path.
    #[arg(long, default_value = ".tmp/ordermill/summary.json")]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum TxnKind {
    NewOrder,
    Payment,
    Delivery,
    OrderStatus,
    StockLevel,
    PopularItem,
    TopBalance,
    RelatedCustomer,
}

impl TxnKind {
    const ALL: [TxnKind; 8] = [
        TxnKind::NewOrder,
        TxnKind::Payment,
        TxnKind::Delivery,
        TxnKind::OrderStatus,
        TxnKind::StockLevel,
        TxnKind::PopularItem,
        TxnKind::TopBalance,
        TxnKind::RelatedCustomer,
    ];

    fn name(self) -> &'static str {
        match self {
            TxnKind::NewOrder => "new_order",
            TxnKind::Payment => "payment",
            TxnKind::Delivery => "delivery",
            TxnKind::OrderStatus => "order_status",
            TxnKind::StockLevel => "stock_level",
            TxnKind::PopularItem => "popular_item",
            TxnKind::TopBalance => "top_balance",
            TxnKind::RelatedCustomer => "related_customer",
        }
    }
}

/// Latency/outcome aggregate for one transaction kind.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
struct TxnStats {
    ok: u64,
    failed: u64,
    total_us: u64,
    max_us: u64,
}

impl TxnStats {
    fn record(&mut self, ok: bool, elapsed: Duration) {
        if ok {
            self.ok += 1;
        } else {
            self.failed += 1;
        }
        let us = elapsed.as_micros() as u64;
        self.total_us += us;
        self.max_us = self.max_us.max(us);
    }

    fn merge(&mut self, other: &TxnStats) {
        self.ok += other.ok;
        self.failed += other.failed;
        self.total_us += other.total_us;
        self.max_us = self.max_us.max(other.max_us);
    }
}

/// Metadata embedded in the summary for reproducibility.
#[derive(Debug, serde::Serialize)]
struct SummaryMeta {
    nodes: Vec<String>,
    consistency: String,
    keyspace: String,
    workers: usize,
    warehouses: u32,
    customers_per_district: u32,
    items: u32,
    duration_ms: u64,
    seed: u64,
}

#[derive(Debug, serde::Serialize)]
struct Summary {
    meta: SummaryMeta,
    transactions: BTreeMap<&'static str, TxnStats>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.cmd {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.workers > 0, "--workers must be > 0");
    anyhow::ensure!(args.warehouses > 0, "--warehouses must be > 0");
    anyhow::ensure!(
        args.customers_per_district > 0,
        "--customers-per-district must be > 0"
    );
    anyhow::ensure!(args.items > 0, "--items must be > 0");
    let weights = mix_weights(&args);
    anyhow::ensure!(
        weights.iter().sum::<u32>() > 0,
        "at least one mix weight must be positive"
    );

    let nodes: Vec<String> = args
        .nodes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    anyhow::ensure!(!nodes.is_empty(), "--nodes must not be empty");

    // Use a random seed when the user provides zero.
    let seed = if args.seed == 0 {
        rand::thread_rng().gen()
    } else {
        args.seed
    };

    let store = Arc::new(MemStore::new());
    let connector = MemConnector::new(store);
    let scale = seed::SeedScale {
        warehouses: args.warehouses,
        customers_per_district: args.customers_per_district,
        items: args.items,
    };
    let seeding = Session::new(
        connector.store(),
        Consistency::from_config(&args.consistency),
        args.op_timeout.into(),
        "seed",
        args.keyspace.clone(),
    );
    seed::load(&seeding, scale, seed).await.context("seed data set")?;
    info!(
        warehouses = scale.warehouses,
        customers_per_district = scale.customers_per_district,
        items = scale.items,
        seed,
        "data set seeded"
    );

    let duration: Duration = args.duration.into();
    let deadline = time::Instant::now() + duration;

    let mut tasks = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        let connector = connector.clone();
        let config = DispatcherConfig {
            worker_index: worker,
            consistency: args.consistency.clone(),
            contact_points: nodes.clone(),
            keyspace: args.keyspace.clone(),
            op_timeout: args.op_timeout.into(),
        };
        // Mix the base seed with the worker id for deterministic per-worker RNG.
        let worker_seed = seed ^ (worker as u64).wrapping_mul(0x9e3779b97f4a7c15);
        tasks.push(tokio::spawn(run_worker(
            connector, config, scale, weights, worker_seed, deadline,
        )));
    }

    let mut transactions: BTreeMap<&'static str, TxnStats> = BTreeMap::new();
    for task in tasks {
        let stats = task.await.context("worker task panicked")??;
        for (kind, s) in stats {
            transactions.entry(kind.name()).or_default().merge(&s);
        }
    }

    for (name, stats) in &transactions {
        let attempts = stats.ok + stats.failed;
        let mean_us = if attempts > 0 { stats.total_us / attempts } else { 0 };
        info!(
            txn = name,
            ok = stats.ok,
            failed = stats.failed,
            mean_us,
            max_us = stats.max_us,
            "transaction summary"
        );
    }

    let summary = Summary {
        meta: SummaryMeta {
            nodes,
            consistency: args.consistency.clone(),
            keyspace: args.keyspace.clone(),
            workers: args.workers,
            warehouses: args.warehouses,
            customers_per_district: args.customers_per_district,
            items: args.items,
            duration_ms: duration.as_millis() as u64,
            seed,
        },
        transactions,
    };
    write_summary(&args.out, &summary).context("write summary")?;
    info!(path = %args.out.display(), "wrote run summary");
    Ok(())
}

fn mix_weights(args: &RunArgs) -> [u32; 8] {
    [
        args.new_order_weight,
        args.payment_weight,
        args.delivery_weight,
        args.order_status_weight,
        args.stock_level_weight,
        args.popular_item_weight,
        args.top_balance_weight,
        args.related_customer_weight,
    ]
}

fn pick_kind(rng: &mut SmallRng, weights: &[u32; 8]) -> TxnKind {
    let total: u32 = weights.iter().sum();
    let mut roll = rng.gen_range(0..total);
    for (kind, weight) in TxnKind::ALL.iter().zip(weights) {
        if roll < *weight {
            return *kind;
        }
        roll -= weight;
    }
    TxnKind::NewOrder
}

async fn run_worker(
    connector: MemConnector,
    config: DispatcherConfig,
    scale: seed::SeedScale,
    weights: [u32; 8],
    seed: u64,
    deadline: time::Instant,
) -> anyhow::Result<BTreeMap<TxnKind, TxnStats>> {
    let worker = config.worker_index;
    let dispatcher = Dispatcher::connect(&connector, config)
        .await
        .with_context(|| format!("connect worker {worker}"))?;

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut stats: BTreeMap<TxnKind, TxnStats> = BTreeMap::new();

    while time::Instant::now() < deadline {
        let kind = pick_kind(&mut rng, &weights);
        let started = Instant::now();
        let result = fire(&dispatcher, kind, &mut rng, scale).await;
        let elapsed = started.elapsed();
        if let Err(err) = &result {
            // Benchmark-level failures (conflicts, timeouts) are counted,
            // not fatal; only validation bugs in the driver itself warrant
            // a louder signal.
            if matches!(err, TxnError::Validation(_)) {
                warn!(worker, txn = kind.name(), %err, "driver produced invalid input");
            }
        }
        stats
            .entry(kind)
            .or_default()
            .record(result.is_ok(), elapsed);
    }

    Ok(stats)
}

async fn fire(
    dispatcher: &Dispatcher,
    kind: TxnKind,
    rng: &mut SmallRng,
    scale: seed::SeedScale,
) -> Result<(), TxnError> {
    let warehouse_id = rng.gen_range(1..=scale.warehouses);
    let district_id = rng.gen_range(1..=DISTRICTS_PER_WAREHOUSE);
    let customer_id = rng.gen_range(1..=scale.customers_per_district);

    match kind {
        TxnKind::NewOrder => {
            let lines = (0..rng.gen_range(1..=10))
                .map(|_| OrderLineRequest {
                    item_id: rng.gen_range(1..=scale.items),
                    // 1% of lines are supplied by a remote warehouse.
                    supply_warehouse_id: if scale.warehouses > 1 && rng.gen_range(0..100) == 0 {
                        rng.gen_range(1..=scale.warehouses)
                    } else {
                        warehouse_id
                    },
                    quantity: rng.gen_range(1..=5),
                })
                .collect();
            dispatcher
                .process_new_order(NewOrderInput {
                    warehouse_id,
                    district_id,
                    customer_id,
                    lines,
                })
                .await
                .map(drop)
        }
        TxnKind::Payment => dispatcher
            .process_payment(PaymentInput {
                warehouse_id,
                district_id,
                customer_id,
                amount: Decimal::new(rng.gen_range(100..=500_000), 2),
            })
            .await
            .map(drop),
        TxnKind::Delivery => dispatcher
            .process_delivery(DeliveryInput {
                warehouse_id,
                carrier_id: rng.gen_range(1..=10),
            })
            .await
            .map(drop),
        TxnKind::OrderStatus => dispatcher
            .process_order_status(OrderStatusInput {
                warehouse_id,
                district_id,
                customer_id,
            })
            .await
            .map(drop),
        TxnKind::StockLevel => dispatcher
            .process_stock_level(StockLevelInput {
                warehouse_id,
                district_id,
                threshold: rng.gen_range(10..=20),
                window: 20,
            })
            .await
            .map(drop),
        TxnKind::PopularItem => dispatcher
            .process_popular_item(PopularItemInput {
                warehouse_id,
                district_id,
                window: 20,
            })
            .await
            .map(drop),
        TxnKind::TopBalance => dispatcher.process_top_balance().await.map(drop),
        TxnKind::RelatedCustomer => dispatcher
            .process_related_customer(RelatedCustomerInput {
                warehouse_id,
                district_id,
                customer_id,
            })
            .await
            .map(drop),
    }
}

/// Serialize and write the run summary JSON.
fn write_summary(path: &PathBuf, summary: &Summary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(summary).context("serialize summary")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
