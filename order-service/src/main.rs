use anyhow::Result;
use clap::Parser;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use inventory_service::PgInventoryLedger;
use order_service::api;
use order_service::notification::KafkaEmailService;
use order_service::outbox::{OutboxProcessor, OutboxTopics};
use order_service::store::PgCheckoutStore;
use order_service::{Args, CheckoutConfig, OrderOrchestrator};
use payment_service::SimulatedGateway;
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();
    let config = CheckoutConfig::from_args(&args)?;

    info!("Running database migrations...");
    let mut conn = PgConnection::establish(&args.database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    info!("Migrations completed successfully");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&args.database_url);
    let pool = bb8::Pool::builder().max_size(args.pool_size).build(manager).await?;

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("message.timeout.ms", "5000")
        .create()?;

    let outbox_processor = OutboxProcessor::new(
        pool.clone(),
        producer.clone(),
        OutboxTopics {
            order_events: args.order_events_topic.clone(),
            payment_events: args.payment_events_topic.clone(),
        },
        Duration::from_secs(args.outbox_interval_secs),
    );
    tokio::spawn(async move {
        outbox_processor.run().await;
    });

    let store = Arc::new(PgCheckoutStore::new(pool.clone()));
    let gateway = Arc::new(SimulatedGateway::new(args.payment_success_rate));
    let email = Arc::new(KafkaEmailService::new(producer.clone(), args.email_topic.clone()));
    let orchestrator = Arc::new(OrderOrchestrator::new(config, store, gateway, email));

    let app_state = api::AppState { orchestrator };
    let ledger = Arc::new(PgInventoryLedger::new(pool));
    let app = api::create_router(app_state, ledger);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Order service ready to accept HTTP requests at http://0.0.0.0:{}/orders", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
