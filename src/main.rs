//! Viewesta payments server binary.

use std::sync::Arc;

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use viewesta_payments::adapters::http::{api_router, AuthState, BillingAppState};
use viewesta_payments::adapters::{
    FlutterwaveGateway, JwtAuthenticator, PostgresEntitlementStore, PostgresPricingCatalog,
    PostgresTransactionLog, PostgresWalletLedger, StripeGateway,
};
use viewesta_payments::config::{AppConfig, ServerConfig};
use viewesta_payments::ports::GatewayRegistry;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!("Server exited with error: {}", err);
        eprintln!("viewesta-payments: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;
    info!(environment = ?config.server.environment, "Configuration loaded");

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    info!("Postgres connection pool established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let state = BillingAppState {
        ledger: Arc::new(PostgresWalletLedger::new(pool.clone())),
        transactions: Arc::new(PostgresTransactionLog::new(pool.clone())),
        entitlements: Arc::new(PostgresEntitlementStore::new(pool.clone())),
        pricing: Arc::new(PostgresPricingCatalog::new(pool)),
        gateways: build_gateways(&config)?,
        frontend_url: config.server.frontend_url.clone(),
        reaper_interval: config.reaper.interval(),
    };

    let authenticator: AuthState = Arc::new(JwtAuthenticator::new(config.auth.jwt_config()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = if config.reaper.enabled {
        Some(tokio::spawn(state.reaper().run(shutdown_rx)))
    } else {
        info!("Expiry reaper disabled");
        None
    };

    let app = api_router(state, authenticator)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server)?)
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server is running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight sweep finish before exiting.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = reaper {
        if let Err(err) = handle.await {
            warn!("Expiry reaper task ended abnormally: {}", err);
        }
    }

    info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.as_str()));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_gateways(config: &AppConfig) -> Result<GatewayRegistry, BoxError> {
    let default_provider = config
        .payment
        .resolved_default_provider()
        .ok_or("no payment provider configured")?;
    let mut registry = GatewayRegistry::new(default_provider);

    if let Some(stripe) = config.payment.stripe() {
        registry = registry.with_gateway(Arc::new(StripeGateway::new(stripe)?));
        info!("Stripe gateway enabled");
    }
    if let Some(flutterwave) = config.payment.flutterwave() {
        registry = registry.with_gateway(Arc::new(FlutterwaveGateway::new(flutterwave)?));
        info!("Flutterwave gateway enabled");
    }

    Ok(registry)
}

fn cors_layer(server: &ServerConfig) -> Result<CorsLayer, BoxError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ]);

    let origins = server.cors_origins_list();
    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(origins))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
