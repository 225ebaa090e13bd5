//! `swap-service` binary entrypoint: loads configuration, wires the
//! ingestion pipeline (A->B->C->D) to the Price Index, constructs the
//! Builder Registry (E) and optional External Price Fallback (G), and
//! serves the Quote/Swap HTTP API (F) until a process signal requests an
//! orderly shutdown (§5: "stop keepalive, close connection, clear D,
//! exit").

mod config;
mod wiring;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, ProviderKind};
use swap_api::{AppState, RpcBlockhashProvider, build_router};
use swap_cache::PriceIndex;
use swap_execution::{FallbackLookup, HttpPriceAggregator, PriceAggregator};
use swap_ingest::{
    GrpcTransactionSource, NullParser, SubscribeConfig, TradeExtractor, TransactionSource,
    WebSocketTransactionSource, ingest_record,
};

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env().context("loading configuration from environment")?;
    info!(port = config.listen_port, provider = ?config.provider, "starting swap-service");

    let registry = Arc::new(wiring::build_registry());
    let whitelist: HashSet<_> = registry.supported_program_ids();

    let index = PriceIndex::new(config.max_cache_bytes, whitelist.clone())
        .with_cleanup_policy(config.cleanup_threshold, swap_cache::DEFAULT_CLEANUP_TARGET);

    let start_time_ms = chrono::Utc::now().timestamp_millis();
    let source: Arc<dyn TransactionSource> = build_transaction_source(&config, start_time_ms)?;

    let subscribe_config = SubscribeConfig {
        accounts: whitelist.clone(),
        commitment: config.commitment,
        enable_v0: config.enable_v0,
    };

    let mut records = source
        .subscribe(subscribe_config)
        .await
        .context("establishing the initial transaction source connection")?;

    let ingestion_handle = source.connection_handle();
    let ingestion_index = index.clone();
    let ingestion_whitelist = whitelist.clone();
    let ingestion_task = tokio::spawn(async move {
        let extractor = TradeExtractor::new(NullParser, ingestion_whitelist.clone());
        while let Some(record) = records.next().await {
            let connection_id = ingestion_handle.connection_id();
            let now_ms = chrono::Utc::now().timestamp_millis();
            let written = ingest_record(
                &record,
                &connection_id,
                &extractor,
                &ingestion_whitelist,
                &ingestion_index,
                now_ms,
            );
            if written > 0 {
                tracing::debug!(written, signature = %record.signature, "wrote price observations");
            }
        }
        warn!("transaction source stream ended");
    });

    let http_client = reqwest::Client::new();
    let fallback = config.aggregator_base_url.as_ref().map(|base_url| {
        let aggregator: Box<dyn PriceAggregator> = Box::new(HttpPriceAggregator::new(
            http_client.clone(),
            base_url.clone(),
            *swap_instrument::WSOL_MINT,
        ));
        Arc::new(FallbackLookup::new(
            aggregator,
            wiring::build_label_table(),
            registry.clone(),
            index.clone(),
        ))
    });

    let blockhash_provider = Arc::new(RpcBlockhashProvider::new(
        http_client,
        config.rpc_endpoint.clone(),
    ));

    let state = AppState::new(index.clone(), registry, fallback, blockhash_provider);
    let router = build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.listen_port))
        .await
        .with_context(|| format!("binding HTTP listener on port {}", config.listen_port))?;
    info!(port = config.listen_port, "quote/swap API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving the quote/swap API")?;

    info!("shutdown requested, stopping ingestion");
    ingestion_task.abort();
    index.clear();
    info!("swap-service exited cleanly");

    Ok(())
}

fn build_transaction_source(
    config: &Config,
    start_time_ms: i64,
) -> anyhow::Result<Arc<dyn TransactionSource>> {
    Ok(match config.provider {
        ProviderKind::Grpc => {
            let endpoint = config
                .grpc_endpoint
                .clone()
                .context("SWAP_GRPC_ENDPOINT is required for the grpc provider")?;
            Arc::new(GrpcTransactionSource::new(
                endpoint,
                config.grpc_x_token.clone(),
                start_time_ms,
            ))
        }
        ProviderKind::WebSocket => {
            let url = config
                .websocket_url
                .clone()
                .context("SWAP_WEBSOCKET_URL is required for the websocket provider")?;
            Arc::new(WebSocketTransactionSource::new(url, start_time_ms))
        }
    })
}

/// Waits for either an interrupt (Ctrl+C) or a SIGTERM, whichever arrives
/// first, so orchestrators that send SIGTERM on container stop get the
/// same orderly shutdown path as a terminal interrupt (§5).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
