//! The Quote/Swap API (F, §4.6): the HTTP surface that consults the Price
//! Index (D) and the Builder Registry (E) to answer quote requests and
//! assemble unsigned swap transactions, falling back to the External Price
//! Fallback (G) on a cache miss.

pub mod blockhash;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

pub use blockhash::{BlockhashProvider, RpcBlockhashProvider};
pub use error::ApiError;
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the axum router for the Quote/Swap API: `GET /health`,
/// `GET /api/quote/:mint`, `POST /api/swap/:mint`, with request tracing
/// layered on (ambient logging, carried regardless of the spec's
/// Non-goals around metrics/dashboards — §9).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/quote/{mint}", get(handlers::get_quote))
        .route("/api/swap/{mint}", post(handlers::post_swap))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockhash::FixedBlockhashProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use solana_sdk::{hash::Hash, pubkey::Pubkey};
    use std::collections::HashSet;
    use std::sync::Arc;
    use swap_cache::PriceIndex;
    use swap_execution::BuilderRegistry;
    use swap_instrument::Observation;
    use tower::ServiceExt;

    fn observation(mint: Pubkey, program_id: Pubkey) -> Observation {
        Observation {
            mint,
            pool: Pubkey::new_unique(),
            avg_price: 2000.0,
            program_id,
            slot: "42".into(),
            stored_at_ms: 0,
            last_access_ms: 0,
        }
    }

    fn test_state() -> (AppState, Pubkey, Pubkey) {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let mut whitelist = HashSet::new();
        whitelist.insert(program);
        let index = PriceIndex::new(10_000_000, whitelist);
        index.put(observation(mint, program)).unwrap();

        let registry = Arc::new(BuilderRegistry::new());
        let blockhash_provider = Arc::new(FixedBlockhashProvider(Hash::default()));

        (
            AppState::new(index, registry, None, blockhash_provider),
            mint,
            program,
        )
    }

    #[tokio::test]
    async fn health_reports_uptime() {
        let (state, _, _) = test_state();
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn quote_returns_cached_price() {
        let (state, mint, _) = test_state();
        let router = build_router(state);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/api/quote/{mint}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["quote"]["avgPrice"], 2000.0);
    }

    #[tokio::test]
    async fn quote_for_unknown_mint_is_404() {
        let (state, _, _) = test_state();
        let router = build_router(state);
        let unknown = Pubkey::new_unique();

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/api/quote/{unknown}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn swap_for_unregistered_program_is_400_with_supported_list() {
        let (state, mint, _program) = test_state();
        let router = build_router(state);

        let body = serde_json::json!({
            "signer": "11111111111111111111111111111111111111111",
            "type": "buy",
            "amountIn": 1_000_000,
            "slippage": 5000,
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/swap/{mint}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["supportedProtocols"].is_array());
    }

    #[tokio::test]
    async fn swap_rejects_invalid_slippage() {
        let (state, mint, _) = test_state();
        let router = build_router(state);

        let body = serde_json::json!({
            "signer": "11111111111111111111111111111111111111111",
            "type": "buy",
            "amountIn": 1_000_000,
            "slippage": 1,
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/swap/{mint}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn swap_for_unknown_mint_with_no_override_is_404() {
        let (state, _, _) = test_state();
        let router = build_router(state);
        let unknown = Pubkey::new_unique();

        let body = serde_json::json!({
            "signer": "11111111111111111111111111111111111111111",
            "type": "buy",
            "amountIn": 1_000_000,
            "slippage": 5000,
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/swap/{unknown}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
