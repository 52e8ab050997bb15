//! REST API server for SimLedger
//!
//! Exposes the four ledger operations (chain length, block by index, submit
//! transaction, mine block) plus read-only diagnostics over HTTP. Callers
//! identify themselves with the `x-caller-address` header; the ledger's
//! access guard decides what they may do.

use axum::{
    extract::{Path, Query, Request, State},
    http::{self, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, SharedLedger};
use crate::crypto::{decode_hash, Address, ANONYMOUS_CALLER};
use crate::error::ChainError;
use crate::node::NodeState;
use crate::sync::{fetch_snapshot, ChainEvent, ChainEvents, ChainSnapshot};

pub const CALLER_HEADER: &str = "x-caller-address";

/// Max blocks per page on the listing endpoint
const MAX_PAGE_SIZE: u64 = 100;

/// Shared state behind every route
#[derive(Clone)]
pub struct ApiNode {
    pub ledger: SharedLedger,
    pub events: ChainEvents,
    // Optional shared orchestrator state (NodeState) for health checks and logging
    pub state: Option<Arc<RwLock<NodeState>>>,
    api_stats: Arc<RwLock<ApiStats>>,
}

#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    blocks_mined: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl ApiNode {
    pub fn new(ledger: SharedLedger) -> Self {
        Self::new_shared(ledger, ChainEvents::new(), None)
    }

    /// Build an API node over a ledger and event bus owned by the orchestrator,
    /// so both observe the same chain.
    pub fn new_shared(
        ledger: SharedLedger,
        events: ChainEvents,
        state: Option<Arc<RwLock<NodeState>>>,
    ) -> Self {
        Self {
            ledger,
            events,
            state,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            blocks_mined: stats.blocks_mined,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chain(e) => {
                let status = match e {
                    ChainError::InvalidTransaction(_) => StatusCode::BAD_REQUEST,
                    ChainError::Unauthorized(_) => StatusCode::FORBIDDEN,
                    ChainError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
                    ChainError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
                    ChainError::ChainIntegrity(_) | ChainError::StoreAdvanced { .. } => {
                        StatusCode::CONFLICT
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct SubmitTransactionRequest {
    pub payload: String,
}

#[derive(Serialize)]
pub struct SubmitTransactionResponse {
    pub message: String,
    pub pending: usize,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub blocks_mined: u64,
    pub uptime_seconds: u64,
}

#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_page() -> u64 {
    0
}
fn default_limit() -> u64 {
    10
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Reads the caller identity header. Requests without one act as the
/// anonymous caller.
fn caller_from_headers(headers: &HeaderMap) -> Result<Address, ApiError> {
    let Some(value) = headers.get(CALLER_HEADER) else {
        return Ok(ANONYMOUS_CALLER);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::InvalidInput(format!("{} must be ASCII hex", CALLER_HEADER)))?;
    decode_hash(value.trim())
        .map_err(|e| ApiError::InvalidInput(format!("Invalid {}: {}", CALLER_HEADER, e)))
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(node): State<Arc<ApiNode>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status, duration and current `NodeState` (when available).
async fn logging_middleware(
    State(node): State<Arc<ApiNode>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    let node_state = if let Some(s) = &node.state {
        format!("{:?}", *s.read().await)
    } else {
        "unknown".to_string()
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = %node_state,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<ApiNode>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![
            http::header::CONTENT_TYPE,
            http::HeaderName::from_static(CALLER_HEADER),
        ])
        .allow_credentials(true);

    let api_routes = Router::new()
        // Chain reads
        .route("/blockchain/height", get(get_chain_length))
        .route("/blockchain/blocks", get(get_blocks))
        .route("/blockchain/block/:index", get(get_block_by_index))
        .route("/blockchain/snapshot", get(get_snapshot))
        .route("/blockchain/verify", get(verify_chain))
        // Pool & mining
        .route("/transaction", post(submit_transaction))
        .route("/mempool", get(get_mempool))
        .route("/mining/mine", post(mine_block))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing and node-state
        .layer(middleware::from_fn_with_state(node.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn run_api_server(node: Arc<ApiNode>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    let state = match &node.state {
        Some(s) => Some(s.read().await.clone()),
        None => None,
    };

    let healthy = matches!(state, None | Some(NodeState::Ready));
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "node_state": state.map(|s| format!("{:?}", s)),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

async fn get_chain_length(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    let chain = node.ledger.read().await;
    Json(chain.chain_length())
}

async fn get_block_by_index(
    State(node): State<Arc<ApiNode>>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    let chain = node.ledger.read().await;
    let block = chain.get_block(index)?;
    Ok(Json(block.clone()))
}

async fn get_blocks(
    State(node): State<Arc<ApiNode>>,
    Query(params): Query<PaginationQuery>,
) -> impl IntoResponse {
    let chain = node.ledger.read().await;
    let total = chain.chain_length();

    let limit = params.limit.min(MAX_PAGE_SIZE);
    let offset = params.page.saturating_mul(limit);

    // Newest first
    let blocks: Vec<&Block> = chain
        .blocks()
        .iter()
        .rev()
        .skip(offset.min(total) as usize)
        .take(limit as usize)
        .collect();

    Json(serde_json::json!({
        "blocks": blocks,
        "total": total,
        "page": params.page,
        "limit": limit
    }))
}

async fn get_snapshot(State(node): State<Arc<ApiNode>>) -> Json<ChainSnapshot> {
    Json(fetch_snapshot(&node.ledger).await)
}

async fn verify_chain(
    State(node): State<Arc<ApiNode>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut chain = node.ledger.write().await;
    chain.audit_chain()?;
    Ok(Json(serde_json::json!({
        "valid": true,
        "length": chain.chain_length()
    })))
}

async fn get_mempool(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    let chain = node.ledger.read().await;
    let transactions = chain.mempool().get_all_transactions();
    Json(serde_json::json!({
        "count": transactions.len(),
        "transactions": transactions
    }))
}

async fn submit_transaction(
    State(node): State<Arc<ApiNode>>,
    headers: HeaderMap,
    Json(req): Json<SubmitTransactionRequest>,
) -> Result<Json<SubmitTransactionResponse>, ApiError> {
    let caller = caller_from_headers(&headers)?;

    let pending = {
        let mut chain = node.ledger.write().await;
        chain.add_transaction(&caller, req.payload)?;
        chain.pending_count()
    };

    node.api_stats.write().await.transactions_submitted += 1;
    node.events.publish(ChainEvent::TransactionAdded { pending });

    Ok(Json(SubmitTransactionResponse {
        message: "Transaction submitted successfully".to_string(),
        pending,
    }))
}

async fn mine_block(
    State(node): State<Arc<ApiNode>>,
    headers: HeaderMap,
) -> Result<Json<Block>, ApiError> {
    let caller = caller_from_headers(&headers)?;

    let block = node.ledger.write().await.mine_block(&caller)?;

    node.api_stats.write().await.blocks_mined += 1;
    node.events.publish(ChainEvent::block_mined(&block));

    Ok(Json(block))
}

async fn get_api_stats(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}
