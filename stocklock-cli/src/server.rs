use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use stocklock_core::{StockService, StoreError};

use crate::handlers::*;

pub type AppState = Arc<StockService>;

/// Singular `/product` paths are what load-test clients call; the plural
/// forms are aliases.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health is always open (no auth)
        .route("/health", get(health))
        .route("/product", get(list_products).delete(clear_products))
        .route("/product/reset", post(reset_products))
        .route("/product/{id}", get(get_product))
        .route("/product/{id}/deduct", post(deduct_stock))
        .route("/products", get(list_products).delete(clear_products))
        .route("/products/reset", post(reset_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/deduct", post(deduct_stock))
        .layer(middleware::from_fn(auth_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(host: &str, port: u16, service: StockService) {
    let state: AppState = Arc::new(service);
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", host, port);

    if std::env::var("STOCKLOCK_API_KEY").is_ok() {
        tracing::info!("🔐 API key authentication enabled");
    } else {
        tracing::warn!("⚠️  No STOCKLOCK_API_KEY set, server is open (dev mode)");
    }

    tracing::info!(
        nodes = state.locks().node_count(),
        quorum = state.locks().quorum(),
        "🔒 stocklock server starting on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    state.locks().close();
    tracing::info!("Lock manager closed, bye");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

// ─── Auth Middleware ────────────────────────────────────────────────────────

async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // If no API key is configured, allow all requests (dev mode)
    let expected_key = match std::env::var("STOCKLOCK_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => return Ok(next.run(request).await),
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth_header.strip_prefix("Bearer ").unwrap_or("");

    if token == expected_key {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("🚫 Unauthorized request to {}", request.uri().path());
        Err(StatusCode::UNAUTHORIZED)
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────────

// The core is synchronous and may sleep between lock retries, so every call
// into it runs on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    T: Send + 'static,
    F: FnOnce(&StockService) -> T + Send + 'static,
{
    let service = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            tracing::error!("Blocking task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn store_failure<T: serde::Serialize>(err: StoreError) -> (StatusCode, Json<ApiResponse<T>>) {
    (store_status(&err), Json(ApiResponse::err(err.to_string())))
}

fn task_failure<T: serde::Serialize>(status: StatusCode) -> (StatusCode, Json<ApiResponse<T>>) {
    (status, Json(ApiResponse::err("internal error")))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let result = blocking(&state, |service| {
        let locks = service.locks();
        (locks.health(), locks.quorum(), locks.stats())
    })
    .await;

    let (nodes, quorum, stats) = match result {
        Ok(snapshot) => snapshot,
        Err(status) => return task_failure(status),
    };

    let healthy = nodes.iter().filter(|n| n.healthy).count();
    let (status, code) = if healthy >= quorum {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(ApiResponse::ok(HealthResponse {
            status: status.to_string(),
            quorum,
            nodes,
            locks: stats,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })),
    )
}

async fn list_products(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<ProductResponse>>>) {
    match blocking(&state, |service| service.list()).await {
        Ok(Ok(products)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                products.into_iter().map(ProductResponse::from).collect(),
            )),
        ),
        Ok(Err(e)) => store_failure(e),
        Err(status) => task_failure(status),
    }
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<ApiResponse<ProductResponse>>) {
    match blocking(&state, move |service| service.get(id)).await {
        Ok(Ok(product)) => (StatusCode::OK, Json(ApiResponse::ok(product.into()))),
        Ok(Err(e)) => store_failure(e),
        Err(status) => task_failure(status),
    }
}

async fn reset_products(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<ProductResponse>>) {
    match blocking(&state, |service| service.reset_products()).await {
        Ok(Ok(product)) => (StatusCode::CREATED, Json(ApiResponse::ok(product.into()))),
        Ok(Err(e)) => store_failure(e),
        Err(status) => task_failure(status),
    }
}

async fn clear_products(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<String>>) {
    match blocking(&state, |service| service.clear_products()).await {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(ApiResponse::ok("All products cleared".to_string())),
        ),
        Ok(Err(e)) => store_failure(e),
        Err(status) => task_failure(status),
    }
}

async fn deduct_stock(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<DeductRequest>,
) -> (StatusCode, Json<ApiResponse<ProductResponse>>) {
    if let Err(e) = req.validate() {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e)));
    }

    let quantity = req.quantity;
    match blocking(&state, move |service| service.deduct(id, quantity)).await {
        Ok(Ok(product)) => {
            tracing::info!(id, quantity, remaining = product.value, "Stock deducted");
            (StatusCode::CREATED, Json(ApiResponse::ok(product.into())))
        }
        Ok(Err(e)) => {
            let status = deduct_status(&e);
            tracing::info!(id, quantity, status = status.as_u16(), error = %e, "Deduction rejected");
            (status, Json(ApiResponse::err(e.to_string())))
        }
        Err(status) => task_failure(status),
    }
}
