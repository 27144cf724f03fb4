use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use stocklock_core::types::{Counter, ManagerStats, NodeHealth};
use stocklock_core::{DeductError, StoreError};

// ─── Request Types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DeductRequest {
    pub quantity: u64,
}

impl DeductRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity == 0 {
            return Err("quantity must be greater than 0".to_string());
        }
        Ok(())
    }
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: u64,
    pub name: String,
    pub stock: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<Counter> for ProductResponse {
    fn from(counter: Counter) -> Self {
        Self {
            id: counter.id,
            name: counter.name,
            stock: counter.value,
            created_at: counter.created_at,
            updated_at: counter.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub quorum: usize,
    pub nodes: Vec<NodeHealth>,
    pub locks: ManagerStats,
    pub version: String,
}

// ─── Status Mapping ─────────────────────────────────────────────────────────

pub fn deduct_status(err: &DeductError) -> StatusCode {
    match err {
        DeductError::InvalidQuantity => StatusCode::BAD_REQUEST,
        DeductError::NotFound(_) => StatusCode::NOT_FOUND,
        DeductError::InsufficientStock { .. } => StatusCode::CONFLICT,
        DeductError::LockUnavailable(_) | DeductError::LeaseExpired(_) => StatusCode::LOCKED,
        DeductError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::StaleWrite { .. } => StatusCode::CONFLICT,
        StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
