//! Shared API response types
//!
//! This module contains common response structures used across multiple API endpoints
//! to ensure consistency and reduce code duplication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PagedResult, Session, User};

// ============================================================================
// Auth Response Types
// ============================================================================

/// Login response; the token is also set as the session cookie
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl AuthResponse {
    pub fn new(session: &Session, user: User) -> Self {
        Self {
            token: session.id.clone(),
            expires_at: session.expires_at,
            user,
        }
    }
}

// ============================================================================
// List Response Types
// ============================================================================

/// Unpaginated list
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// One page of a list
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> From<PagedResult<T>> for PaginatedResponse<T> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            page_size: result.per_page,
            total_pages,
        }
    }
}

/// Bulk delete result
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}
