//! Class roster and attendance API for rollcall
//!
//! Provides read access to classes and students and batched attendance writes:
//! - GET /health, /classes, /classes/{id}, /classes/{id}/students
//! - GET /students, /students/{id}
//! - POST /attendance/submit (plain insert), /attendance/sync (upsert)

pub mod handlers;
pub mod route;
pub mod storage;

use axum::Router;
use std::sync::Arc;

pub use handlers::{handle_request, DateZone, RosterState, DEFAULT_MAX_BODY_BYTES};
pub use storage::{RosterStore, StoreError, WriteMode};

/// Build the roster router. Every path goes through [`handle_request`], which
/// does its own path matching.
pub fn router(state: Arc<RosterState>) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}
