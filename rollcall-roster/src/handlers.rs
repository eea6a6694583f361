//! HTTP handlers for the roster API

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{Local, Utc};
use http_body_util::LengthLimitError;
use rollcall_core::ApiError;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::route::{PathMatch, Route};
use crate::storage::{AttendanceRecord, RosterStore, StoreError};

/// Default cap on attendance batch bodies
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Which calendar "today" means when a record arrives without a date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DateZone {
    #[default]
    Utc,
    Local,
}

impl DateZone {
    /// Current date as `YYYY-MM-DD`
    pub fn today(&self) -> String {
        let date = match self {
            Self::Utc => Utc::now().date_naive(),
            Self::Local => Local::now().date_naive(),
        };
        date.format("%Y-%m-%d").to_string()
    }
}

impl FromStr for DateZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown date zone '{other}', expected 'utc' or 'local'")),
        }
    }
}

impl TryFrom<String> for DateZone {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// State for roster handlers
pub struct RosterState {
    pub store: Arc<RosterStore>,
    pub date_zone: DateZone,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
}

impl RosterState {
    pub fn new(store: RosterStore, date_zone: DateZone) -> Self {
        Self {
            store: Arc::new(store),
            date_zone,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Handle every roster request: resolve the path, then run the matching query.
pub async fn handle_request(
    State(state): State<Arc<RosterState>>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Response {
    let path = PathMatch::parse(uri.path());
    let route = match Route::resolve(&method, &path) {
        Ok(route) => route,
        Err(e) => {
            debug!(method = %method, path = %uri.path(), error = %e, "Unrouted request");
            return error_response(&e);
        }
    };

    debug!(method = %method, path = %uri.path(), route = ?route, "Roster request");

    match dispatch(&state, route, body).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

async fn dispatch(state: &RosterState, route: Route, body: Body) -> Result<Response, ApiError> {
    let response = match route {
        Route::Health => json_response(
            StatusCode::OK,
            &json!({ "status": "OK", "message": "Server is running" }),
        ),
        Route::ListClasses => {
            let classes = with_store(state, |store| store.list_classes()).await?;
            json_response(StatusCode::OK, &classes)
        }
        Route::GetClass(id) => {
            let class = with_store(state, move |store| store.get_class(&id))
                .await?
                .ok_or_else(|| ApiError::not_found("Class not found"))?;
            json_response(StatusCode::OK, &class)
        }
        Route::ListClassStudents(id) => {
            let students = with_store(state, move |store| store.list_class_students(&id)).await?;
            json_response(StatusCode::OK, &students)
        }
        Route::ListStudents => {
            let students = with_store(state, |store| store.list_students()).await?;
            json_response(StatusCode::OK, &students)
        }
        Route::GetStudent(id) => {
            let student = with_store(state, move |store| store.get_student(&id))
                .await?
                .ok_or_else(|| ApiError::not_found("Student not found"))?;
            json_response(StatusCode::OK, &student)
        }
        Route::WriteAttendance(mode) => {
            let body = read_body(body, state.max_body_bytes).await.map_err(|e| {
                warn!(mode = mode.as_str(), error = %e, "Rejected attendance batch: unreadable body");
                e
            })?;
            let records = parse_batch(&body, state.date_zone).map_err(|e| {
                warn!(mode = mode.as_str(), "Rejected attendance batch: invalid body");
                e
            })?;
            let count = with_store(state, move |store| store.write_attendance(mode, &records))
                .await?;
            info!(mode = mode.as_str(), count, "Attendance records saved");
            json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": "Attendance records saved successfully" }),
            )
        }
    };

    Ok(response)
}

/// Run a store call on the blocking pool. Store errors become 500s carrying
/// the underlying message; a panicked or cancelled task is a server error.
async fn with_store<T, F>(state: &RosterState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&RosterStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || op(&store)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(error = %e, "Store operation failed");
            Err(ApiError::store(e))
        }
        Err(e) => {
            error!(error = %e, "Store task failed");
            Err(ApiError::internal(e))
        }
    }
}

/// Buffer the request body up to `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let source = e.into_inner();
        if source.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::payload_too_large(limit)
        } else {
            ApiError::invalid_input(format!("Failed to read request body: {source}"))
        }
    })
}

/// Validate the batch body shape and turn each record into store values.
///
/// Only the shape is checked here: the body must be an object whose `records`
/// is an array of objects. Field contents are left to the store.
fn parse_batch(body: &[u8], date_zone: DateZone) -> Result<Vec<AttendanceRecord>, ApiError> {
    let invalid = || ApiError::invalid_input("Invalid data format");

    let input: Value = serde_json::from_slice(body).map_err(|_| invalid())?;
    let Some(Value::Array(records)) = input.get("records") else {
        return Err(invalid());
    };

    let today = date_zone.today();
    records
        .iter()
        .map(|record| {
            let Value::Object(fields) = record else {
                return Err(invalid());
            };
            let date_recorded = match fields.get("date_recorded") {
                None | Some(Value::Null) => SqlValue::Text(today.clone()),
                Some(date) => sql_value(Some(date)),
            };
            Ok(AttendanceRecord {
                student_id: sql_value(fields.get("student_id")),
                class_id: sql_value(fields.get("class_id")),
                status: sql_value(fields.get("status")),
                date_recorded,
            })
        })
        .collect()
}

fn sql_value(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

// === Helpers ===

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => (status, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => error_response(&ApiError::internal(e)),
    }
}

fn error_response(error: &ApiError) -> Response {
    let status = StatusCode::from_u16(error.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        error.to_json(),
    )
        .into_response()
}
