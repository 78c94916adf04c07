use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use utoipa::OpenApi;

use super::{
    dto::{
        DataListResponse, DataResponse, HistoryParams, HistoryResponse, LedCommandRequest,
        MaxTemperatureRecord, MessageResponse, MonthYear, ResetResponse, SensorRecordDto,
        StatisticsResponse, SummaryResponse,
    },
    errors::ApiError,
    summary::summarize,
    AppState,
};
use crate::{
    control::{InvalidCommand, LedCommand},
    db::models::Statistics,
    fusion::models::BroadcastSnapshot,
};

/// Page sizes `GET /api/history` accepts.
pub const HISTORY_LIMITS: [i64; 3] = [10, 50, 100];
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Clamp a raw `limit` query value to the allow-list.
pub fn history_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| HISTORY_LIMITS.contains(n))
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// Most recent records, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    params(HistoryParams),
    responses(
        (status = 200, description = "Newest records first", body = HistoryResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = history_limit(params.limit.as_deref());

    let rows = state
        .repo
        .history(limit)
        .await
        .map_err(ApiError::internal("Failed to fetch history data"))?;
    let total = state
        .repo
        .count()
        .await
        .map_err(ApiError::internal("Failed to fetch history data"))?;

    tracing::info!(limit, returned = rows.len(), total, "History request served");

    Ok(Json(HistoryResponse {
        success: true,
        count: rows.len(),
        total,
        limit,
        data: rows.into_iter().map(Into::into).collect(),
        request_time: Utc::now(),
    }))
}

/// Every stored record, newest first.
#[utoipa::path(
    get,
    path = "/api/data",
    responses(
        (status = 200, description = "All records", body = DataListResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data"
)]
pub async fn get_all_data(State(state): State<AppState>) -> Result<Json<DataListResponse>, ApiError> {
    let rows = state
        .repo
        .all()
        .await
        .map_err(ApiError::internal("Error fetching all sensor data."))?;

    Ok(Json(DataListResponse {
        success: true,
        count: rows.len(),
        total: rows.len() as i64,
        data: rows.into_iter().map(Into::into).collect(),
    }))
}

/// One stored record by id.
#[utoipa::path(
    get,
    path = "/api/data/{id}",
    params(
        ("id" = i64, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "The record", body = DataResponse),
        (status = 400, description = "Id is not an integer"),
        (status = 404, description = "No record with that id"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data"
)]
pub async fn get_data_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid ID format.".to_owned()))?;

    let row = state
        .repo
        .by_id(id)
        .await
        .map_err(ApiError::internal("Error fetching sensor data by ID."))?;

    Ok(match row {
        Some(record) => Json(DataResponse {
            success: true,
            data: Some(record.into()),
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                success: false,
                message: format!("Data with ID {id} not found."),
            }),
        )
            .into_response(),
    })
}

/// Newest stored record, or `null` when nothing has been stored yet.
#[utoipa::path(
    get,
    path = "/api/latest",
    responses(
        (status = 200, description = "Latest record", body = DataResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data"
)]
pub async fn get_latest(State(state): State<AppState>) -> Result<Json<DataResponse>, ApiError> {
    let row = state
        .repo
        .latest()
        .await
        .map_err(ApiError::internal("Error fetching latest sensor data."))?;

    Ok(Json(DataResponse {
        success: true,
        data: row.map(Into::into),
    }))
}

/// Delete every stored record and restart ids at 1. The live fused reading
/// is not touched.
#[utoipa::path(
    delete,
    path = "/api/data/reset",
    responses(
        (status = 200, description = "All records deleted", body = ResetResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data"
)]
pub async fn reset_data(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let deleted_rows = state
        .repo
        .reset()
        .await
        .map_err(ApiError::internal("Failed to reset data"))?;

    tracing::warn!(deleted_rows, "All sensor data reset");

    Ok(Json(ResetResponse {
        success: true,
        message: "All sensor data has been reset".to_owned(),
        deleted_rows,
    }))
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Temperature summary over every stored record.
#[utoipa::path(
    get,
    path = "/api/summary",
    responses(
        (status = 200, description = "Temperature summary", body = SummaryResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "aggregates"
)]
pub async fn get_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let rows = state
        .repo
        .all()
        .await
        .map_err(ApiError::internal("Failed to build summary"))?;

    Ok(Json(summarize(&rows)))
}

/// Min / max / mean per quantity, computed by the database.
#[utoipa::path(
    get,
    path = "/api/statistics",
    responses(
        (status = 200, description = "Aggregate statistics", body = StatisticsResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "aggregates"
)]
pub async fn get_statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let data = state
        .repo
        .statistics()
        .await
        .map_err(ApiError::internal("Failed to compute statistics"))?;

    Ok(Json(StatisticsResponse { success: true, data }))
}

// ---------------------------------------------------------------------------
// Live state & control
// ---------------------------------------------------------------------------

/// Current fused reading, the same shape viewers receive.
#[utoipa::path(
    get,
    path = "/api/realtime",
    responses(
        (status = 200, description = "Current fused reading", body = BroadcastSnapshot),
    ),
    tag = "realtime"
)]
pub async fn get_realtime(State(state): State<AppState>) -> Json<BroadcastSnapshot> {
    let reading = state.fusion.current().await;
    Json(BroadcastSnapshot::capture(&reading, Utc::now()))
}

/// Publish `ON` or `OFF` to the actuator command topic.
#[utoipa::path(
    post,
    path = "/api/control/led",
    request_body = LedCommandRequest,
    responses(
        (status = 200, description = "Command published", body = MessageResponse),
        (status = 400, description = "Command is not ON or OFF"),
        (status = 503, description = "Broker not connected"),
        (status = 500, description = "Publish failed"),
    ),
    tag = "control"
)]
pub async fn control_led(
    State(state): State<AppState>,
    body: Result<Json<LedCommandRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    // A body that is not JSON, or whose `command` is not a string, is just
    // another invalid command.
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected LED command body");
        ApiError::BadRequest(InvalidCommand.to_string())
    })?;

    let command: LedCommand = body
        .command
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e: InvalidCommand| ApiError::BadRequest(e.to_string()))?;

    state.control.send(command).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: format!("LED command {command} sent via MQTT."),
    }))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` plus broker and viewer state.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "broker_connected": state.control.broker_connected(),
        "viewers": state.fusion.viewer_count(),
    }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_history,
        get_all_data,
        get_data_by_id,
        get_latest,
        reset_data,
        get_summary,
        get_statistics,
        get_realtime,
        control_led,
        health,
    ),
    components(schemas(
        SensorRecordDto,
        HistoryResponse,
        DataListResponse,
        DataResponse,
        MessageResponse,
        ResetResponse,
        StatisticsResponse,
        Statistics,
        SummaryResponse,
        MaxTemperatureRecord,
        MonthYear,
        LedCommandRequest,
        BroadcastSnapshot,
    )),
    tags(
        (name = "data",       description = "Stored sensor records"),
        (name = "aggregates", description = "Summaries over stored records"),
        (name = "realtime",   description = "Live fused reading"),
        (name = "control",    description = "Actuator commands"),
        (name = "system",     description = "System endpoints"),
    ),
    info(
        title = "IoT Telemetry Dashboard API",
        version = "0.1.0",
        description = "History, summaries and actuator control for the sensor dashboard"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
