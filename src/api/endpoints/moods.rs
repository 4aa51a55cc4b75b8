//! Mood log endpoints.
//!
//! `POST /api/moods` — patients append a self-report
//! `GET /api/moods` — history plus the trailing-week average; staff
//! pass `?patientId=`, patients always read their own log

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_role;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository;
use crate::models::mood::weekly_average;
use crate::models::{MoodEntry, Role};

/// Entries fetched per history read; the weekly average is computed
/// over this window.
const HISTORY_LIMIT: u32 = 30;

#[derive(Serialize)]
pub struct MoodEntryResponse {
    pub success: bool,
    pub entry: MoodEntry,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodListResponse {
    pub success: bool,
    pub moods: Vec<MoodEntry>,
    pub weekly_avg: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMoodRequest {
    pub mood: Option<String>,
    pub score: Option<i64>,
    pub emoji: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodHistoryQuery {
    pub patient_id: Option<String>,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Json(request): Json<CreateMoodRequest>,
) -> Result<(StatusCode, Json<MoodEntryResponse>), ApiError> {
    require_role(&caller, &[Role::Patient])?;

    let mood = request
        .mood
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::Validation("Mood is required.".to_string()))?;
    if let Some(score) = request.score {
        if !(1..=10).contains(&score) {
            return Err(ApiError::Validation(
                "Score must be between 1 and 10.".to_string(),
            ));
        }
    }

    let entry = MoodEntry {
        id: Uuid::new_v4(),
        patient_id: caller.id,
        mood: mood.to_string(),
        score: request.score,
        emoji: request.emoji,
        note: request.note,
        triggers: request.triggers,
        activities: request.activities,
        created_at: Utc::now(),
    };

    let conn = ctx.open_db()?;
    repository::insert_mood(&conn, &entry)?;

    Ok((
        StatusCode::CREATED,
        Json(MoodEntryResponse {
            success: true,
            entry,
        }),
    ))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Query(query): Query<MoodHistoryQuery>,
) -> Result<Json<MoodListResponse>, ApiError> {
    let conn = ctx.open_db()?;

    // Patients always read their own log; the query parameter only
    // means something to staff.
    let patient_id = match caller.role {
        Role::Patient => caller.id,
        _ => {
            let raw = query
                .patient_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::Validation("Patient ID required.".to_string()))?;
            super::resolve_role_user(&conn, Some(raw), Role::Patient, "Patient not found.")?.id
        }
    };

    let moods = repository::list_moods_for_patient(&conn, patient_id, HISTORY_LIMIT)?;
    let weekly_avg = weekly_average(&moods, Utc::now());

    Ok(Json(MoodListResponse {
        success: true,
        moods,
        weekly_avg,
    }))
}
