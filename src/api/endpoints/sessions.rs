//! Session endpoints.
//!
//! `GET /api/sessions` — listing scoped to the caller, filterable by
//! status and calendar day
//! `GET /api/sessions/today` — the caller's sessions for today
//! `POST /api/sessions` — schedule a session
//! `PUT /api/sessions/:id` — status/notes updates and patient ratings

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_role;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository::{self, SessionFilter, SessionPatch};
use crate::models::{
    Role, Session, SessionNotes, SessionStatus, SessionType, SessionView,
};

const SESSION_MISSING: &str = "Session not found.";

#[derive(Serialize)]
pub struct SessionListResponse {
    pub success: bool,
    pub count: usize,
    pub sessions: Vec<SessionView>,
}

#[derive(Serialize)]
pub struct TodaySessionsResponse {
    pub success: bool,
    pub sessions: Vec<SessionView>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub status: Option<SessionStatus>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub patient_id: Option<String>,
    pub therapist_id: Option<String>,
    pub date: Option<chrono::DateTime<Utc>>,
    pub duration: Option<i64>,
    #[serde(rename = "type")]
    pub session_type: Option<SessionType>,
    pub therapy: Option<String>,
    pub module: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub status: Option<SessionStatus>,
    pub notes: Option<SessionNotes>,
    pub rating: Option<i64>,
}

/// Restrict a filter to what the caller is allowed to see.
fn scope_filter(filter: &mut SessionFilter, caller: &AuthedUser) {
    match caller.role {
        Role::Patient => filter.patient_id = Some(caller.id),
        Role::Therapist => filter.therapist_id = Some(caller.id),
        Role::Supervisor => {}
    }
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let mut filter = SessionFilter {
        status: query.status,
        ..SessionFilter::default()
    };
    scope_filter(&mut filter, &caller);

    if let Some(raw) = query.date.as_deref() {
        let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| ApiError::Validation("Invalid date filter.".to_string()))?;
        let (start, end) = repository::day_bounds_for(day, Utc::now());
        filter.from = Some(start);
        filter.until = Some(end);
    }

    let conn = ctx.open_db()?;
    let sessions = repository::list_session_views(&conn, &filter)?;

    Ok(Json(SessionListResponse {
        success: true,
        count: sessions.len(),
        sessions,
    }))
}

pub async fn today(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<TodaySessionsResponse>, ApiError> {
    let (start, end) = repository::local_day_bounds(Utc::now());
    let mut filter = SessionFilter {
        from: Some(start),
        until: Some(end),
        ..SessionFilter::default()
    };
    scope_filter(&mut filter, &caller);

    let conn = ctx.open_db()?;
    let sessions = repository::list_session_views(&conn, &filter)?;

    Ok(Json(TodaySessionsResponse {
        success: true,
        sessions,
    }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    require_role(&caller, &[Role::Therapist, Role::Supervisor])?;

    if request
        .patient_id
        .as_deref()
        .map_or(true, |id| id.trim().is_empty())
    {
        return Err(ApiError::Validation("Patient ID is required.".to_string()));
    }
    let date = request
        .date
        .ok_or_else(|| ApiError::Validation("Session date is required.".to_string()))?;

    // Therapists schedule for themselves by default; supervisors must
    // say which therapist the session belongs to.
    let therapist_raw = match (request.therapist_id.as_deref(), caller.role) {
        (Some(id), _) if !id.trim().is_empty() => id.to_string(),
        (_, Role::Therapist) => caller.id.to_string(),
        _ => {
            return Err(ApiError::Validation(
                "Therapist ID is required.".to_string(),
            ))
        }
    };

    let conn = ctx.open_db()?;
    let patient = super::resolve_role_user(
        &conn,
        request.patient_id.as_deref(),
        Role::Patient,
        "Patient not found.",
    )?;
    let therapist = super::resolve_role_user(
        &conn,
        Some(&therapist_raw),
        Role::Therapist,
        "Therapist not found.",
    )?;

    let assignment_id = repository::get_active_assignment_for_patient(&conn, patient.id)?
        .map(|assignment| assignment.id);

    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        therapist_id: therapist.id,
        assignment_id,
        date,
        duration: request.duration.unwrap_or(50),
        session_type: request.session_type.unwrap_or(SessionType::Individual),
        therapy: request.therapy,
        module: request.module,
        status: SessionStatus::Scheduled,
        location: request.location,
        notes: SessionNotes::default(),
        rating: None,
        created_at: now,
        updated_at: now,
    };
    repository::insert_session(&conn, &session)?;

    tracing::info!(
        session_id = %session.id,
        patient = %patient.name,
        therapist = %therapist.name,
        date = %session.date,
        "session scheduled"
    );

    let view = SessionView::new(session, patient.person_ref(), therapist.person_ref());
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            success: true,
            session: view,
        }),
    ))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let session_id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::NotFound(SESSION_MISSING.to_string()))?;
    let session = repository::get_session(&conn, session_id)?
        .ok_or_else(|| ApiError::NotFound(SESSION_MISSING.to_string()))?;

    // Sessions outside the caller's scope read as missing, not as
    // forbidden, so ids cannot be probed.
    match caller.role {
        Role::Patient if session.patient_id != caller.id => {
            return Err(ApiError::NotFound(SESSION_MISSING.to_string()))
        }
        Role::Therapist if session.therapist_id != caller.id => {
            return Err(ApiError::NotFound(SESSION_MISSING.to_string()))
        }
        _ => {}
    }

    if !request.rating.map_or(true, |rating| (1..=5).contains(&rating)) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5.".to_string(),
        ));
    }

    let patch = match caller.role {
        // Patients rate their sessions; everything else they send is
        // dropped on the floor.
        Role::Patient => {
            if request.rating.is_none() {
                return Err(ApiError::Validation(
                    "Rating must be between 1 and 5.".to_string(),
                ));
            }
            SessionPatch {
                rating: request.rating,
                ..SessionPatch::default()
            }
        }
        Role::Therapist => SessionPatch {
            status: request.status,
            notes: request.notes,
            ..SessionPatch::default()
        },
        Role::Supervisor => SessionPatch {
            status: request.status,
            notes: request.notes,
            rating: request.rating,
        },
    };

    repository::update_session(&conn, session_id, &patch)?
        .ok_or_else(|| ApiError::NotFound(SESSION_MISSING.to_string()))?;
    let view = repository::session_view(&conn, session_id)?
        .ok_or_else(|| ApiError::NotFound(SESSION_MISSING.to_string()))?;

    Ok(Json(SessionResponse {
        success: true,
        session: view,
    }))
}
