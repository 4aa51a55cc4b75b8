use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{RiskLevel, SessionStatus, SessionType};
use super::user::PersonRef;

/// Clinical notes a therapist records after a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homework: Option<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

/// One scheduled or completed clinical encounter.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub assignment_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub duration: i64,
    pub session_type: SessionType,
    pub therapy: Option<String>,
    pub module: Option<String>,
    pub status: SessionStatus,
    pub location: Option<String>,
    pub notes: SessionNotes,
    pub rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session with patient/therapist references resolved for the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub patient: PersonRef,
    pub therapist: PersonRef,
    #[serde(rename = "assignment", skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub duration: i64,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub notes: SessionNotes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionView {
    pub fn new(session: Session, patient: PersonRef, therapist: PersonRef) -> Self {
        Self {
            id: session.id,
            patient,
            therapist,
            assignment_id: session.assignment_id,
            date: session.date,
            duration: session.duration,
            session_type: session.session_type,
            therapy: session.therapy,
            module: session.module,
            status: session.status,
            location: session.location,
            notes: session.notes,
            rating: session.rating,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
