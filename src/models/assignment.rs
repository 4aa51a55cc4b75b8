use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::{AssignmentPriority, AssignmentStatus};
use super::user::UserSummary;

/// One supervisor-authorized binding of a patient to a therapist.
/// At most one `active` assignment may exist per patient; the store
/// enforces this with a partial unique index.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub supervisor_id: Uuid,
    pub status: AssignmentStatus,
    pub priority: AssignmentPriority,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assignment with its user references resolved for the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: Uuid,
    pub patient: UserSummary,
    pub therapist: UserSummary,
    pub supervisor: UserSummary,
    pub status: AssignmentStatus,
    pub priority: AssignmentPriority,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignmentView {
    pub fn new(
        assignment: Assignment,
        patient: UserSummary,
        therapist: UserSummary,
        supervisor: UserSummary,
    ) -> Self {
        Self {
            id: assignment.id,
            patient,
            therapist,
            supervisor,
            status: assignment.status,
            priority: assignment.priority,
            start_date: assignment.start_date,
            end_date: assignment.end_date,
            diagnosis: assignment.diagnosis,
            treatment_plan: assignment.treatment_plan,
            notes: assignment.notes,
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
        }
    }
}
