use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

/// Emergency contact sub-record on patient profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl EmergencyContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.relationship.is_none() && self.phone.is_none()
    }
}

/// A stored user. The credential hash never leaves the server;
/// read paths go through [`User::profile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: String,
    pub is_active: bool,
    // Therapist
    pub specializations: Vec<String>,
    pub license_number: Option<String>,
    pub department: Option<String>,
    pub extension: Option<String>,
    // Patient
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: EmergencyContact,
    // Supervisor
    pub supervisor_level: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whole years since date of birth at `now`; None without a DOB.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<i64> {
        let dob = self.date_of_birth?.and_hms_opt(0, 0, 0)?.and_utc();
        Some(((now - dob).num_days() as f64 / 365.25).floor() as i64)
    }

    /// Wire view: everything except the credential, plus derived age.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            is_active: self.is_active,
            specializations: self.specializations.clone(),
            license_number: self.license_number.clone(),
            department: self.department.clone(),
            extension: self.extension.clone(),
            date_of_birth: self.date_of_birth,
            gender: self.gender.clone(),
            blood_group: self.blood_group.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            emergency_contact: self.emergency_contact.clone(),
            supervisor_level: self.supervisor_level.clone(),
            age: self.age_at(Utc::now()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Abbreviated reference for resolved patient/therapist/supervisor
    /// fields on other records. Only role-relevant extras are carried.
    pub fn summary(&self) -> UserSummary {
        let mut summary = UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            specializations: Vec::new(),
            department: None,
            extension: None,
            phone: None,
            gender: None,
            date_of_birth: None,
        };
        match self.role {
            Role::Therapist => {
                summary.specializations = self.specializations.clone();
                summary.department = self.department.clone();
                summary.extension = self.extension.clone();
            }
            Role::Patient => {
                summary.phone = self.phone.clone();
                summary.gender = self.gender.clone();
                summary.date_of_birth = self.date_of_birth;
            }
            Role::Supervisor => {}
        }
        summary
    }

    /// Minimal reference used on session rows.
    pub fn person_ref(&self) -> PersonRef {
        PersonRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Full user as sent to clients. `age` is computed at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specializations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "EmergencyContact::is_empty")]
    pub emergency_contact: EmergencyContact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_level: Option<String>,
    pub age: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolved reference to a user on assignment rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specializations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

/// Resolved reference to a user on session rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn patient(dob: Option<NaiveDate>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Aarav Sharma".into(),
            email: "aarav.sharma@gmail.com".into(),
            password_hash: "x".into(),
            role: Role::Patient,
            avatar: String::new(),
            is_active: true,
            specializations: Vec::new(),
            license_number: None,
            department: None,
            extension: None,
            date_of_birth: dob,
            gender: Some("Male".into()),
            blood_group: None,
            phone: Some("9876543210".into()),
            address: None,
            emergency_contact: EmergencyContact::default(),
            supervisor_level: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn age_is_floor_of_fractional_years() {
        let user = patient(NaiveDate::from_ymd_opt(1997, 3, 14));
        let now = Utc.with_ymd_and_hms(2026, 8, 21, 12, 0, 0).unwrap();
        assert_eq!(user.age_at(now), Some(29));
    }

    #[test]
    fn age_none_without_dob() {
        let user = patient(None);
        assert_eq!(user.age_at(Utc::now()), None);
    }

    #[test]
    fn profile_excludes_credential() {
        let user = patient(NaiveDate::from_ymd_opt(1997, 3, 14));
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "aarav.sharma@gmail.com");
        assert!(json["age"].is_i64());
    }

    #[test]
    fn summary_carries_role_relevant_fields_only() {
        let user = patient(NaiveDate::from_ymd_opt(1997, 3, 14));
        let json = serde_json::to_value(user.summary()).unwrap();
        assert_eq!(json["phone"], "9876543210");
        assert!(json.get("specializations").is_none());

        let mut therapist = patient(None);
        therapist.role = Role::Therapist;
        therapist.specializations = vec!["CBT".into()];
        therapist.phone = Some("2045".into());
        let json = serde_json::to_value(therapist.summary()).unwrap();
        assert_eq!(json["specializations"][0], "CBT");
        assert!(json.get("phone").is_none());
    }
}
