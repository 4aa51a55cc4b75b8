use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the same string table, so wire values and
/// storage values agree (several variants are hyphenated).
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Therapist => "therapist",
    Supervisor => "supervisor",
});

str_enum!(AssignmentStatus {
    Active => "active",
    Completed => "completed",
    Transferred => "transferred",
    Cancelled => "cancelled",
});

str_enum!(AssignmentPriority {
    Normal => "normal",
    Urgent => "urgent",
    Critical => "critical",
});

str_enum!(SessionType {
    Individual => "individual",
    Group => "group",
    Family => "family",
    Assessment => "assessment",
    FollowUp => "follow-up",
});

str_enum!(SessionStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no-show",
});

str_enum!(RiskLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for (variant, s) in [
            (Role::Patient, "patient"),
            (Role::Therapist, "therapist"),
            (Role::Supervisor, "supervisor"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Role::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn assignment_status_round_trip() {
        for (variant, s) in [
            (AssignmentStatus::Active, "active"),
            (AssignmentStatus::Completed, "completed"),
            (AssignmentStatus::Transferred, "transferred"),
            (AssignmentStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AssignmentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn session_enums_round_trip() {
        for (variant, s) in [
            (SessionType::Individual, "individual"),
            (SessionType::Group, "group"),
            (SessionType::Family, "family"),
            (SessionType::Assessment, "assessment"),
            (SessionType::FollowUp, "follow-up"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(SessionType::from_str(s).unwrap(), variant);
        }
        for (variant, s) in [
            (SessionStatus::Scheduled, "scheduled"),
            (SessionStatus::Completed, "completed"),
            (SessionStatus::Cancelled, "cancelled"),
            (SessionStatus::NoShow, "no-show"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(SessionStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_wire_strings() {
        assert_eq!(
            serde_json::to_value(SessionType::FollowUp).unwrap(),
            serde_json::json!("follow-up")
        );
        assert_eq!(
            serde_json::to_value(SessionStatus::NoShow).unwrap(),
            serde_json::json!("no-show")
        );
        let role: Role = serde_json::from_str("\"therapist\"").unwrap();
        assert_eq!(role, Role::Therapist);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Role::from_str("admin").is_err());
        assert!(AssignmentStatus::from_str("archived").is_err());
        assert!(RiskLevel::from_str("").is_err());
        let result: Result<AssignmentPriority, _> = serde_json::from_str("\"severe\"");
        assert!(result.is_err());
    }
}
