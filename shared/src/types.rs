use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ========== USER ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// Roster roles are free text; only an exact `admin` grants admin rights
    pub fn from_roster(raw: &str) -> Self {
        if raw.trim() == "admin" {
            Role::Admin
        } else {
            Role::Member
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub role: Role,
}

// ========== SESSION ==========
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub role: Role,
    pub attributed_name: Option<String>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignedInUser {
    pub email: String,
    pub role: Role,
    pub name: Option<String>,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub success: bool,
    pub user: SignedInUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub email: String,
    pub role: Role,
    pub name: Option<String>,
}

impl From<&Session> for SessionUser {
    fn from(session: &Session) -> Self {
        Self {
            email: session.email.clone(),
            role: session.role,
            name: session.attributed_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ========== ANALYTICS ==========
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryAnalytics {
    pub total_submissions: usize,
    pub unique_members: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub changed_count: usize,
    pub most_common_mistake: Option<String>,
    pub reviewer_with_most_rejected: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PersonAnalytics {
    #[serde(flatten)]
    pub summary: SummaryAnalytics,
    pub total_submitted: usize,
    pub changed_by_leader: usize,
    pub leader_reviewed: usize,
    pub fully_aligned: usize,
    pub misaligned: usize,
    pub last_submission: Option<String>,
    pub mistake_reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TaskTypeRejection {
    pub task_type: String,
    pub accepted: usize,
    pub rejected: usize,
    pub total: usize,
    pub rejection_rate: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TrendPoint {
    pub date: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_role_mapping() {
        assert_eq!(Role::from_roster("admin"), Role::Admin);
        assert_eq!(Role::from_roster(" admin\t"), Role::Admin);
        assert_eq!(Role::from_roster("member"), Role::Member);
        // anything but an exact `admin` is a member
        assert_eq!(Role::from_roster("Admin"), Role::Member);
        assert_eq!(Role::from_roster("lead"), Role::Member);
        assert_eq!(Role::from_roster(""), Role::Member);
    }

    #[test]
    fn test_roster_roles_serialize_as_stored() {
        assert_eq!(serde_json::to_value(Role::from_roster("admin")).unwrap(), "admin");
        assert_eq!(serde_json::to_value(Role::from_roster("member")).unwrap(), "member");
        assert_eq!(serde_json::to_value(Role::from_roster("lead")).unwrap(), "member");
    }
}
