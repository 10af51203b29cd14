use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Clinic roles recognised by the scheduling services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Supabase sets `role` to "authenticated" unless a clinic role is
    /// present, so fall back to `user_metadata.role`.
    pub fn clinic_role(&self) -> Option<Role> {
        self.role
            .as_deref()
            .and_then(Role::parse)
            .or_else(|| {
                self.metadata
                    .as_ref()
                    .and_then(|m| m.get("role"))
                    .and_then(|r| r.as_str())
                    .and_then(Role::parse)
            })
    }
}

/// Authenticated identity handed to the scheduling services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(role: Option<&str>, metadata: Option<serde_json::Value>) -> User {
        User {
            id: "u1".to_string(),
            email: None,
            role: role.map(str::to_string),
            metadata,
            created_at: None,
        }
    }

    #[test]
    fn test_role_from_claim() {
        assert_eq!(user(Some("Doctor"), None).clinic_role(), Some(Role::Doctor));
        assert_eq!(user(Some("admin"), None).clinic_role(), Some(Role::Admin));
    }

    #[test]
    fn test_role_from_metadata_when_claim_is_generic() {
        let u = user(Some("authenticated"), Some(json!({ "role": "patient" })));
        assert_eq!(u.clinic_role(), Some(Role::Patient));
    }

    #[test]
    fn test_unknown_role() {
        assert_eq!(user(Some("nurse"), None).clinic_role(), None);
        assert_eq!(user(None, None).clinic_role(), None);
    }
}
