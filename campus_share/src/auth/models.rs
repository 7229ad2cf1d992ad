//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::de;

/// User ID type
pub type UserId = Uuid;

/// Account tier. Every registration starts as a student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// User model. The password hash lives in [`Credentials`] and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub student_id: String,
    pub phone: String,
    pub is_hosteller: bool,
    pub hostel: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub consent_for_contact: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Stored user together with its password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Public identity embedded in resources and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    #[serde(rename = "user_id")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// Fields that must be unique across all users.
#[derive(Debug, Clone, Default)]
pub struct IdentityKeys {
    pub email: Option<String>,
    pub username: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
}

/// Registration request. Required fields are optional at the wire so that a
/// missing field is reported as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub is_hosteller: Option<bool>,
    pub hostel: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    pub department: Option<String>,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub consent_for_contact: Option<bool>,
}

/// User login request. `email` may hold an email, username, student ID or phone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "identifier")]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub department: Option<String>,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub year: Option<i32>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub is_hosteller: Option<bool>,
    pub hostel: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub consent_for_contact: Option<bool>,
}

/// New user row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub student_id: String,
    pub phone: String,
    pub is_hosteller: bool,
    pub hostel: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub consent_for_contact: bool,
}

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub student_id: String,
    pub iat: i64, // Issued at timestamp
    pub exp: i64, // Expiration timestamp
}

/// Identity encoded into a token.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub student_id: String,
}

impl From<&User> for TokenIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            student_id: user.student_id.clone(),
        }
    }
}

/// Issued token plus the identity it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}
