//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Full user row from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Hashed password (argon2)
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// Public representation of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
        }
    }
}

/// Account as seen by administrators
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDetails {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserDetails {
    fn from(user: User) -> Self {
        UserDetails {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: user.date_joined,
        }
    }
}

/// Self-registration request. Privilege flags are not part of the payload,
/// so any `is_staff` / `is_superuser` sent by the client is dropped.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub last_name: String,
}

/// Fields an account holder may change on their own profile
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub last_name: Option<String>,
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub password: Option<String>,
}

/// Full profile replacement (`PUT /users/me`)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplaceProfile {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub last_name: String,
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub password: String,
}

impl From<ReplaceProfile> for UpdateProfile {
    fn from(profile: ReplaceProfile) -> Self {
        UpdateProfile {
            email: Some(profile.email),
            first_name: Some(profile.first_name),
            last_name: Some(profile.last_name),
            password: Some(profile.password),
        }
    }
}

/// Administrative account update
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminUpdateUser {
    #[serde(flatten)]
    pub profile: UpdateProfile,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Admin user listing filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Case-insensitive email substring
    #[serde(rename = "email__icontains")]
    pub email_icontains: Option<String>,
}

/// Lower-case the domain part of an email, leaving the local part intact
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_only_the_domain() {
        assert_eq!(normalize_email("Alice@Example.COM"), "Alice@example.com");
        assert_eq!(normalize_email("  bob@example.com "), "bob@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn register_ignores_privilege_flags() {
        let request: RegisterUser = serde_json::from_value(serde_json::json!({
            "email": "bob@example.com",
            "first_name": "Bob",
            "last_name": "Builder",
            "password": "StrongPass123",
            "is_staff": true,
            "is_superuser": true
        }))
        .unwrap();
        assert_eq!(request.email, "bob@example.com");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn register_requires_eight_character_password() {
        let request = RegisterUser {
            email: "short@example.com".to_string(),
            password: "1234567".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn register_rejects_bad_email_and_long_names() {
        let request = RegisterUser {
            email: "not-an-email".to_string(),
            password: "StrongPass123".to_string(),
            first_name: "x".repeat(21),
            last_name: String::new(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("first_name"));
    }

    #[test]
    fn profile_update_validates_only_present_fields() {
        assert!(UpdateProfile::default().validate().is_ok());
        let short = UpdateProfile {
            password: Some("short".to_string()),
            ..Default::default()
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn profile_never_exposes_password_or_superuser() {
        let user = User {
            id: 1,
            email: "me@example.com".to_string(),
            password: "$argon2id$hash".to_string(),
            first_name: "Me".to_string(),
            last_name: String::new(),
            is_staff: false,
            is_superuser: true,
            date_joined: Utc::now(),
        };
        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("is_superuser").is_none());
        assert_eq!(json["email"], "me@example.com");
    }
}
