use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::{require_text, ValidationError};
use crate::pii::Masked;

pub const USERNAME_MAX_LEN: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<Masked<String>>,
    pub is_admin: bool,
}

/// Registration payload. The password only lives long enough to be hashed.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(skip)]
    pub is_admin: bool,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("username", &self.username, USERNAME_MAX_LEN)?;
        if self.password.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        Ok(())
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_never_grants_admin() {
        let user: NewUser = serde_json::from_str(
            r#"{"username": "mallory", "password": "pw", "is_admin": true}"#,
        )
        .unwrap();
        assert!(!user.is_admin);
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_debug_hides_password() {
        let user = NewUser {
            username: "alice".to_string(),
            email: None,
            password: "hunter2".to_string(),
            is_admin: false,
        };
        assert!(!format!("{:?}", user).contains("hunter2"));
    }
}
