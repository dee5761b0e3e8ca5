//! Caller identity supplied by the upstream gateway

use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

const ADMIN_ROLES: [&str; 2] = ["admin", "superadmin"];

/// Authenticated caller, trusted as given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES.contains(&self.role.as_str())
    }

    /// Admins may act for anyone; everyone else only for themselves
    pub fn can_act_for(&self, user_id: i64) -> bool {
        self.is_admin() || self.user_id == user_id
    }

    pub fn authorize(&self, user_id: i64) -> Result<(), ApiError> {
        if self.can_act_for(user_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "user {} may not act for user {}",
                self.user_id, user_id
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;
        let user_id = raw_id
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "user".to_string());

        Ok(Identity { user_id, role })
    }
}
