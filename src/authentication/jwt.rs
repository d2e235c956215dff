use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::database::error::ApiError;
use crate::database::schema::User;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Utc::now().timestamp()).is_negative()
    }
}

/// The authenticated principal a request acts as.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key(secret: &[u8]) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret).map_err(|e| ApiError::Internal(format!("Invalid key: {e}")))
}

/// Signs a session token for `user`. Tokens are issued by the identity
/// service sharing `secret`; the API itself only verifies them.
pub fn generate_jwt_session(user: &User, secret: &[u8]) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned());

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("Failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::Unauthenticated)?;

    if session.is_expired() {
        return Err(ApiError::Unauthenticated);
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: Uuid, role: UserRole) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            first_name: String::from("Test"),
            last_name: String::from("User"),
            role,
        }
    }

    #[test]
    fn session_round_trip() {
        let token = generate_jwt_session(&user(7, UserRole::Admin), b"secret").unwrap();
        let session: SessionData = verify_jwt_session(&token, b"secret").unwrap().into();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "user7");
        assert!(session.is_admin);
    }

    #[test]
    fn rejects_foreign_signature() {
        let token = generate_jwt_session(&user(1, UserRole::User), b"secret").unwrap();

        assert!(matches!(
            verify_jwt_session(&token, b"another secret"),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(matches!(
            verify_jwt_session("not-a-token", b"secret"),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let key = signing_key(b"secret").unwrap();
        let mut claims = JwtSessionData::new(1, String::from("user1"), UserRole::User);
        claims.exp = Utc::now().timestamp() - 60;
        let token = claims.sign_with_key(&key).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, b"secret"),
            Err(ApiError::Unauthenticated)
        ));
    }
}
