use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData};
use crate::error::ApiError;

/// Extracts the token from `Authorization: Token <jwt>` or `Bearer <jwt>`.
fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

/// A missing header is anonymous; a present but invalid one is rejected.
pub fn authorize(header: Option<&str>, secret: &[u8]) -> Result<Option<SessionData>, ApiError> {
    match header {
        None => Ok(None),
        Some(header) => {
            let token = parse_authorization(header).ok_or(ApiError::Unauthenticated)?;
            let session = verify_jwt_session(token, secret)?;

            Ok(Some(session.into()))
        }
    }
}

pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move { authorize(header.as_deref(), secret.as_bytes()).map_err(Rejection::from) }
    })
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_possible_session(secret).and_then(|session: Option<SessionData>| async move {
        session.ok_or_else(|| Rejection::from(ApiError::Unauthenticated))
    })
}
