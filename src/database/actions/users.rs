use std::collections::HashMap;

use crate::{
    error::ApiError,
    jwt::SessionData,
    representation::{user_view, UserView},
    schema::{User, Uuid},
};

use sqlx::{Pool, Postgres};

use super::subscriptions::is_subscribed;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role";

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn get_users_by_ids(
    pool: &Pool<Postgres>,
    user_ids: &[Uuid],
) -> Result<HashMap<Uuid, User>, ApiError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(user_ids)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|user| (user.id, user)).collect())
}

/// Profile of `user_id` as seen by `viewer`; nobody is subscribed to themselves.
pub async fn fetch_user_view(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    viewer: Option<&SessionData>,
) -> Result<UserView, ApiError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or(ApiError::not_found("No user exists with specified id"))?;

    let subscribed = match viewer {
        Some(viewer) if viewer.user_id != user.id => {
            is_subscribed(viewer.user_id, user.id, pool).await?
        }
        _ => false,
    };

    log::debug!("Fetched profile of {}", user.username);
    Ok(user_view(&user, subscribed))
}
