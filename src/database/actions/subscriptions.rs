use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::ApiError,
    form::PageRequest,
    jwt::SessionData,
    media::MediaStorage,
    pagination::PageContext,
    representation::{subscription_view, SubscriptionView},
    schema::{User, Uuid},
};

use sqlx::{Pool, Postgres};

use super::{
    recipes::{count_author_recipes, list_author_recipes},
    users::get_user_by_id,
};

#[derive(sqlx::FromRow, Debug)]
struct SubscribedUserRow {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

pub async fn is_subscribed(
    subscriber_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2",
    )
    .bind(subscriber_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    Ok(result.is_some())
}

/// The subset of `author_ids` that `subscriber_id` follows.
pub async fn subscribed_authors(
    subscriber_id: Uuid,
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, ApiError> {
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE subscriber_id = $1 AND author_id = ANY($2)",
    )
    .bind(subscriber_id)
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Subscription views of authors the requester follows.
async fn load_subscription_views(
    authors: Vec<User>,
    recipes_limit: Option<i64>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, ApiError> {
    let author_ids: Vec<Uuid> = authors.iter().map(|author| author.id).collect();

    let mut recipes = list_author_recipes(&author_ids, recipes_limit, pool).await?;
    let counts = count_author_recipes(&author_ids, pool).await?;

    Ok(authors
        .iter()
        .map(|author| {
            subscription_view(
                author,
                true,
                &recipes.remove(&author.id).unwrap_or_default(),
                counts.get(&author.id).copied().unwrap_or(0),
                media,
            )
        })
        .collect())
}

pub async fn subscribe(
    author_id: Uuid,
    session: &SessionData,
    recipes_limit: Option<i64>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, ApiError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if author_id == session.user_id {
        return Err(ApiError::validation("Can't subscribe to yourself."));
    }

    let author = get_user_by_id(pool, author_id)
        .await?
        .ok_or(ApiError::not_found("No user exists with specified id"))?;

    let mut tr = pool.begin().await?;

    let existing: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2",
    )
    .bind(session.user_id)
    .bind(author_id)
    .fetch_optional(&mut *tr)
    .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Already subscribed."));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author_id)
    .execute(&mut *tr)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Already subscribed."));
    }

    tr.commit().await?;
    log::info!("{} subscribed to {}", session.username, author.username);

    load_subscription_views(vec![author], recipes_limit, media, pool)
        .await?
        .pop()
        .ok_or(ApiError::not_found("No user exists with specified id"))
}

pub async fn unsubscribe(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::not_found("No user exists with specified id"));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not subscribed to this user."));
    }

    log::info!("{} unsubscribed from user {author_id}", session.username);
    Ok(())
}

pub async fn fetch_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, ApiError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let rows: Vec<SubscribedUserRow> = sqlx::query_as(
        "
        SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.role, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.subscriber_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let authors: Vec<User> = rows.into_iter().map(|row| row.user).collect();

    let views = load_subscription_views(authors, recipes_limit, media, pool).await?;
    PageContext::try_from_rows(views, total_count, page)
}
