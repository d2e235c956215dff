use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::ApiError,
    jwt::SessionData,
    media::MediaStorage,
    representation::{recipe_compact_view, RecipeCompactView},
    schema::{Recipe, Uuid},
};

use sqlx::{Pool, Postgres};

use super::recipes::get_recipe;

/// Per-user recipe sets with identical add/remove rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeCollection {
    Favorites,
    ShoppingCart,
}

impl RecipeCollection {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping_cart",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::Favorites => "owner_id",
            Self::ShoppingCart => "customer_id",
        }
    }

    pub fn action(&self) -> ActionType {
        match self {
            Self::Favorites => ActionType::ManageOwnFavorites,
            Self::ShoppingCart => ActionType::ManageOwnShoppingCart,
        }
    }

    fn already_added(&self) -> &'static str {
        match self {
            Self::Favorites => "Already in favorites.",
            Self::ShoppingCart => "Already in shopping list.",
        }
    }

    fn not_added(&self) -> &'static str {
        match self {
            Self::Favorites => "Recipe is not in favorites.",
            Self::ShoppingCart => "Recipe is not in shopping list.",
        }
    }
}

/// The subset of `recipe_ids` that `user_id` has in the collection.
pub async fn members(
    collection: RecipeCollection,
    user_id: Uuid,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let (table, owner) = (collection.table(), collection.owner_column());

    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {table} WHERE {owner} = $1 AND recipe_id = ANY($2)"
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Adds a recipe to the session user's collection. The unique constraint on
/// (user, recipe) decides concurrent duplicates; the pre-check only gives
/// the common case a clear message.
pub async fn add_to_collection(
    collection: RecipeCollection,
    recipe_id: Uuid,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeCompactView, ApiError> {
    session.authenticate(collection.action())?;
    let (table, owner) = (collection.table(), collection.owner_column());

    let mut tr = pool.begin().await?;

    let recipe: Recipe = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(&mut *tr)
        .await?
        .ok_or(ApiError::not_found("No recipe exists with specified id"))?;

    let existing: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM {table} WHERE {owner} = $1 AND recipe_id = $2"
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .fetch_optional(&mut *tr)
    .await?;
    if existing.is_some() {
        return Err(ApiError::conflict(collection.already_added()));
    }

    let result = sqlx::query(&format!(
        "INSERT INTO {table} ({owner}, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict(collection.already_added()));
    }

    tr.commit().await?;

    log::info!(
        "{} added recipe {recipe_id} to {table}",
        session.username
    );
    Ok(recipe_compact_view(&recipe, media))
}

pub async fn remove_from_collection(
    collection: RecipeCollection,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    session.authenticate(collection.action())?;
    let (table, owner) = (collection.table(), collection.owner_column());

    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE {owner} = $1 AND recipe_id = $2"
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(collection.not_added()));
    }

    log::info!(
        "{} removed recipe {recipe_id} from {table}",
        session.username
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_map_to_their_tables() {
        assert_eq!(RecipeCollection::Favorites.table(), "favorites");
        assert_eq!(RecipeCollection::Favorites.owner_column(), "owner_id");
        assert_eq!(RecipeCollection::ShoppingCart.table(), "shopping_cart");
        assert_eq!(RecipeCollection::ShoppingCart.owner_column(), "customer_id");
    }

    #[test]
    fn collections_require_their_own_permission() {
        assert_eq!(
            RecipeCollection::Favorites.action(),
            ActionType::ManageOwnFavorites
        );
        assert_eq!(
            RecipeCollection::ShoppingCart.action(),
            ActionType::ManageOwnShoppingCart
        );
    }
}
