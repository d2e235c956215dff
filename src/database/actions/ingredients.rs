use std::collections::HashMap;

use crate::{
    error::ApiError,
    form::IngredientAmount,
    schema::{Ingredient, RecipePart, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{escape_like, find_missing};

/// Lists ingredients, optionally only those whose name starts with `search`
/// (case-insensitive).
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as(
                "SELECT id, name, measurement_unit FROM ingredients WHERE name ILIKE $1 ORDER BY name, id",
            )
            .bind(format!("{}%", escape_like(search)))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

/// Ingredients of every recipe in `recipe_ids`, grouped by recipe.
pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipePart>>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let parts: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    parts.into_iter().for_each(|part| {
        hashmap.entry(part.recipe_id).or_default().push(part);
    });

    Ok(hashmap)
}

pub async fn ensure_ingredients_exist(
    ingredient_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    let missing = find_missing("ingredients", ingredient_ids, conn).await?;
    if let Some(id) = missing.first() {
        return Err(ApiError::Validation(format!("Ingredient {id} does not exist")));
    }

    Ok(())
}

/// Drops every ingredient row of the recipe and inserts `ingredients` in
/// their place. Must run inside the transaction that writes the recipe.
pub async fn replace_recipe_ingredients(
    recipe_id: Uuid,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}
