use std::collections::HashMap;

use crate::{
    error::ApiError,
    schema::{LinkedRecipeTag, Tag, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::find_missing;

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

/// Tags of every recipe in `recipe_ids`, grouped by recipe.
pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<Tag>>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    list.into_iter().for_each(|tag| {
        hashmap.entry(tag.recipe_id).or_default().push(tag.into());
    });

    Ok(hashmap)
}

pub async fn ensure_tags_exist(tag_ids: &[Uuid], conn: &mut PgConnection) -> Result<(), ApiError> {
    let missing = find_missing("tags", tag_ids, conn).await?;
    if let Some(id) = missing.first() {
        return Err(ApiError::Validation(format!("Tag {id} does not exist")));
    }

    Ok(())
}

/// Replaces the tag set of a recipe.
pub async fn set_recipe_tags(
    recipe_id: Uuid,
    tag_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tag_ids, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}
