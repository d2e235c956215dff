use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    error::ApiError,
    form::{PageRequest, RecipeFilter, RecipeForm},
    jwt::SessionData,
    media::{decode_image, MediaStorage},
    pagination::PageContext,
    representation::{recipe_view, RecipeView, ViewerFlags},
    schema::{Recipe, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    collections::{members, RecipeCollection},
    ingredients::{ensure_ingredients_exist, list_recipe_parts, replace_recipe_ingredients},
    subscriptions::subscribed_authors,
    tags::{ensure_tags_exist, list_recipe_tags, set_recipe_tags},
    users::get_users_by_ids,
};

#[derive(sqlx::FromRow, Debug)]
struct RecipeRow {
    #[sqlx(flatten)]
    recipe: Recipe,
    count: i64,
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Option<&SessionData>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, ApiError> {
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok(PageContext::no_rows());
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        let selected = [
            (filter.is_favorited, RecipeCollection::Favorites),
            (filter.is_in_shopping_cart, RecipeCollection::ShoppingCart),
        ];
        for (_, collection) in selected.iter().filter(|(enabled, _)| *enabled) {
            query
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {} c WHERE c.recipe_id = r.id AND c.{} = ",
                    collection.table(),
                    collection.owner_column()
                ))
                .push_bind(viewer.user_id)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.pub_date, r.id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(pool).await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes: Vec<Recipe> = rows.into_iter().map(|row| row.recipe).collect();

    let views = load_recipe_views(recipes, viewer, media, pool).await?;
    log::debug!("Fetched {} recipes", views.len());

    PageContext::try_from_rows(views, total_count, page)
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Loads a recipe the session is allowed to modify: its own, or any for admins.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(ApiError::Forbidden)
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ApiError::not_found("No recipe exists with specified id")),
    }
}

pub async fn fetch_recipe_view(
    id: Uuid,
    viewer: Option<&SessionData>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(ApiError::not_found("No recipe exists with specified id"))?;

    load_recipe_views(vec![recipe], viewer, media, pool)
        .await?
        .pop()
        .ok_or(ApiError::not_found("No recipe exists with specified id"))
}

/// Builds full views for `recipes`, fetching nested rows and viewer flags in
/// one query per relation.
pub async fn load_recipe_views(
    recipes: Vec<Recipe>,
    viewer: Option<&SessionData>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Uuid> = recipes
        .iter()
        .map(|recipe| recipe.author_id)
        .collect::<HashSet<Uuid>>()
        .into_iter()
        .collect();

    let authors = get_users_by_ids(pool, &author_ids).await?;
    let mut tags = list_recipe_tags(&recipe_ids, pool).await?;
    let mut parts = list_recipe_parts(&recipe_ids, pool).await?;

    let flags = match viewer {
        Some(viewer) => ViewerFlags {
            favorited: members(RecipeCollection::Favorites, viewer.user_id, &recipe_ids, pool)
                .await?,
            in_shopping_cart: members(
                RecipeCollection::ShoppingCart,
                viewer.user_id,
                &recipe_ids,
                pool,
            )
            .await?,
            subscribed: subscribed_authors(viewer.user_id, &author_ids, pool).await?,
        },
        None => ViewerFlags::anonymous(),
    };

    recipes
        .iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).ok_or_else(|| {
                ApiError::Internal(format!("Author of recipe {} is missing", recipe.id))
            })?;

            Ok(recipe_view(
                recipe,
                author,
                tags.remove(&recipe.id).unwrap_or_default(),
                parts.remove(&recipe.id).unwrap_or_default(),
                &flags,
                media,
            ))
        })
        .collect()
}

/// Writes the recipe's ingredient and tag sets, replacing the current ones.
async fn write_recipe_relations(
    recipe_id: Uuid,
    form: &RecipeForm,
    tag_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    replace_recipe_ingredients(recipe_id, &form.ingredients, &mut *conn).await?;
    set_recipe_tags(recipe_id, tag_ids, &mut *conn).await?;

    Ok(())
}

async fn ensure_references_exist(
    form: &RecipeForm,
    tag_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    ensure_ingredients_exist(&form.ingredient_ids(), &mut *conn).await?;
    ensure_tags_exist(tag_ids, &mut *conn).await?;

    Ok(())
}

async fn insert_recipe(
    form: &RecipeForm,
    image: &str,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    let tag_ids = form.unique_tags();
    let mut tr = pool.begin().await?;

    ensure_references_exist(form, &tag_ids, &mut *tr).await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(form.name.trim())
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(image)
    .fetch_one(&mut *tr)
    .await?;

    write_recipe_relations(id.0, form, &tag_ids, &mut *tr).await?;
    tr.commit().await?;

    Ok(id.0)
}

/// Creates a recipe authored by the session user and returns its id.
pub async fn create_recipe(
    form: &RecipeForm,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;
    form.validate(true)?;

    let image = decode_image(form.image.as_deref().unwrap_or_default())?;
    let image_path = media.save_image(&image).await?;

    match insert_recipe(form, &image_path, session, pool).await {
        Ok(id) => {
            log::info!("{} created recipe {id}", session.username);
            Ok(id)
        }
        Err(e) => {
            media.remove(&image_path).await;
            Err(e)
        }
    }
}

async fn write_recipe_update(
    id: Uuid,
    form: &RecipeForm,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let tag_ids = form.unique_tags();
    let mut tr = pool.begin().await?;

    ensure_references_exist(form, &tag_ids, &mut *tr).await?;

    let result = sqlx::query(
        "
        UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(form.name.trim())
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tr)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    write_recipe_relations(id, form, &tag_ids, &mut *tr).await?;
    tr.commit().await?;

    Ok(())
}

/// Overwrites a recipe. The ingredient and tag sets are replaced as a whole
/// inside one transaction; an omitted image keeps the stored one.
pub async fn update_recipe(
    id: Uuid,
    form: &RecipeForm,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    form.validate(false)?;

    let image = match form.image.as_deref().filter(|image| !image.is_empty()) {
        Some(payload) => Some(decode_image(payload)?),
        None => None,
    };
    let image_path = match &image {
        Some(image) => Some(media.save_image(image).await?),
        None => None,
    };

    match write_recipe_update(id, form, image_path.as_deref(), pool).await {
        Ok(()) => {
            if image_path.is_some() {
                media.remove(&recipe.image).await;
            }
            log::info!("{} updated recipe {id}", session.username);
            Ok(())
        }
        Err(e) => {
            if let Some(path) = &image_path {
                media.remove(path).await;
            }
            Err(e)
        }
    }
}

/// Deletes a recipe; its ingredient, tag, favorite and cart rows cascade.
pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    media.remove(&recipe.image).await;
    log::info!("{} deleted recipe {id}", session.username);

    Ok(())
}

/// Recipes of each author in `author_ids`, oldest first, at most `limit`
/// per author.
pub async fn list_author_recipes(
    author_ids: &[Uuid],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<Recipe>>, ApiError> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT id, author_id, name, text, cooking_time, image, pub_date FROM (
            SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date, r.id) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY pub_date, id
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Uuid, Vec<Recipe>> = HashMap::new();
    rows.into_iter().for_each(|recipe| {
        hashmap.entry(recipe.author_id).or_default().push(recipe);
    });

    Ok(hashmap)
}

pub async fn count_author_recipes(
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, i64>, ApiError> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
