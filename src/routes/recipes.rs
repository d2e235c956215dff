use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use super::{json_reply, no_content, with_context, with_form, with_json, Context};
use crate::{
    actions::{
        collections::{add_to_collection, remove_from_collection, RecipeCollection},
        recipes::{create_recipe, delete_recipe, fetch_recipe_view, fetch_recipes, update_recipe},
        shopping_cart::download_shopping_list,
    },
    constants::SHOPPING_LIST_FILENAME,
    form::{Form, PageRequest, RecipeFilter, RecipeForm},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
};

pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let secret = context.jwt_secret.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_form())
        .and(with_context(context.clone()))
        .and_then(list_handler);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_json::<RecipeForm>())
        .and(with_context(context.clone()))
        .and_then(create_handler);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(download_handler);

    let detail = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(detail_handler);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::put().or(warp::patch()).unify())
        .and(with_session(secret.clone()))
        .and(with_json::<RecipeForm>())
        .and(with_context(context.clone()))
        .and_then(update_handler);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context.clone()))
        .and_then(delete_handler);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(collection_routes("favorite", RecipeCollection::Favorites, context.clone()))
        .unify()
        .or(collection_routes(
            "shopping_cart",
            RecipeCollection::ShoppingCart,
            context,
        ))
        .unify()
        .boxed()
}

/// `POST` and `DELETE /recipes/{id}/{segment}/`.
fn collection_routes(
    segment: &'static str,
    collection: RecipeCollection,
    context: Context,
) -> BoxedFilter<(Response,)> {
    let secret = context.jwt_secret.clone();
    let path = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(move |id: Uuid, session: SessionData, context: Context| {
            add_handler(collection, id, session, context)
        });

    let remove = path
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context))
        .and_then(move |id: Uuid, session: SessionData, context: Context| {
            remove_handler(collection, id, session, context)
        });

    add.or(remove).unify().boxed()
}

async fn list_handler(
    session: Option<SessionData>,
    form: Form,
    context: Context,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_form(&form)?;
    let page = PageRequest::from_form(&form)?;

    let recipes = fetch_recipes(
        &filter,
        page,
        session.as_ref(),
        &context.media,
        &context.pool,
    )
    .await?;

    Ok(json_reply(&recipes, StatusCode::OK))
}

async fn create_handler(
    session: SessionData,
    form: RecipeForm,
    context: Context,
) -> Result<Response, Rejection> {
    let id = create_recipe(&form, &session, &context.media, &context.pool).await?;
    let recipe = fetch_recipe_view(id, Some(&session), &context.media, &context.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn detail_handler(
    id: Uuid,
    session: Option<SessionData>,
    context: Context,
) -> Result<Response, Rejection> {
    let recipe = fetch_recipe_view(id, session.as_ref(), &context.media, &context.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn update_handler(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    context: Context,
) -> Result<Response, Rejection> {
    update_recipe(id, &form, &session, &context.media, &context.pool).await?;
    let recipe = fetch_recipe_view(id, Some(&session), &context.media, &context.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn delete_handler(
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    delete_recipe(id, &session, &context.media, &context.pool).await?;

    Ok(no_content())
}

async fn add_handler(
    collection: RecipeCollection,
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    let recipe =
        add_to_collection(collection, id, &session, &context.media, &context.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn remove_handler(
    collection: RecipeCollection,
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    remove_from_collection(collection, id, &session, &context.pool).await?;

    Ok(no_content())
}

async fn download_handler(session: SessionData, context: Context) -> Result<Response, Rejection> {
    let shopping_list = download_shopping_list(&session, &context.pool).await?;

    Ok(reply::with_header(
        shopping_list,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{
        api, handle_rejection,
        tests::{detail, offline_context, token},
    };

    fn recipe_body(ingredients: serde_json::Value, cooking_time: i32) -> serde_json::Value {
        serde_json::json!({
            "ingredients": ingredients,
            "tags": [1],
            "image": "data:image/png;base64,iVBORw0KGgo=",
            "name": "Pancakes",
            "text": "Mix and fry.",
            "cooking_time": cooking_time,
        })
    }

    #[tokio::test]
    async fn create_requires_authentication() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .path("/api/recipes/")
            .json(&recipe_body(serde_json::json!([]), 10))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rejects_duplicated_ingredients() {
        let api = api(offline_context()).recover(handle_rejection);
        let ingredients = serde_json::json!([{"id": 1, "amount": 2}, {"id": 1, "amount": 3}]);

        let response = warp::test::request()
            .method("POST")
            .path("/api/recipes/")
            .header("authorization", token(1))
            .json(&recipe_body(ingredients, 10))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(&response), "Duplicated ingredients");
    }

    #[tokio::test]
    async fn create_rejects_zero_cooking_time() {
        let api = api(offline_context()).recover(handle_rejection);
        let ingredients = serde_json::json!([{"id": 1, "amount": 2}]);

        let response = warp::test::request()
            .method("POST")
            .path("/api/recipes/")
            .header("authorization", token(1))
            .json(&recipe_body(ingredients, 0))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(&response), "Cooking time should be more than 0");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .path("/api/recipes/")
            .header("authorization", token(1))
            .header("content-type", "application/json")
            .body("{\"name\": ")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn favorite_requires_authentication() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .path("/api/recipes/1/favorite/")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn shopping_list_requires_authentication() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .path("/api/recipes/download_shopping_cart/")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .method("PUT")
            .path("/api/recipes/")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
