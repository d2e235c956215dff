use warp::{filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter};

use super::{json_reply, with_context, with_form, Context};
use crate::{
    actions::{
        ingredients::{get_ingredient, list_ingredients},
        tags::{get_tag, list_tags},
    },
    error::ApiError,
    form::{ingredient_search, Form},
    schema::Uuid,
};

/// Read-only tag and ingredient listings, open to anonymous requests.
pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(tags_handler);

    let tag = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(tag_handler);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_form())
        .and(with_context(context.clone()))
        .and_then(ingredients_handler);

    let ingredient = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_context(context))
        .and_then(ingredient_handler);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

async fn tags_handler(context: Context) -> Result<Response, Rejection> {
    let tags = list_tags(&context.pool).await?;

    Ok(json_reply(&tags, StatusCode::OK))
}

async fn tag_handler(id: Uuid, context: Context) -> Result<Response, Rejection> {
    let tag = get_tag(id, &context.pool)
        .await?
        .ok_or(ApiError::not_found("No tag exists with specified id"))?;

    Ok(json_reply(&tag, StatusCode::OK))
}

async fn ingredients_handler(form: Form, context: Context) -> Result<Response, Rejection> {
    let search = ingredient_search(&form);
    let ingredients = list_ingredients(search.as_deref(), &context.pool).await?;

    Ok(json_reply(&ingredients, StatusCode::OK))
}

async fn ingredient_handler(id: Uuid, context: Context) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &context.pool)
        .await?
        .ok_or(ApiError::not_found("No ingredient exists with specified id"))?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}
