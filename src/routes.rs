use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Postgres};
use warp::{
    filters::{body::BodyDeserializeError, BoxedFilter},
    http::StatusCode,
    reject::{self, Rejection},
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    constants::MAX_BODY_BYTES,
    error::ApiError,
    form::{Form, FormData},
    media::MediaStorage,
};

pub mod catalog;
pub mod recipes;
pub mod users;

/// Shared handles every handler needs.
#[derive(Debug, Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub jwt_secret: Arc<str>,
    pub media: MediaStorage,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, jwt_secret: Arc<str>, media: MediaStorage) -> Self {
        Self {
            pool,
            jwt_secret,
            media,
        }
    }
}

#[derive(Serialize)]
struct ErrorMessage {
    detail: String,
}

pub fn with_context(context: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

pub fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}

pub fn with_json<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json::<T>())
}

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Every endpoint under `/api/`, plus uploaded media under `/media/`.
pub fn api(context: Context) -> BoxedFilter<(Response,)> {
    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(context.media.root().clone()))
        .map(|file: warp::fs::File| file.into_response());

    warp::path("api")
        .and(
            recipes::routes(context.clone())
                .or(users::routes(context.clone()))
                .unify()
                .or(catalog::routes(context))
                .unify(),
        )
        .or(media)
        .unify()
        .boxed()
}

/// Renders rejections as `{"detail": ...}` bodies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(e) = err.find::<ApiError>() {
        match e {
            ApiError::Internal(info) => {
                log::error!("Request failed: {info}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("Internal server error."),
                )
            }
            e => (e.status_code(), e.to_string()),
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found."))
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            String::from("Request body is too large."),
        )
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            String::from("Unsupported media type."),
        )
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            String::from("Method not allowed."),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error."),
        )
    };

    Ok(reply::with_status(
        reply::json(&ErrorMessage { detail }),
        status,
    ))
}
