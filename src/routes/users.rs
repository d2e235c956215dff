use warp::{filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter};

use super::{json_reply, no_content, with_context, with_form, Context};
use crate::{
    actions::{
        subscriptions::{fetch_subscriptions, subscribe, unsubscribe},
        users::fetch_user_view,
    },
    form::{recipes_limit, Form, PageRequest},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
};

pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let secret = context.jwt_secret.clone();

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(me_handler);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_form())
        .and(with_context(context.clone()))
        .and_then(subscriptions_handler);

    let profile = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(profile_handler);

    let subscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_form())
        .and(with_context(context.clone()))
        .and_then(subscribe_handler);

    let unsubscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context))
        .and_then(unsubscribe_handler);

    me.or(subscriptions)
        .unify()
        .or(profile)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

async fn me_handler(session: SessionData, context: Context) -> Result<Response, Rejection> {
    let user = fetch_user_view(&context.pool, session.user_id, Some(&session)).await?;

    Ok(json_reply(&user, StatusCode::OK))
}

async fn profile_handler(
    id: Uuid,
    session: Option<SessionData>,
    context: Context,
) -> Result<Response, Rejection> {
    let user = fetch_user_view(&context.pool, id, session.as_ref()).await?;

    Ok(json_reply(&user, StatusCode::OK))
}

async fn subscriptions_handler(
    session: SessionData,
    form: Form,
    context: Context,
) -> Result<Response, Rejection> {
    let page = PageRequest::from_form(&form)?;
    let limit = recipes_limit(&form)?;

    let subscriptions =
        fetch_subscriptions(&session, page, limit, &context.media, &context.pool).await?;

    Ok(json_reply(&subscriptions, StatusCode::OK))
}

async fn subscribe_handler(
    id: Uuid,
    session: SessionData,
    form: Form,
    context: Context,
) -> Result<Response, Rejection> {
    let limit = recipes_limit(&form)?;
    let subscription = subscribe(id, &session, limit, &context.media, &context.pool).await?;

    Ok(json_reply(&subscription, StatusCode::CREATED))
}

async fn unsubscribe_handler(
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    unsubscribe(id, &session, &context.pool).await?;

    Ok(no_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{
        api, handle_rejection,
        tests::{detail, offline_context, token},
    };

    #[tokio::test]
    async fn subscribing_to_yourself_is_rejected() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .path("/api/users/7/subscribe/")
            .header("authorization", token(7))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(&response), "Can't subscribe to yourself.");
    }

    #[tokio::test]
    async fn negative_recipes_limit_is_rejected() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .path("/api/users/8/subscribe/?recipes_limit=-1")
            .header("authorization", token(7))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn subscriptions_require_authentication() {
        let api = api(offline_context()).recover(handle_rejection);

        let response = warp::test::request()
            .path("/api/users/subscriptions/")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = warp::test::request()
            .path("/api/users/me/")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
