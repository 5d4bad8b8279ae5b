use warp::{filters::BoxedFilter, http::StatusCode, Filter};

use crate::{
    actions::{
        fetch_subscriptions, fetch_users, get_user_row_or_404, register_user, set_avatar,
        subscribe, unsubscribe,
    },
    form::{AvatarForm, SubscriptionQuery, UserForm},
    jwt::SessionData,
    middleware::{require_session, with_possible_session},
    pagination::PageQuery,
    permissions::ActionType,
};

use super::{
    reply::{json_reply, no_content, render, Response},
    state::{json_body, with_state, AppState},
};

async fn register(form: UserForm, state: AppState) -> Result<Response, potion::Error> {
    let user = form.validate()?;
    let created = register_user(user, &state.pool).await?;

    Ok(json_reply(&created, StatusCode::CREATED))
}

async fn list_users(
    query: PageQuery,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let viewer = session.map(|s| s.user_id);
    let page = fetch_users(query, viewer, &state.pool).await?;

    Ok(json_reply(&page, StatusCode::OK))
}

async fn user_detail(
    id: i32,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let viewer = session.map(|s| s.user_id);
    let user = get_user_row_or_404(id, viewer, &state.pool).await?;

    Ok(json_reply(&user, StatusCode::OK))
}

async fn me(session: Option<SessionData>, state: AppState) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    let user = get_user_row_or_404(session.user_id, Some(session.user_id), &state.pool).await?;

    Ok(json_reply(&user, StatusCode::OK))
}

async fn put_avatar(
    form: AvatarForm,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    session.authenticate(ActionType::ManageOwnProfile)?;
    let avatar = form.validate()?;
    set_avatar(session.user_id, Some(&avatar), &state.pool).await?;

    Ok(json_reply(
        &serde_json::json!({ "avatar": avatar }),
        StatusCode::OK,
    ))
}

async fn delete_avatar(
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    session.authenticate(ActionType::ManageOwnProfile)?;
    set_avatar(session.user_id, None, &state.pool).await?;

    Ok(no_content())
}

async fn subscriptions(
    query: SubscriptionQuery,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    let page = fetch_subscriptions(query, &session, &state.pool).await?;

    Ok(json_reply(&page, StatusCode::OK))
}

async fn add_subscription(
    id: i32,
    query: SubscriptionQuery,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    let author = subscribe(id, query.recipes_limit(), &session, &state.pool).await?;

    Ok(json_reply(&author, StatusCode::CREATED))
}

async fn remove_subscription(
    id: i32,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    unsubscribe(id, &session, &state.pool).await?;

    Ok(no_content())
}

pub fn user_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let session = with_possible_session(state.session_key.clone());
    let state = with_state(state);

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body::<UserForm>())
        .and(state.clone())
        .then(register)
        .map(render);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(warp::query::<PageQuery>())
        .and(session.clone())
        .and(state.clone())
        .then(list_users)
        .map(render);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(session.clone())
        .and(state.clone())
        .then(me)
        .map(render);

    let put_avatar = warp::path!("api" / "users" / "me" / "avatar")
        .and(warp::put())
        .and(json_body::<AvatarForm>())
        .and(session.clone())
        .and(state.clone())
        .then(put_avatar)
        .map(render);

    let delete_avatar = warp::path!("api" / "users" / "me" / "avatar")
        .and(warp::delete())
        .and(session.clone())
        .and(state.clone())
        .then(delete_avatar)
        .map(render);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<SubscriptionQuery>())
        .and(session.clone())
        .and(state.clone())
        .then(subscriptions)
        .map(render);

    let subscribe = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::post())
        .and(warp::query::<SubscriptionQuery>())
        .and(session.clone())
        .and(state.clone())
        .then(add_subscription)
        .map(render);

    let unsubscribe = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::delete())
        .and(session.clone())
        .and(state.clone())
        .then(remove_subscription)
        .map(render);

    let detail = warp::path!("api" / "users" / i32)
        .and(warp::get())
        .and(session)
        .and(state)
        .then(user_detail)
        .map(render);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(put_avatar)
        .unify()
        .or(delete_avatar)
        .unify()
        .or(subscriptions)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(detail)
        .unify()
        .boxed()
}
