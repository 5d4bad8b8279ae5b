use warp::{
    filters::BoxedFilter,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    reply::Reply,
    Filter,
};

use crate::{
    actions::{
        aggregate_shopping_list, create_recipe, delete_recipe, fetch_recipes, get_recipe_detail,
        get_short_link, toggle_recipe_list, update_recipe,
    },
    association::{Association, Toggle},
    constants::SHOPPING_LIST_FILENAME,
    form::{RecipeForm, RecipeQuery},
    jwt::SessionData,
    middleware::{require_session, with_possible_session},
    permissions::ActionType,
};

use super::{
    reply::{json_reply, no_content, render, Response},
    state::{json_body, with_state, AppState},
};

async fn list_recipes(
    pairs: Vec<(String, String)>,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let query = RecipeQuery::from_pairs(pairs)?;
    let viewer = session.map(|s| s.user_id);
    let page = fetch_recipes(query, viewer, &state.pool).await?;

    Ok(json_reply(&page, StatusCode::OK))
}

async fn new_recipe(
    form: RecipeForm,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    let input = form.validate(None)?;
    let id = create_recipe(input, &session, &state.pool).await?;
    let recipe = get_recipe_detail(id, Some(session.user_id), &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn recipe_detail(
    id: i32,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let viewer = session.map(|s| s.user_id);
    let recipe = get_recipe_detail(id, viewer, &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn patch_recipe(
    id: i32,
    form: RecipeForm,
    session: Option<SessionData>,
    mut state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    update_recipe(id, form, &session, &mut state.cache, &state.pool).await?;
    let recipe = get_recipe_detail(id, Some(session.user_id), &state.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn remove_recipe(
    id: i32,
    session: Option<SessionData>,
    mut state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    delete_recipe(id, &session, &mut state.cache, &state.pool).await?;

    Ok(no_content())
}

async fn short_link(id: i32, mut state: AppState) -> Result<Response, potion::Error> {
    let link = get_short_link(id, &state.base_url, &mut state.cache, &state.pool).await?;

    Ok(json_reply(&link, StatusCode::OK))
}

async fn toggle_list(
    id: i32,
    kind: Association,
    toggle: Toggle,
    session: Option<SessionData>,
    mut state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    let created =
        toggle_recipe_list(kind, id, toggle, &session, &mut state.cache, &state.pool).await?;

    Ok(match created {
        Some(recipe) => json_reply(&recipe, StatusCode::CREATED),
        None => no_content(),
    })
}

async fn download_shopping_cart(
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, potion::Error> {
    let session = require_session(session)?;
    session.authenticate(ActionType::ManageOwnLists)?;
    let list = aggregate_shopping_list(session.user_id, &state.pool).await?;

    let reply = warp::reply::with_header(
        list.to_string(),
        CONTENT_TYPE,
        "text/plain; charset=utf-8",
    );
    let reply = warp::reply::with_header(
        reply,
        CONTENT_DISPOSITION,
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );

    Ok(reply.into_response())
}

/// `POST` adds the recipe to the list, `DELETE` removes it.
fn list_route(
    segment: &'static str,
    kind: Association,
    session: impl Filter<Extract = (Option<SessionData>,), Error = warp::Rejection>
        + Clone
        + Send
        + Sync
        + 'static,
    state: AppState,
) -> BoxedFilter<(Response,)> {
    let toggle = warp::post()
        .map(|| Toggle::Add)
        .or(warp::delete().map(|| Toggle::Remove))
        .unify();

    warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<i32>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::any().map(move || kind))
        .and(toggle)
        .and(session)
        .and(with_state(state))
        .then(toggle_list)
        .map(render)
        .boxed()
}

pub fn recipe_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let session = with_possible_session(state.session_key.clone());

    let favorite = list_route("favorite", Association::Favorite, session.clone(), state.clone());
    let shopping_cart = list_route(
        "shopping_cart",
        Association::ShoppingCart,
        session.clone(),
        state.clone(),
    );

    let state = with_state(state);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(session.clone())
        .and(state.clone())
        .then(list_recipes)
        .map(render);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(json_body::<RecipeForm>())
        .and(session.clone())
        .and(state.clone())
        .then(new_recipe)
        .map(render);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session.clone())
        .and(state.clone())
        .then(download_shopping_cart)
        .map(render);

    let get_link = warp::path!("api" / "recipes" / i32 / "get-link")
        .and(warp::get())
        .and(state.clone())
        .then(short_link)
        .map(render);

    let detail = warp::path!("api" / "recipes" / i32)
        .and(warp::get())
        .and(session.clone())
        .and(state.clone())
        .then(recipe_detail)
        .map(render);

    let patch = warp::path!("api" / "recipes" / i32)
        .and(warp::patch())
        .and(json_body::<RecipeForm>())
        .and(session.clone())
        .and(state.clone())
        .then(patch_recipe)
        .map(render);

    let delete = warp::path!("api" / "recipes" / i32)
        .and(warp::delete())
        .and(session)
        .and(state)
        .then(remove_recipe)
        .map(render);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(get_link)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
        .or(detail)
        .unify()
        .or(patch)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}
