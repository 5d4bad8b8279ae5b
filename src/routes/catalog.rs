use serde::Deserialize;
use warp::{filters::BoxedFilter, http::StatusCode, Filter};

use crate::{
    actions::{get_ingredient, get_tag, list_ingredients, list_tags},
    error::StatusError,
};

use super::{
    reply::{json_reply, render, Response},
    state::{with_state, AppState},
};

#[derive(Deserialize, Debug, Default)]
struct IngredientSearch {
    name: Option<String>,
}

async fn tags(state: AppState) -> Result<Response, potion::Error> {
    Ok(json_reply(&list_tags(&state.pool).await?, StatusCode::OK))
}

async fn tag(id: i32, state: AppState) -> Result<Response, potion::Error> {
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| StatusError::not_found("Tag not found"))?;

    Ok(json_reply(&tag, StatusCode::OK))
}

async fn ingredients(search: IngredientSearch, state: AppState) -> Result<Response, potion::Error> {
    let rows = list_ingredients(search.name.as_deref(), &state.pool).await?;

    Ok(json_reply(&rows, StatusCode::OK))
}

async fn ingredient(id: i32, state: AppState) -> Result<Response, potion::Error> {
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| StatusError::not_found("Ingredient not found"))?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}

/// Read-only tag and ingredient endpoints.
pub fn catalog_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let state = with_state(state);

    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(state.clone())
        .then(tags)
        .map(render);

    let tag = warp::path!("api" / "tags" / i32)
        .and(warp::get())
        .and(state.clone())
        .then(tag)
        .map(render);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientSearch>())
        .and(state.clone())
        .then(ingredients)
        .map(render);

    let ingredient = warp::path!("api" / "ingredients" / i32)
        .and(warp::get())
        .and(state)
        .then(ingredient)
        .map(render);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}
