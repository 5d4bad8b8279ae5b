use warp::{
    filters::BoxedFilter,
    http::{header::LOCATION, StatusCode},
    reply::Reply,
    Filter,
};

use crate::{actions::resolve_short_link_cached, short_link::recipe_page_url};

use super::{
    reply::{render, Response},
    state::{with_state, AppState},
};

async fn follow(token: String, mut state: AppState) -> Result<Response, potion::Error> {
    let recipe_id = resolve_short_link_cached(&token, &mut state.cache, &state.pool).await?;
    let location = recipe_page_url(&state.base_url, recipe_id);
    log::trace!("> Short link {token} -> {location}");

    let reply = warp::reply::with_status(warp::reply(), StatusCode::FOUND);
    Ok(warp::reply::with_header(reply, LOCATION, location).into_response())
}

/// `/s/{token}` redirects to the recipe page.
pub fn short_link_routes(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("s" / String)
        .and(warp::get())
        .and(with_state(state))
        .then(follow)
        .map(render)
        .boxed()
}
