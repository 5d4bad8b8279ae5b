use warp::{filters::BoxedFilter, Filter};

use crate::routes::{
    catalog::catalog_routes,
    recipes::recipe_routes,
    reply::{handle_rejection, Response},
    short_links::short_link_routes,
    state::AppState,
    users::user_routes,
};

/// The complete filter tree, including rejection rendering and request logging.
pub fn api(state: AppState) -> BoxedFilter<(Response,)> {
    user_routes(state.clone())
        .or(recipe_routes(state.clone()))
        .unify()
        .or(catalog_routes(state.clone()))
        .unify()
        .or(short_link_routes(state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram"))
        .boxed()
}
