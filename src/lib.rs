mod database {
    pub mod actions;
    pub mod association;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod short_link;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod config;
mod constants;

mod cache {
    pub mod cache;
}
pub mod routes {
    pub mod catalog;
    pub mod recipes;
    pub mod reply;
    pub mod short_links;
    pub mod state;
    pub mod users;
}
mod server;

pub use authentication::*;
pub use cache::cache::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use jwt::{SessionData, SessionKey};
pub use routes::state::AppState;
pub use server::api;
