use crate::state::AppState;
use axum::Router;

pub mod category;
pub mod dto;
pub mod handlers;
pub mod services;
pub mod slug;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_router())
        .merge(handlers::write_router())
}
