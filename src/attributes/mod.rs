pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;
use repo_types::AttributeKind;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes(AttributeKind::Tag))
        .merge(handlers::routes(AttributeKind::Ingredient))
}
