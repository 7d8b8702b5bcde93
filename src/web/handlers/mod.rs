use salvo::prelude::*;
use serde_json::json;

pub mod arena;
pub mod feed;
pub mod forum;
pub mod github;
pub mod health;
pub mod users;
pub mod webhook;

pub fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "error": message })));
}

pub fn render_db_error(res: &mut Response, err: &crate::db::DatabaseError) {
    render_error(
        res,
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("database error: {}", err),
    );
}
