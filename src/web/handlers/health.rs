use salvo::prelude::*;
use serde_json::json;

use crate::web::web_state;

#[handler]
pub async fn health_check(res: &mut Response) {
    res.render(Json(json!({
        "status": "ok",
        "uptime_seconds": web_state().started_at.elapsed().as_secs(),
    })));
}
