use salvo::prelude::*;
use serde_json::json;
use tracing::warn;

use crate::web::metrics::Metrics;
use crate::web::web_state;
use crate::webhook::{EVENT_HEADER, SIGNATURE_HEADER, WebhookPayload, verify_signature};

use super::{render_db_error, render_error};

/// POST /api/github/webhook
///
/// Signature check over the raw body, then dispatch by event type.
/// Duplicate deliveries are processed again; there is no idempotency key.
#[handler]
pub async fn github_webhook(req: &mut Request, res: &mut Response) {
    let state = web_state();

    let body = match req.payload().await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => {
            Metrics::webhook_rejected();
            render_error(res, StatusCode::BAD_REQUEST, "Unable to read request body");
            return;
        }
    };

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if let Err(err) = verify_signature(&state.webhook_secret, &body, signature.as_deref()) {
        Metrics::webhook_rejected();
        warn!(error = %err, "rejected webhook delivery");
        render_error(res, StatusCode::FORBIDDEN, &err.to_string());
        return;
    }

    let payload = match WebhookPayload::parse(&body) {
        Ok(payload) => payload,
        Err(err) => {
            Metrics::webhook_rejected();
            render_error(res, StatusCode::BAD_REQUEST, &err.to_string());
            return;
        }
    };

    let event_type = req
        .headers()
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    match state
        .webhook_processor
        .handle_event(event_type, &payload)
        .await
    {
        Ok(outcome) => {
            Metrics::webhook_accepted();
            res.render(Json(json!({ "message": outcome.message })));
        }
        Err(err) => render_db_error(res, &err),
    }
}
