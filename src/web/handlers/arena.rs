use salvo::prelude::*;
use serde::Deserialize;

use crate::db::stores::UpsertOutcome;
use crate::sync::{codeforces_profile_from_user, merge_codeforces_profile};
use crate::web::metrics::Metrics;
use crate::web::middleware::auth::require_user;
use crate::web::views::CodeforcesProfileView;
use crate::web::web_state;

use super::{render_db_error, render_error};

async fn cf_view_for_user(
    res: &mut Response,
    profile: crate::db::models::CodeforcesProfile,
    user: &crate::db::models::User,
) {
    let users = web_state().db_manager.user_store();
    let total_xp = match users.get_profile(user.id).await {
        Ok(profile) => profile.map(|p| p.total_xp).unwrap_or(0),
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };
    let display_name = if user.display_name.is_empty() {
        profile.handle.clone()
    } else {
        user.display_name.clone()
    };
    res.render(Json(CodeforcesProfileView::new(
        profile,
        user.username.clone(),
        display_name,
        total_xp,
    )));
}

#[derive(Debug, Deserialize)]
struct LinkCodeforcesRequest {
    #[serde(default)]
    handle: String,
}

/// POST /api/arena/link-codeforces
///
/// Verifies the handle upstream before any row is written; an unknown
/// handle produces a 400 and no profile.
#[handler]
pub async fn link_codeforces(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let body: LinkCodeforcesRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    if body.handle.is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Handle is required");
        return;
    }

    let state = web_state();
    Metrics::upstream_sync();
    let cf_user = match state.codeforces.user_info(&body.handle).await {
        Ok(cf_user) => cf_user,
        Err(err) => {
            Metrics::upstream_failure();
            render_error(
                res,
                StatusCode::BAD_REQUEST,
                &format!("Could not find Codeforces user \"{}\": {}", body.handle, err),
            );
            return;
        }
    };

    let profile = codeforces_profile_from_user(user.id, &cf_user);
    match state.db_manager.profile_store().upsert_cf_profile(&profile).await {
        Ok(outcome) => {
            if outcome == UpsertOutcome::Created {
                res.status_code(StatusCode::CREATED);
            }
            cf_view_for_user(res, profile, user).await;
        }
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/arena/cf-profile
#[handler]
pub async fn cf_profile(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    match web_state()
        .db_manager
        .profile_store()
        .get_cf_profile(user.id)
        .await
    {
        Ok(Some(profile)) => cf_view_for_user(res, profile, user).await,
        Ok(None) => render_error(
            res,
            StatusCode::NOT_FOUND,
            "No Codeforces profile linked. Use /api/arena/link-codeforces/ first.",
        ),
        Err(err) => render_db_error(res, &err),
    }
}

/// POST /api/arena/cf-sync — refreshes cached stats from the Codeforces API.
#[handler]
pub async fn cf_sync(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let state = web_state();
    let profiles = state.db_manager.profile_store();

    let existing = match profiles.get_cf_profile(user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "No Codeforces profile linked.");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    Metrics::upstream_sync();
    let cf_user = match state.codeforces.user_info(&existing.handle).await {
        Ok(cf_user) => cf_user,
        Err(err) => {
            Metrics::upstream_failure();
            render_error(
                res,
                StatusCode::BAD_GATEWAY,
                &format!("Codeforces API error: {}", err),
            );
            return;
        }
    };

    let merged = merge_codeforces_profile(&existing, &cf_user);
    match profiles.upsert_cf_profile(&merged).await {
        Ok(_) => cf_view_for_user(res, merged, user).await,
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/arena/leaderboard — ranked by Codeforces rating; the combined
/// score (70% rating, 30% internal XP) is computed per row at read time.
#[handler]
pub async fn leaderboard(res: &mut Response) {
    match web_state().db_manager.profile_store().leaderboard().await {
        Ok(rows) => {
            let views: Vec<CodeforcesProfileView> = rows
                .into_iter()
                .map(CodeforcesProfileView::from_leaderboard_row)
                .collect();
            res.render(Json(views));
        }
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/arena/challenges
#[handler]
pub async fn list_challenges(res: &mut Response) {
    match web_state()
        .db_manager
        .profile_store()
        .list_challenges()
        .await
    {
        Ok(challenges) => res.render(Json(challenges)),
        Err(err) => render_db_error(res, &err),
    }
}
