use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::clients::stats;
use crate::db::stores::UpsertOutcome;
use crate::sync::{assemble_github_profile, merge_github_profile};
use crate::web::metrics::Metrics;
use crate::web::middleware::auth::require_user;
use crate::web::views::GitHubProfileView;
use crate::web::web_state;

use super::{render_db_error, render_error};

#[derive(Debug, Deserialize)]
struct LinkGitHubRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    access_token: String,
}

/// POST /api/github/link
///
/// Verifies the username upstream, aggregates repo/language/event stats,
/// and caches the profile. An unknown username produces a 400 and no row.
#[handler]
pub async fn link_github(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let body: LinkGitHubRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    if body.username.is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Username is required");
        return;
    }

    let state = web_state();
    Metrics::upstream_sync();
    let profile = match assemble_github_profile(
        &state.github,
        user.id,
        &body.username,
        &body.access_token,
    )
    .await
    {
        Ok(profile) => profile,
        Err(err) => {
            Metrics::upstream_failure();
            render_error(
                res,
                StatusCode::BAD_REQUEST,
                &format!("Could not find GitHub user \"{}\": {}", body.username, err),
            );
            return;
        }
    };

    let users = state.db_manager.user_store();
    match state
        .db_manager
        .profile_store()
        .upsert_gh_profile(&profile)
        .await
    {
        Ok(outcome) => {
            // Mirror the login into the Hive profile for webhook lookups.
            if let Ok(Some(_)) = users.get_profile(user.id).await {
                let _ = users.set_github_handle(user.id, &profile.username).await;
            }
            if outcome == UpsertOutcome::Created {
                res.status_code(StatusCode::CREATED);
            }
            res.render(Json(GitHubProfileView::new(profile, user)));
        }
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/github/profile
#[handler]
pub async fn github_profile(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    match web_state()
        .db_manager
        .profile_store()
        .get_gh_profile(user.id)
        .await
    {
        Ok(Some(profile)) => res.render(Json(GitHubProfileView::new(profile, user))),
        Ok(None) => render_error(
            res,
            StatusCode::NOT_FOUND,
            "No GitHub profile linked. Use /api/github/link/ first.",
        ),
        Err(err) => render_db_error(res, &err),
    }
}

/// POST /api/github/sync — refreshes the cached profile; repo and event
/// fetch failures degrade to defaults rather than failing the sync.
#[handler]
pub async fn github_sync(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let state = web_state();
    let profiles = state.db_manager.profile_store();

    let existing = match profiles.get_gh_profile(user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "No GitHub profile linked.");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    Metrics::upstream_sync();
    let fresh = match assemble_github_profile(
        &state.github,
        user.id,
        &existing.username,
        &existing.access_token,
    )
    .await
    {
        Ok(fresh) => fresh,
        Err(err) => {
            Metrics::upstream_failure();
            render_error(
                res,
                StatusCode::BAD_GATEWAY,
                &format!("GitHub API error: {}", err),
            );
            return;
        }
    };

    let merged = merge_github_profile(&existing, fresh);
    match profiles.upsert_gh_profile(&merged).await {
        Ok(_) => res.render(Json(GitHubProfileView::new(merged, user))),
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/github/events — live activity feed for the linked account.
#[handler]
pub async fn github_events(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let state = web_state();

    let profile = match state.db_manager.profile_store().get_gh_profile(user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "No GitHub profile linked.");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let token = if profile.access_token.is_empty() {
        None
    } else {
        Some(profile.access_token.as_str())
    };
    match state
        .github
        .fetch_user_events(&profile.username, 30, token)
        .await
    {
        Ok(events) => {
            let activities = stats::events_to_activity(&events, 20);
            res.render(Json(json!({ "activities": activities })));
        }
        Err(err) => {
            Metrics::upstream_failure();
            render_error(
                res,
                StatusCode::BAD_GATEWAY,
                &format!("GitHub API error: {}", err),
            );
        }
    }
}

/// GET /api/github/repos — simplified repository list for the linked
/// account.
#[handler]
pub async fn github_repos(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let per_page = req.query::<u32>("per_page").unwrap_or(10).clamp(1, 30);
    let state = web_state();

    let profile = match state.db_manager.profile_store().get_gh_profile(user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "No GitHub profile linked.");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let token = if profile.access_token.is_empty() {
        None
    } else {
        Some(profile.access_token.as_str())
    };
    match state
        .github
        .fetch_user_repos(&profile.username, per_page, token)
        .await
    {
        Ok(repos) => {
            let simplified = stats::top_repos(&repos, per_page as usize);
            res.render(Json(json!({ "repos": simplified })));
        }
        Err(err) => {
            Metrics::upstream_failure();
            render_error(
                res,
                StatusCode::BAD_GATEWAY,
                &format!("GitHub API error: {}", err),
            );
        }
    }
}

/// GET /api/github/user/{username} — public passthrough profile, no auth.
#[handler]
pub async fn github_public_profile(req: &mut Request, res: &mut Response) {
    let username = req.param::<String>("username").unwrap_or_default();
    if username.is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Username is required");
        return;
    }

    let state = web_state();
    let gh_user = match state.github.fetch_user(&username, None).await {
        Ok(gh_user) => gh_user,
        Err(err) => {
            render_error(
                res,
                StatusCode::NOT_FOUND,
                &format!("Could not find GitHub user \"{}\": {}", username, err),
            );
            return;
        }
    };

    let repos = state
        .github
        .fetch_user_repos(&username, 10, None)
        .await
        .unwrap_or_default();
    let top_repos = stats::top_repos(&repos, stats::TOP_REPO_LIMIT);

    res.render(Json(json!({
        "login": gh_user.login,
        "avatar_url": gh_user.avatar_url,
        "html_url": gh_user.html_url,
        "bio": gh_user.bio.unwrap_or_default(),
        "company": gh_user.company.unwrap_or_default(),
        "location": gh_user.location.unwrap_or_default(),
        "public_repos": gh_user.public_repos,
        "followers": gh_user.followers,
        "following": gh_user.following,
        "top_repos": top_repos,
    })));
}
