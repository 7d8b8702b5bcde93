use chrono::Utc;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{ProfileUpdate, User, UserProfile};
use crate::db::stores::RepositorySettings;
use crate::web::middleware::auth::require_user;
use crate::web::views::UserView;
use crate::web::web_state;

use super::{render_db_error, render_error};

#[derive(Debug, Deserialize)]
struct GitHubLoginRequest {
    #[serde(default)]
    code: String,
}

/// POST /api/users/auth/github
///
/// Exchanges the OAuth code, provisions the local account on first login,
/// and returns a bearer token for subsequent requests.
#[handler]
pub async fn github_login(req: &mut Request, res: &mut Response) {
    let state = web_state();
    let body: GitHubLoginRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    if body.code.is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Code is required.");
        return;
    }

    let access_token = match state.github.exchange_code_for_token(&body.code).await {
        Ok(token) => token,
        Err(err) => {
            render_error(
                res,
                StatusCode::UNAUTHORIZED,
                &format!("GitHub authentication failed: {}", err),
            );
            return;
        }
    };
    let gh_user = match state.github.fetch_authenticated_user(&access_token).await {
        Ok(user) => user,
        Err(err) => {
            render_error(
                res,
                StatusCode::UNAUTHORIZED,
                &format!("GitHub authentication failed: {}", err),
            );
            return;
        }
    };

    let users = state.db_manager.user_store();
    let username = format!("github:{}", gh_user.id);
    let email = gh_user.email.clone().unwrap_or_default();
    let display_name = gh_user.name.clone().unwrap_or_else(|| gh_user.login.clone());

    let user = match users.get_user_by_username(&username).await {
        Ok(Some(existing)) => {
            if existing.email.is_empty() && !email.is_empty() {
                if let Err(err) = users.set_email(existing.id, &email).await {
                    render_db_error(res, &err);
                    return;
                }
            }
            match users.get_profile(existing.id).await {
                Ok(Some(profile)) => {
                    if profile.github_handle.is_empty() {
                        if let Err(err) =
                            users.set_github_handle(existing.id, &gh_user.login).await
                        {
                            render_db_error(res, &err);
                            return;
                        }
                    }
                }
                Ok(None) => {
                    let mut profile = UserProfile::new(existing.id);
                    profile.github_handle = gh_user.login.clone();
                    if let Err(err) = users.create_profile(&profile).await {
                        render_db_error(res, &err);
                        return;
                    }
                }
                Err(err) => {
                    render_db_error(res, &err);
                    return;
                }
            }
            existing
        }
        Ok(None) => {
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                username: username.clone(),
                email,
                display_name: display_name.clone(),
                auth_token: None,
                is_verified: true,
                created_at: now,
                updated_at: now,
            };
            if let Err(err) = users.create_user(&user).await {
                render_db_error(res, &err);
                return;
            }
            let mut profile = UserProfile::new(user.id);
            profile.avatar_url = gh_user.avatar_url.clone().unwrap_or_default();
            profile.headline = format!("{} on Hive", display_name);
            profile.github_handle = gh_user.login.clone();
            if let Err(err) = users.create_profile(&profile).await {
                render_db_error(res, &err);
                return;
            }
            info!(username = %username, "provisioned new user from GitHub login");
            user
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let token = Uuid::new_v4().to_string();
    if let Err(err) = users.set_auth_token(user.id, &token).await {
        render_db_error(res, &err);
        return;
    }

    match UserView::load(&users, &user).await {
        Ok(view) => res.render(Json(json!({ "token": token, "user": view }))),
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/users/me
#[handler]
pub async fn me(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let users = web_state().db_manager.user_store();
    match UserView::load(&users, user).await {
        Ok(view) => res.render(Json(view)),
        Err(err) => render_db_error(res, &err),
    }
}

/// PATCH /api/users/me — partial profile update, responds with the full
/// user record.
#[handler]
pub async fn update_me(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let update: ProfileUpdate = match req.parse_json().await {
        Ok(update) => update,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };

    let users = web_state().db_manager.user_store();
    match users.get_profile(user.id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            if let Err(err) = users.create_profile(&UserProfile::new(user.id)).await {
                render_db_error(res, &err);
                return;
            }
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }

    if let Err(err) = users.update_profile(user.id, &update).await {
        render_db_error(res, &err);
        return;
    }
    match UserView::load(&users, user).await {
        Ok(view) => res.render(Json(view)),
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/users
#[handler]
pub async fn list_users(req: &mut Request, res: &mut Response) {
    let limit = req.query::<i64>("limit").unwrap_or(100).clamp(1, 1000);
    let offset = req.query::<i64>("offset").unwrap_or(0).max(0);

    let users = web_state().db_manager.user_store();
    let listed = match users.list_users(limit, offset).await {
        Ok(listed) => listed,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let mut views = Vec::with_capacity(listed.len());
    for user in &listed {
        match UserView::load(&users, user).await {
            Ok(view) => views.push(view),
            Err(err) => {
                render_db_error(res, &err);
                return;
            }
        }
    }
    res.render(Json(views));
}

/// GET /api/users/{id}
#[handler]
pub async fn public_profile(req: &mut Request, res: &mut Response) {
    let raw_id = req.param::<String>("id").unwrap_or_default();
    let Ok(user_id) = Uuid::parse_str(&raw_id) else {
        render_error(res, StatusCode::BAD_REQUEST, "Invalid user id");
        return;
    };

    let users = web_state().db_manager.user_store();
    match users.get_user_by_id(user_id).await {
        Ok(Some(user)) => match UserView::load(&users, &user).await {
            Ok(view) => res.render(Json(view)),
            Err(err) => render_db_error(res, &err),
        },
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "User not found"),
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/users/repos — repositories linked through the GitHub App.
#[handler]
pub async fn list_repositories(depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    match web_state()
        .db_manager
        .repository_store()
        .list_for_user(user.id)
        .await
    {
        Ok(repos) => res.render(Json(repos)),
        Err(err) => render_db_error(res, &err),
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryUpdateRequest {
    id: Option<i64>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    default_description: Option<String>,
}

/// POST /api/users/repos — toggle activity or set the default post
/// description for one of the caller's repositories.
#[handler]
pub async fn update_repository(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let body: RepositoryUpdateRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    let Some(repo_id) = body.id else {
        render_error(res, StatusCode::BAD_REQUEST, "Repository id is required");
        return;
    };

    let settings = RepositorySettings {
        is_active: body.is_active,
        default_description: body.default_description,
    };
    match web_state()
        .db_manager
        .repository_store()
        .update_settings(repo_id, user.id, &settings)
        .await
    {
        Ok(Some(repo)) => res.render(Json(repo)),
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "Repository not found"),
        Err(err) => render_db_error(res, &err),
    }
}
