use salvo::prelude::*;
use serde_json::json;

use crate::db::models::User;
use crate::web::handlers::{
    arena::{cf_profile, cf_sync, leaderboard, link_codeforces, list_challenges},
    feed::{comment_on_post, create_post, list_feed, react_to_post},
    forum::{
        create_reply, create_thread, get_thread, list_channels, list_thread_replies, list_threads,
        vote_on_thread,
    },
    github::{
        github_events, github_profile, github_public_profile, github_repos, github_sync,
        link_github,
    },
    health::health_check,
    users::{
        github_login, list_repositories, list_users, me, public_profile, update_me,
        update_repository,
    },
    webhook::github_webhook,
};
use crate::web::metrics::metrics_endpoint;
use crate::web::web_state;

/// Authenticated user for the current request, resolved from the bearer
/// token by `attach_user`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Resolves the bearer token to a user and stashes it in the depot. Never
/// rejects; handlers that need a user call `require_user`.
#[handler]
pub async fn attach_user(req: &mut Request, depot: &mut Depot) {
    let Some(token) = bearer_token(req) else {
        return;
    };
    if token.is_empty() {
        return;
    }
    match web_state()
        .db_manager
        .user_store()
        .get_user_by_token(&token)
        .await
    {
        Ok(Some(user)) => {
            depot.inject(CurrentUser(user));
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, "token lookup failed");
        }
    }
}

pub fn current_user(depot: &Depot) -> Option<&User> {
    depot.obtain::<CurrentUser>().ok().map(|current| &current.0)
}

/// Renders a 401 and returns `None` when the request carries no valid
/// bearer token.
pub fn require_user<'a>(depot: &'a Depot, res: &mut Response) -> Option<&'a User> {
    match current_user(depot) {
        Some(user) => Some(user),
        None => {
            res.status_code(StatusCode::UNAUTHORIZED);
            res.render(Json(json!({ "error": "Authentication required" })));
            None
        }
    }
}

pub fn create_router() -> Router {
    Router::new()
        .push(Router::with_path("health").get(health_check))
        .push(Router::with_path("metrics").get(metrics_endpoint))
        .push(
            Router::with_path("api")
                .hoop(attach_user)
                .push(
                    Router::with_path("users")
                        .get(list_users)
                        .push(Router::with_path("auth/github").post(github_login))
                        .push(Router::with_path("me").get(me).patch(update_me))
                        .push(
                            Router::with_path("repos")
                                .get(list_repositories)
                                .post(update_repository),
                        )
                        .push(Router::with_path("{id}").get(public_profile)),
                )
                .push(
                    Router::with_path("feed")
                        .get(list_feed)
                        .post(create_post)
                        .push(Router::with_path("{id}/react").post(react_to_post))
                        .push(Router::with_path("{id}/comment").post(comment_on_post)),
                )
                .push(
                    Router::with_path("arena")
                        .push(Router::with_path("link-codeforces").post(link_codeforces))
                        .push(Router::with_path("cf-profile").get(cf_profile))
                        .push(Router::with_path("cf-sync").post(cf_sync))
                        .push(Router::with_path("leaderboard").get(leaderboard))
                        .push(Router::with_path("challenges").get(list_challenges)),
                )
                .push(
                    Router::with_path("github")
                        .push(Router::with_path("link").post(link_github))
                        .push(Router::with_path("profile").get(github_profile))
                        .push(Router::with_path("sync").post(github_sync))
                        .push(Router::with_path("events").get(github_events))
                        .push(Router::with_path("repos").get(github_repos))
                        .push(Router::with_path("user/{username}").get(github_public_profile))
                        .push(Router::with_path("webhook").post(github_webhook)),
                )
                .push(
                    Router::with_path("forum")
                        .push(Router::with_path("channels").get(list_channels))
                        .push(
                            Router::with_path("threads")
                                .get(list_threads)
                                .post(create_thread)
                                .push(
                                    Router::with_path("{id}")
                                        .get(get_thread)
                                        .push(Router::with_path("vote").post(vote_on_thread))
                                        .push(
                                            Router::with_path("replies").get(list_thread_replies),
                                        )
                                        .push(Router::with_path("reply").post(create_reply)),
                                ),
                        ),
                ),
        )
}
