use chrono::Utc;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::models::{Comment, Post, PostType, ReactionType};
use crate::db::stores::ReactionToggle;
use crate::web::metrics::Metrics;
use crate::web::middleware::auth::require_user;
use crate::web::views::{UserViewCache, comment_view, post_view};
use crate::web::web_state;

use super::{render_db_error, render_error};

fn parse_post_id(req: &Request, res: &mut Response) -> Option<Uuid> {
    let raw_id = req.param::<String>("id").unwrap_or_default();
    match Uuid::parse_str(&raw_id) {
        Ok(post_id) => Some(post_id),
        Err(_) => {
            render_error(res, StatusCode::NOT_FOUND, "Post not found");
            None
        }
    }
}

/// GET /api/feed — posts newest-first with authors, reactions and comments.
#[handler]
pub async fn list_feed(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(_user) = require_user(depot, res) else {
        return;
    };
    let limit = req.query::<i64>("limit").unwrap_or(20).clamp(1, 50);
    let offset = req.query::<i64>("offset").unwrap_or(0).max(0);

    let state = web_state();
    let feed = state.db_manager.feed_store();
    let posts = match feed.list_posts(limit, offset).await {
        Ok(posts) => posts,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let mut authors = UserViewCache::new(state.db_manager.user_store());
    let mut views = Vec::with_capacity(posts.len());
    for post in &posts {
        match post_view(&feed, &mut authors, post).await {
            Ok(view) => views.push(view),
            Err(err) => {
                render_db_error(res, &err);
                return;
            }
        }
    }
    res.render(Json(views));
}

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    code_snippet: String,
    #[serde(default)]
    image_url: String,
    #[serde(rename = "type", default)]
    post_type: Option<String>,
}

/// POST /api/feed
#[handler]
pub async fn create_post(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let body: CreatePostRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    if body.content.trim().is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Content cannot be empty");
        return;
    }
    let post_type = match body.post_type.as_deref() {
        None | Some("") => PostType::Manual,
        Some(raw) => match PostType::parse(raw) {
            Some(post_type) => post_type,
            None => {
                render_error(res, StatusCode::BAD_REQUEST, "Invalid post type");
                return;
            }
        },
    };

    let state = web_state();
    let feed = state.db_manager.feed_store();
    let post = Post {
        id: Uuid::new_v4(),
        author_id: user.id,
        content: body.content,
        code_snippet: body.code_snippet,
        image_url: body.image_url,
        post_type,
        created_at: Utc::now(),
    };
    if let Err(err) = feed.create_post(&post).await {
        render_db_error(res, &err);
        return;
    }
    Metrics::feed_post_created();

    let mut authors = UserViewCache::new(state.db_manager.user_store());
    match post_view(&feed, &mut authors, &post).await {
        Ok(view) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(view));
        }
        Err(err) => render_db_error(res, &err),
    }
}

#[derive(Debug, Deserialize)]
struct ReactRequest {
    #[serde(rename = "type", default)]
    reaction_type: String,
}

/// POST /api/feed/{id}/react — toggles the caller's reaction.
#[handler]
pub async fn react_to_post(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let Some(post_id) = parse_post_id(req, res) else {
        return;
    };
    let body: ReactRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    let Some(reaction_type) = ReactionType::parse(&body.reaction_type) else {
        render_error(res, StatusCode::BAD_REQUEST, "Invalid reaction type");
        return;
    };

    let feed = web_state().db_manager.feed_store();
    match feed.get_post(post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Post not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }

    match feed.toggle_reaction(post_id, user.id, reaction_type).await {
        Ok(ReactionToggle::Added) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(json!({ "status": "added" })));
        }
        Ok(ReactionToggle::Removed) => {
            res.render(Json(json!({ "status": "removed" })));
        }
        Err(err) => render_db_error(res, &err),
    }
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    code_snippet: String,
}

/// POST /api/feed/{id}/comment
#[handler]
pub async fn comment_on_post(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let Some(post_id) = parse_post_id(req, res) else {
        return;
    };
    let body: CommentRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    if body.content.trim().is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Content cannot be empty");
        return;
    }

    let state = web_state();
    let feed = state.db_manager.feed_store();
    match feed.get_post(post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Post not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }

    let comment = Comment {
        id: 0,
        post_id,
        user_id: user.id,
        content: body.content,
        code_snippet: body.code_snippet,
        created_at: Utc::now(),
    };
    let stored = match feed.create_comment(&comment).await {
        Ok(stored) => stored,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let mut authors = UserViewCache::new(state.db_manager.user_store());
    match comment_view(&mut authors, &stored).await {
        Ok(view) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(view));
        }
        Err(err) => render_db_error(res, &err),
    }
}
