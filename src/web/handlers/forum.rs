use chrono::Utc;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{DOWNVOTE, Reply, Thread, UPVOTE};
use crate::db::stores::{ThreadOrdering, ThreadQuery};
use crate::web::middleware::auth::{current_user, require_user};
use crate::web::views::{ThreadView, UserView, UserViewCache, reply_view};
use crate::web::web_state;

use super::{render_db_error, render_error};

/// GET /api/forum/channels
#[handler]
pub async fn list_channels(res: &mut Response) {
    match web_state().db_manager.forum_store().list_channels().await {
        Ok(channels) => res.render(Json(channels)),
        Err(err) => render_db_error(res, &err),
    }
}

fn parse_ordering(raw: Option<String>) -> ThreadOrdering {
    match raw.as_deref() {
        Some("views") | Some("-views") => ThreadOrdering::Views,
        _ => ThreadOrdering::Newest,
    }
}

async fn thread_view_for(
    thread: &Thread,
    authors: &mut UserViewCache,
    viewer: Option<uuid::Uuid>,
) -> Result<Option<ThreadView>, crate::db::DatabaseError> {
    let state = web_state();
    let forum = state.db_manager.forum_store();

    let Some(channel) = forum.get_channel(thread.channel_id).await? else {
        return Ok(None);
    };
    let author = match authors.get(thread.author_id).await? {
        Some(author) => author,
        None => UserView {
            id: thread.author_id,
            username: "deleted".to_string(),
            email: String::new(),
            display_name: String::new(),
            profile: None,
        },
    };
    let reply_count = forum.count_replies(thread.id).await?;
    let vote_count = forum.vote_total(thread.id).await?;
    let user_vote = match viewer {
        Some(user_id) => forum.user_vote(thread.id, user_id).await?,
        None => 0,
    };

    Ok(Some(ThreadView::new(
        thread,
        author,
        &channel,
        reply_count,
        vote_count,
        user_vote,
    )))
}

/// GET /api/forum/threads?channel=slug&search=&ordering=
#[handler]
pub async fn list_threads(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = web_state();
    let forum = state.db_manager.forum_store();

    let mut query = ThreadQuery {
        channel_id: None,
        search: req.query::<String>("search").filter(|s| !s.is_empty()),
        ordering: parse_ordering(req.query::<String>("ordering")),
    };

    if let Some(slug) = req.query::<String>("channel").filter(|s| !s.is_empty()) {
        match forum.get_channel_by_slug(&slug).await {
            Ok(Some(channel)) => query.channel_id = Some(channel.id),
            // Unknown channel slug filters everything out.
            Ok(None) => {
                res.render(Json(Vec::<ThreadView>::new()));
                return;
            }
            Err(err) => {
                render_db_error(res, &err);
                return;
            }
        }
    }

    let threads = match forum.list_threads(&query).await {
        Ok(threads) => threads,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let viewer = current_user(depot).map(|user| user.id);
    let mut authors = UserViewCache::new(state.db_manager.user_store());
    let mut views = Vec::with_capacity(threads.len());
    for thread in &threads {
        match thread_view_for(thread, &mut authors, viewer).await {
            Ok(Some(view)) => views.push(view),
            Ok(None) => {}
            Err(err) => {
                render_db_error(res, &err);
                return;
            }
        }
    }
    res.render(Json(views));
}

#[derive(Debug, Deserialize)]
struct CreateThreadRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// POST /api/forum/threads
#[handler]
pub async fn create_thread(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let body: CreateThreadRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    if body.title.trim().is_empty() || body.content.trim().is_empty() {
        render_error(res, StatusCode::BAD_REQUEST, "Title and content are required");
        return;
    }

    let state = web_state();
    let forum = state.db_manager.forum_store();
    let channel = match forum.get_channel_by_slug(&body.channel).await {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            render_error(res, StatusCode::BAD_REQUEST, "Unknown channel");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let now = Utc::now();
    let thread = Thread {
        id: 0,
        channel_id: channel.id,
        author_id: user.id,
        title: body.title,
        content: body.content,
        pinned: false,
        views: 0,
        tags: body.tags,
        created_at: now,
        updated_at: now,
    };
    let stored = match forum.create_thread(&thread).await {
        Ok(stored) => stored,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let mut authors = UserViewCache::new(state.db_manager.user_store());
    match thread_view_for(&stored, &mut authors, Some(user.id)).await {
        Ok(Some(view)) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(view));
        }
        Ok(None) => render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Channel disappeared"),
        Err(err) => render_db_error(res, &err),
    }
}

fn parse_thread_id(req: &Request, res: &mut Response) -> Option<i64> {
    match req.param::<i64>("id") {
        Some(thread_id) if thread_id > 0 => Some(thread_id),
        _ => {
            render_error(res, StatusCode::NOT_FOUND, "Thread not found");
            None
        }
    }
}

/// GET /api/forum/threads/{id} — bumps the view counter on read.
#[handler]
pub async fn get_thread(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(thread_id) = parse_thread_id(req, res) else {
        return;
    };
    let state = web_state();
    let forum = state.db_manager.forum_store();

    match forum.get_thread(thread_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Thread not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }
    if let Err(err) = forum.increment_thread_views(thread_id).await {
        render_db_error(res, &err);
        return;
    }
    let thread = match forum.get_thread(thread_id).await {
        Ok(Some(thread)) => thread,
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Thread not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let viewer = current_user(depot).map(|user| user.id);
    let mut authors = UserViewCache::new(state.db_manager.user_store());
    match thread_view_for(&thread, &mut authors, viewer).await {
        Ok(Some(view)) => res.render(Json(view)),
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "Thread not found"),
        Err(err) => render_db_error(res, &err),
    }
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    value: Option<i32>,
}

/// POST /api/forum/threads/{id}/vote — one vote per user per thread;
/// re-voting overwrites the stored value.
#[handler]
pub async fn vote_on_thread(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let Some(thread_id) = parse_thread_id(req, res) else {
        return;
    };
    let body: VoteRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(_) => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    let value = match body.value {
        Some(value) if value == UPVOTE || value == DOWNVOTE => value,
        _ => {
            render_error(res, StatusCode::BAD_REQUEST, "Invalid vote value");
            return;
        }
    };

    let forum = web_state().db_manager.forum_store();
    match forum.get_thread(thread_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Thread not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }

    match forum.upsert_vote(thread_id, user.id, value).await {
        Ok(()) => res.render(Json(json!({ "status": "voted", "value": value }))),
        Err(err) => render_db_error(res, &err),
    }
}

/// GET /api/forum/threads/{id}/replies
#[handler]
pub async fn list_thread_replies(req: &mut Request, res: &mut Response) {
    let Some(thread_id) = parse_thread_id(req, res) else {
        return;
    };
    let state = web_state();
    let forum = state.db_manager.forum_store();

    match forum.get_thread(thread_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Thread not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }

    let replies = match forum.list_replies(thread_id).await {
        Ok(replies) => replies,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let mut authors = UserViewCache::new(state.db_manager.user_store());
    let mut views = Vec::with_capacity(replies.len());
    for reply in &replies {
        match reply_view(&mut authors, reply).await {
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
struct CreateReplyRequest {
    #[serde(default)]
    content: String,
}

/// POST /api/forum/threads/{id}/reply
#[handler]
pub async fn create_reply(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user) = require_user(depot, res) else {
        return;
    };
    let Some(thread_id) = parse_thread_id(req, res) else {
        return;
    };
    let body: CreateReplyRequest = match req.parse_json().await {
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
    let forum = state.db_manager.forum_store();
    match forum.get_thread(thread_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "Thread not found");
            return;
        }
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    }

    let now = Utc::now();
    let reply = Reply {
        id: 0,
        thread_id,
        author_id: user.id,
        content: body.content,
        created_at: now,
        updated_at: now,
    };
    let stored = match forum.create_reply(&reply).await {
        Ok(stored) => stored,
        Err(err) => {
            render_db_error(res, &err);
            return;
        }
    };

    let mut authors = UserViewCache::new(state.db_manager.user_store());
    match reply_view(&mut authors, &stored).await {
        Ok(view) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(view));
        }
        Err(err) => render_db_error(res, &err),
    }
}
