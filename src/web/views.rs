use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::{
    Channel, CodeforcesProfile, Comment, GitHubProfile, Post, Reaction, Reply, Thread, User,
    UserProfile,
};
use crate::db::stores::LeaderboardRow;
use crate::db::{DatabaseError, FeedStore, UserStore};

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub profile: Option<UserProfile>,
}

impl UserView {
    pub fn new(user: &User, profile: Option<UserProfile>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            profile,
        }
    }

    pub async fn load(store: &Arc<dyn UserStore>, user: &User) -> Result<Self, DatabaseError> {
        let profile = store.get_profile(user.id).await?;
        Ok(Self::new(user, profile))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub user: UserView,
    pub content: String,
    pub code_snippet: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub author: UserView,
    pub content: String,
    pub code_snippet: String,
    pub image_url: String,
    #[serde(rename = "type")]
    pub post_type: &'static str,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
    pub comments: Vec<CommentView>,
    pub reaction_counts: HashMap<String, i64>,
    pub comment_count: usize,
}

/// Caches author lookups while a feed page is being assembled; feed pages
/// usually repeat authors.
pub struct UserViewCache {
    store: Arc<dyn UserStore>,
    cached: HashMap<Uuid, Option<UserView>>,
}

impl UserViewCache {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            cached: HashMap::new(),
        }
    }

    pub async fn get(&mut self, user_id: Uuid) -> Result<Option<UserView>, DatabaseError> {
        if let Some(view) = self.cached.get(&user_id) {
            return Ok(view.clone());
        }
        let view = match self.store.get_user_by_id(user_id).await? {
            Some(user) => Some(UserView::load(&self.store, &user).await?),
            None => None,
        };
        self.cached.insert(user_id, view.clone());
        Ok(view)
    }
}

fn anonymous_view(user_id: Uuid) -> UserView {
    UserView {
        id: user_id,
        username: "deleted".to_string(),
        email: String::new(),
        display_name: String::new(),
        profile: None,
    }
}

pub fn reaction_counts(reactions: &[Reaction]) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    for reaction in reactions {
        *counts
            .entry(reaction.reaction_type.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Assembles the full feed representation of one post.
pub async fn post_view(
    feed: &Arc<dyn FeedStore>,
    authors: &mut UserViewCache,
    post: &Post,
) -> Result<PostView, DatabaseError> {
    let author = authors
        .get(post.author_id)
        .await?
        .unwrap_or_else(|| anonymous_view(post.author_id));

    let reactions = feed.list_reactions(post.id).await?;
    let raw_comments = feed.list_comments(post.id).await?;
    let mut comments = Vec::with_capacity(raw_comments.len());
    for comment in raw_comments {
        comments.push(comment_view(authors, &comment).await?);
    }

    Ok(PostView {
        id: post.id,
        author,
        content: post.content.clone(),
        code_snippet: post.code_snippet.clone(),
        image_url: post.image_url.clone(),
        post_type: post.post_type.as_str(),
        created_at: post.created_at,
        reaction_counts: reaction_counts(&reactions),
        comment_count: comments.len(),
        reactions,
        comments,
    })
}

pub async fn comment_view(
    authors: &mut UserViewCache,
    comment: &Comment,
) -> Result<CommentView, DatabaseError> {
    let user = authors
        .get(comment.user_id)
        .await?
        .unwrap_or_else(|| anonymous_view(comment.user_id));
    Ok(CommentView {
        id: comment.id,
        user,
        content: comment.content.clone(),
        code_snippet: comment.code_snippet.clone(),
        created_at: comment.created_at,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeforcesProfileView {
    #[serde(flatten)]
    pub profile: CodeforcesProfile,
    pub combined_score: i64,
    pub username: String,
    pub display_name: String,
}

impl CodeforcesProfileView {
    pub fn new(profile: CodeforcesProfile, username: String, display_name: String, total_xp: i32) -> Self {
        let combined_score = profile.combined_score(total_xp);
        Self {
            profile,
            combined_score,
            username,
            display_name,
        }
    }

    pub fn from_leaderboard_row(row: LeaderboardRow) -> Self {
        Self::new(row.profile, row.username, row.display_name, row.total_xp)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GitHubProfileView {
    #[serde(flatten)]
    pub profile: GitHubProfile,
    pub username: String,
    pub display_name: String,
}

impl GitHubProfileView {
    pub fn new(profile: GitHubProfile, user: &User) -> Self {
        let display_name = if user.display_name.is_empty() {
            user.username.clone()
        } else {
            user.display_name.clone()
        };
        Self {
            profile,
            username: user.username.clone(),
            display_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    pub id: i64,
    pub thread: i64,
    pub author: UserView,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn reply_view(
    authors: &mut UserViewCache,
    reply: &Reply,
) -> Result<ReplyView, DatabaseError> {
    let author = authors
        .get(reply.author_id)
        .await?
        .unwrap_or_else(|| anonymous_view(reply.author_id));
    Ok(ReplyView {
        id: reply.id,
        thread: reply.thread_id,
        author,
        content: reply.content.clone(),
        created_at: reply.created_at,
        updated_at: reply.updated_at,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: UserView,
    pub channel: String,
    pub channel_slug: String,
    pub channel_color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pinned: bool,
    pub views: i32,
    pub tags: Vec<String>,
    pub reply_count: i64,
    pub vote_count: i64,
    pub user_vote: i32,
}

impl ThreadView {
    pub fn new(
        thread: &Thread,
        author: UserView,
        channel: &Channel,
        reply_count: i64,
        vote_count: i64,
        user_vote: i32,
    ) -> Self {
        Self {
            id: thread.id,
            title: thread.title.clone(),
            content: thread.content.clone(),
            author,
            channel: channel.slug.clone(),
            channel_slug: channel.slug.clone(),
            channel_color: channel.color.clone(),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
            pinned: thread.pinned,
            views: thread.views,
            tags: thread.tags.clone(),
            reply_count,
            vote_count,
            user_vote,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::reaction_counts;
    use crate::db::models::{Reaction, ReactionType};

    #[test]
    fn reaction_counts_groups_by_type() {
        let post_id = Uuid::new_v4();
        let reactions = vec![
            Reaction {
                id: 1,
                post_id,
                user_id: Uuid::new_v4(),
                reaction_type: ReactionType::Fire,
            },
            Reaction {
                id: 2,
                post_id,
                user_id: Uuid::new_v4(),
                reaction_type: ReactionType::Fire,
            },
            Reaction {
                id: 3,
                post_id,
                user_id: Uuid::new_v4(),
                reaction_type: ReactionType::Respect,
            },
        ];

        let counts = reaction_counts(&reactions);
        assert_eq!(counts.get("FIRE"), Some(&2));
        assert_eq!(counts.get("RESPECT"), Some(&1));
        assert_eq!(counts.get("BUG"), None);
    }
}
