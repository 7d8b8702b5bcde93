use async_trait::async_trait;
use uuid::Uuid;

use super::DatabaseError;
use super::models::{
    Challenge, Channel, CodeforcesProfile, Comment, GitHubProfile, Post, ProfileUpdate, Reaction,
    ReactionType, Reply, Repository, Thread, User, UserProfile,
};

/// Whether an upsert inserted a fresh row or overwrote an existing one.
/// Link endpoints answer 201 for the former and 200 for the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionToggle {
    Added,
    Removed,
}

#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub profile: CodeforcesProfile,
    pub username: String,
    pub display_name: String,
    pub total_xp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadOrdering {
    #[default]
    Newest,
    Views,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadQuery {
    pub channel_id: Option<i64>,
    pub search: Option<String>,
    pub ordering: ThreadOrdering,
}

/// Settings toggled from the repository management endpoint.
#[derive(Debug, Clone, Default)]
pub struct RepositorySettings {
    pub is_active: Option<bool>,
    pub default_description: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DatabaseError>;
    async fn set_auth_token(&self, id: Uuid, token: &str) -> Result<(), DatabaseError>;
    async fn set_email(&self, id: Uuid, email: &str) -> Result<(), DatabaseError>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError>;
    async fn create_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError>;
    async fn get_profile_by_github_handle(
        &self,
        handle: &str,
    ) -> Result<Option<UserProfile>, DatabaseError>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<(), DatabaseError>;
    async fn set_github_handle(&self, user_id: Uuid, handle: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_cf_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CodeforcesProfile>, DatabaseError>;
    async fn upsert_cf_profile(
        &self,
        profile: &CodeforcesProfile,
    ) -> Result<UpsertOutcome, DatabaseError>;
    /// All Codeforces profiles ordered by rating, highest first, with the
    /// owner's identity and internal XP attached.
    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, DatabaseError>;
    async fn get_gh_profile(&self, user_id: Uuid)
    -> Result<Option<GitHubProfile>, DatabaseError>;
    async fn get_gh_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<GitHubProfile>, DatabaseError>;
    async fn upsert_gh_profile(
        &self,
        profile: &GitHubProfile,
    ) -> Result<UpsertOutcome, DatabaseError>;
    async fn list_challenges(&self) -> Result<Vec<Challenge>, DatabaseError>;
    async fn create_challenge(&self, challenge: &Challenge) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<(), DatabaseError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError>;
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, DatabaseError>;
    /// Reacting twice with the same type removes the reaction again.
    async fn toggle_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        reaction_type: ReactionType,
    ) -> Result<ReactionToggle, DatabaseError>;
    async fn list_reactions(&self, post_id: Uuid) -> Result<Vec<Reaction>, DatabaseError>;
    async fn create_comment(&self, comment: &Comment) -> Result<Comment, DatabaseError>;
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, DatabaseError>;
}

#[async_trait]
pub trait ForumStore: Send + Sync {
    async fn create_channel(&self, channel: &Channel) -> Result<Channel, DatabaseError>;
    async fn list_channels(&self) -> Result<Vec<Channel>, DatabaseError>;
    async fn get_channel(&self, id: i64) -> Result<Option<Channel>, DatabaseError>;
    async fn get_channel_by_slug(&self, slug: &str) -> Result<Option<Channel>, DatabaseError>;
    async fn create_thread(&self, thread: &Thread) -> Result<Thread, DatabaseError>;
    async fn get_thread(&self, id: i64) -> Result<Option<Thread>, DatabaseError>;
    async fn list_threads(&self, query: &ThreadQuery) -> Result<Vec<Thread>, DatabaseError>;
    async fn increment_thread_views(&self, id: i64) -> Result<(), DatabaseError>;
    /// One vote per (user, thread); re-voting overwrites the stored value.
    async fn upsert_vote(
        &self,
        thread_id: i64,
        user_id: Uuid,
        value: i32,
    ) -> Result<(), DatabaseError>;
    async fn vote_total(&self, thread_id: i64) -> Result<i64, DatabaseError>;
    async fn user_vote(&self, thread_id: i64, user_id: Uuid) -> Result<i32, DatabaseError>;
    async fn count_replies(&self, thread_id: i64) -> Result<i64, DatabaseError>;
    async fn create_reply(&self, reply: &Reply) -> Result<Reply, DatabaseError>;
    async fn list_replies(&self, thread_id: i64) -> Result<Vec<Reply>, DatabaseError>;
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Repository>, DatabaseError>;
    async fn get_for_user(
        &self,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<Repository>, DatabaseError>;
    async fn update_settings(
        &self,
        id: i64,
        user_id: Uuid,
        settings: &RepositorySettings,
    ) -> Result<Option<Repository>, DatabaseError>;
    async fn get_active_by_github_repo_id(
        &self,
        github_repo_id: &str,
    ) -> Result<Option<Repository>, DatabaseError>;
    /// Insert if missing, otherwise reactivate the tracked repository.
    async fn upsert(&self, repository: &Repository) -> Result<(), DatabaseError>;
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<(), DatabaseError>;
    async fn delete_for_user_by_github_repo_id(
        &self,
        user_id: Uuid,
        github_repo_id: &str,
    ) -> Result<(), DatabaseError>;
}
