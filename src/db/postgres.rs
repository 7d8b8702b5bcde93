use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::db::schema::{
    challenges, channels, codeforces_profiles, comments, github_profiles, posts, reactions,
    replies, repositories, threads, user_profiles, users, votes,
};

use super::stores::{
    LeaderboardRow, ReactionToggle, RepositorySettings, ThreadOrdering, ThreadQuery, UpsertOutcome,
};
use super::{
    DatabaseError,
    models::{
        Challenge, Channel, CodeforcesProfile, Comment, GitHubProfile, Post, PostType,
        ProfileUpdate, Reaction, ReactionType, Reply, Repository, Thread, User, UserProfile,
    },
};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

fn string_to_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("invalid uuid in database: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Query(e.to_string()))
}

fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::Query(format!("corrupt json column: {}", e)))
}

fn parse_post_type(raw: &str) -> Result<PostType, DatabaseError> {
    PostType::parse(raw)
        .ok_or_else(|| DatabaseError::Query(format!("unknown post type in database: {}", raw)))
}

fn parse_reaction_type(raw: &str) -> Result<ReactionType, DatabaseError> {
    ReactionType::parse(raw)
        .ok_or_else(|| DatabaseError::Query(format!("unknown reaction type in database: {}", raw)))
}

async fn with_conn<T, F>(pool: PgPool, f: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
struct DbUser {
    id: String,
    username: String,
    email: String,
    display_name: String,
    auth_token: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DbUser {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            auth_token: user.auth_token.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    fn into_user(self) -> Result<User, DatabaseError> {
        Ok(User {
            id: string_to_uuid(&self.id)?,
            username: self.username,
            email: self.email,
            display_name: self.display_name,
            auth_token: self.auth_token,
            is_verified: self.is_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_profiles)]
struct DbUserProfile {
    id: i64,
    user_id: String,
    headline: String,
    bio: String,
    avatar_url: String,
    github_handle: String,
    twitter_handle: String,
    linkedin_handle: String,
    elo_rating: i32,
    current_streak: i32,
    total_xp: i32,
}

impl DbUserProfile {
    fn into_profile(self) -> Result<UserProfile, DatabaseError> {
        Ok(UserProfile {
            id: self.id,
            user_id: string_to_uuid(&self.user_id)?,
            headline: self.headline,
            bio: self.bio,
            avatar_url: self.avatar_url,
            github_handle: self.github_handle,
            twitter_handle: self.twitter_handle,
            linkedin_handle: self.linkedin_handle,
            elo_rating: self.elo_rating,
            current_streak: self.current_streak,
            total_xp: self.total_xp,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = user_profiles)]
struct NewUserProfile<'a> {
    user_id: String,
    headline: &'a str,
    bio: &'a str,
    avatar_url: &'a str,
    github_handle: &'a str,
    twitter_handle: &'a str,
    linkedin_handle: &'a str,
    elo_rating: i32,
    current_streak: i32,
    total_xp: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = codeforces_profiles)]
struct DbCfProfile {
    id: i64,
    user_id: String,
    handle: String,
    rating: i32,
    max_rating: i32,
    rank: String,
    max_rank: String,
    avatar_url: String,
    contribution: i32,
    friend_count: i32,
    problems_solved: i32,
    last_synced: DateTime<Utc>,
}

impl DbCfProfile {
    fn into_profile(self) -> Result<CodeforcesProfile, DatabaseError> {
        Ok(CodeforcesProfile {
            id: self.id,
            user_id: string_to_uuid(&self.user_id)?,
            handle: self.handle,
            rating: self.rating,
            max_rating: self.max_rating,
            rank: self.rank,
            max_rank: self.max_rank,
            avatar_url: self.avatar_url,
            contribution: self.contribution,
            friend_count: self.friend_count,
            problems_solved: self.problems_solved,
            last_synced: self.last_synced,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = codeforces_profiles)]
struct NewCfProfile<'a> {
    user_id: String,
    handle: &'a str,
    rating: i32,
    max_rating: i32,
    rank: &'a str,
    max_rank: &'a str,
    avatar_url: &'a str,
    contribution: i32,
    friend_count: i32,
    problems_solved: i32,
    last_synced: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = codeforces_profiles)]
struct UpdateCfProfile<'a> {
    handle: &'a str,
    rating: i32,
    max_rating: i32,
    rank: &'a str,
    max_rank: &'a str,
    avatar_url: &'a str,
    contribution: i32,
    friend_count: i32,
    problems_solved: i32,
    last_synced: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = github_profiles)]
struct DbGhProfile {
    id: i64,
    user_id: String,
    username: String,
    github_id: Option<i64>,
    avatar_url: String,
    html_url: String,
    bio: String,
    company: String,
    location: String,
    blog: String,
    public_repos: i32,
    public_gists: i32,
    followers: i32,
    following: i32,
    total_commits: i32,
    total_prs: i32,
    total_issues: i32,
    total_stars_received: i32,
    top_languages: String,
    top_repos: String,
    access_token: String,
    last_synced: DateTime<Utc>,
    github_created_at: Option<DateTime<Utc>>,
}

impl DbGhProfile {
    fn into_profile(self) -> Result<GitHubProfile, DatabaseError> {
        Ok(GitHubProfile {
            id: self.id,
            user_id: string_to_uuid(&self.user_id)?,
            username: self.username,
            github_id: self.github_id,
            avatar_url: self.avatar_url,
            html_url: self.html_url,
            bio: self.bio,
            company: self.company,
            location: self.location,
            blog: self.blog,
            public_repos: self.public_repos,
            public_gists: self.public_gists,
            followers: self.followers,
            following: self.following,
            total_commits: self.total_commits,
            total_prs: self.total_prs,
            total_issues: self.total_issues,
            total_stars_received: self.total_stars_received,
            top_languages: from_json(&self.top_languages)?,
            top_repos: from_json(&self.top_repos)?,
            access_token: self.access_token,
            last_synced: self.last_synced,
            github_created_at: self.github_created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = github_profiles)]
struct NewGhProfile<'a> {
    user_id: String,
    username: &'a str,
    github_id: Option<i64>,
    avatar_url: &'a str,
    html_url: &'a str,
    bio: &'a str,
    company: &'a str,
    location: &'a str,
    blog: &'a str,
    public_repos: i32,
    public_gists: i32,
    followers: i32,
    following: i32,
    total_commits: i32,
    total_prs: i32,
    total_issues: i32,
    total_stars_received: i32,
    top_languages: String,
    top_repos: String,
    access_token: &'a str,
    last_synced: DateTime<Utc>,
    github_created_at: Option<DateTime<Utc>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = github_profiles)]
struct UpdateGhProfile<'a> {
    username: &'a str,
    github_id: Option<i64>,
    avatar_url: &'a str,
    html_url: &'a str,
    bio: &'a str,
    company: &'a str,
    location: &'a str,
    blog: &'a str,
    public_repos: i32,
    public_gists: i32,
    followers: i32,
    following: i32,
    total_commits: i32,
    total_prs: i32,
    total_issues: i32,
    total_stars_received: i32,
    top_languages: String,
    top_repos: String,
    access_token: &'a str,
    last_synced: DateTime<Utc>,
    github_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = posts)]
struct DbPost {
    id: String,
    author_id: String,
    content: String,
    code_snippet: String,
    image_url: String,
    post_type: String,
    created_at: DateTime<Utc>,
}

impl DbPost {
    fn from_post(post: &Post) -> Self {
        Self {
            id: post.id.to_string(),
            author_id: post.author_id.to_string(),
            content: post.content.clone(),
            code_snippet: post.code_snippet.clone(),
            image_url: post.image_url.clone(),
            post_type: post.post_type.as_str().to_string(),
            created_at: post.created_at,
        }
    }

    fn into_post(self) -> Result<Post, DatabaseError> {
        Ok(Post {
            id: string_to_uuid(&self.id)?,
            author_id: string_to_uuid(&self.author_id)?,
            content: self.content,
            code_snippet: self.code_snippet,
            image_url: self.image_url,
            post_type: parse_post_type(&self.post_type)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reactions)]
struct DbReaction {
    id: i64,
    post_id: String,
    user_id: String,
    reaction_type: String,
}

impl DbReaction {
    fn into_reaction(self) -> Result<Reaction, DatabaseError> {
        Ok(Reaction {
            id: self.id,
            post_id: string_to_uuid(&self.post_id)?,
            user_id: string_to_uuid(&self.user_id)?,
            reaction_type: parse_reaction_type(&self.reaction_type)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = reactions)]
struct NewReaction {
    post_id: String,
    user_id: String,
    reaction_type: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
struct DbComment {
    id: i64,
    post_id: String,
    user_id: String,
    content: String,
    code_snippet: String,
    created_at: DateTime<Utc>,
}

impl DbComment {
    fn into_comment(self) -> Result<Comment, DatabaseError> {
        Ok(Comment {
            id: self.id,
            post_id: string_to_uuid(&self.post_id)?,
            user_id: string_to_uuid(&self.user_id)?,
            content: self.content,
            code_snippet: self.code_snippet,
            created_at: self.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
struct NewComment<'a> {
    post_id: String,
    user_id: String,
    content: &'a str,
    code_snippet: &'a str,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = channels)]
struct DbChannel {
    id: i64,
    name: String,
    description: String,
    slug: String,
    color: String,
}

impl DbChannel {
    fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            name: self.name,
            description: self.description,
            slug: self.slug,
            color: self.color,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = channels)]
struct NewChannel<'a> {
    name: &'a str,
    description: &'a str,
    slug: &'a str,
    color: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = threads)]
struct DbThread {
    id: i64,
    channel_id: i64,
    author_id: String,
    title: String,
    content: String,
    pinned: bool,
    views: i32,
    tags: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DbThread {
    fn into_thread(self) -> Result<Thread, DatabaseError> {
        Ok(Thread {
            id: self.id,
            channel_id: self.channel_id,
            author_id: string_to_uuid(&self.author_id)?,
            title: self.title,
            content: self.content,
            pinned: self.pinned,
            views: self.views,
            tags: from_json(&self.tags)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = threads)]
struct NewThread<'a> {
    channel_id: i64,
    author_id: String,
    title: &'a str,
    content: &'a str,
    pinned: bool,
    views: i32,
    tags: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = replies)]
struct DbReply {
    id: i64,
    thread_id: i64,
    author_id: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DbReply {
    fn into_reply(self) -> Result<Reply, DatabaseError> {
        Ok(Reply {
            id: self.id,
            thread_id: self.thread_id,
            author_id: string_to_uuid(&self.author_id)?,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = replies)]
struct NewReply<'a> {
    thread_id: i64,
    author_id: String,
    content: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = votes)]
struct NewVote {
    thread_id: i64,
    user_id: String,
    value: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = repositories)]
struct DbRepository {
    id: i64,
    user_id: String,
    github_repo_id: String,
    full_name: String,
    html_url: String,
    is_active: bool,
    default_description: String,
}

impl DbRepository {
    fn into_repository(self) -> Result<Repository, DatabaseError> {
        Ok(Repository {
            id: self.id,
            user_id: string_to_uuid(&self.user_id)?,
            github_repo_id: self.github_repo_id,
            full_name: self.full_name,
            html_url: self.html_url,
            is_active: self.is_active,
            default_description: self.default_description,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = repositories)]
struct NewRepository<'a> {
    user_id: String,
    github_repo_id: &'a str,
    full_name: &'a str,
    html_url: &'a str,
    is_active: bool,
    default_description: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = challenges)]
struct DbChallenge {
    id: String,
    title: String,
    description: String,
    difficulty: String,
    points: i32,
}

impl DbChallenge {
    fn from_challenge(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id.to_string(),
            title: challenge.title.clone(),
            description: challenge.description.clone(),
            difficulty: challenge.difficulty.clone(),
            points: challenge.points,
        }
    }

    fn into_challenge(self) -> Result<Challenge, DatabaseError> {
        Ok(Challenge {
            id: string_to_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            difficulty: self.difficulty,
            points: self.points,
        })
    }
}

pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::UserStore for PostgresUserStore {
    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        let row = DbUser::from_user(user);
        with_conn(self.pool.clone(), move |conn| {
            diesel::insert_into(users::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            users::table
                .filter(users::id.eq(key))
                .select(DbUser::as_select())
                .first::<DbUser>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbUser::into_user)
                .transpose()
        })
        .await
    }

    async fn get_user_by_username(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let name = name.to_string();
        with_conn(self.pool.clone(), move |conn| {
            users::table
                .filter(users::username.eq(name))
                .select(DbUser::as_select())
                .first::<DbUser>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbUser::into_user)
                .transpose()
        })
        .await
    }

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DatabaseError> {
        let token = token.to_string();
        with_conn(self.pool.clone(), move |conn| {
            users::table
                .filter(users::auth_token.eq(token))
                .select(DbUser::as_select())
                .first::<DbUser>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbUser::into_user)
                .transpose()
        })
        .await
    }

    async fn set_auth_token(&self, user_id: Uuid, token: &str) -> Result<(), DatabaseError> {
        let key = user_id.to_string();
        let token = token.to_string();
        with_conn(self.pool.clone(), move |conn| {
            diesel::update(users::table.filter(users::id.eq(key)))
                .set((users::auth_token.eq(token), users::updated_at.eq(Utc::now())))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn set_email(&self, user_id: Uuid, email: &str) -> Result<(), DatabaseError> {
        let key = user_id.to_string();
        let email = email.to_string();
        with_conn(self.pool.clone(), move |conn| {
            diesel::update(users::table.filter(users::id.eq(key)))
                .set((users::email.eq(email), users::updated_at.eq(Utc::now())))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            users::table
                .order(users::created_at.desc())
                .limit(limit)
                .offset(offset)
                .select(DbUser::as_select())
                .load::<DbUser>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbUser::into_user)
                .collect()
        })
        .await
    }

    async fn create_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let profile = profile.clone();
        with_conn(self.pool.clone(), move |conn| {
            let row = NewUserProfile {
                user_id: profile.user_id.to_string(),
                headline: &profile.headline,
                bio: &profile.bio,
                avatar_url: &profile.avatar_url,
                github_handle: &profile.github_handle,
                twitter_handle: &profile.twitter_handle,
                linkedin_handle: &profile.linkedin_handle,
                elo_rating: profile.elo_rating,
                current_streak: profile.current_streak,
                total_xp: profile.total_xp,
            };
            diesel::insert_into(user_profiles::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            user_profiles::table
                .filter(user_profiles::user_id.eq(key))
                .select(DbUserProfile::as_select())
                .first::<DbUserProfile>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbUserProfile::into_profile)
                .transpose()
        })
        .await
    }

    async fn get_profile_by_github_handle(
        &self,
        handle: &str,
    ) -> Result<Option<UserProfile>, DatabaseError> {
        let handle = handle.to_string();
        with_conn(self.pool.clone(), move |conn| {
            user_profiles::table
                .filter(user_profiles::github_handle.eq(handle))
                .select(DbUserProfile::as_select())
                .first::<DbUserProfile>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbUserProfile::into_profile)
                .transpose()
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<(), DatabaseError> {
        let key = user_id.to_string();
        let update = update.clone();
        with_conn(self.pool.clone(), move |conn| {
            let existing = user_profiles::table
                .filter(user_profiles::user_id.eq(&key))
                .select(DbUserProfile::as_select())
                .first::<DbUserProfile>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let Some(mut row) = existing else {
                return Err(DatabaseError::Query(format!(
                    "no profile row for user {}",
                    key
                )));
            };

            if let Some(headline) = update.headline {
                row.headline = headline;
            }
            if let Some(bio) = update.bio {
                row.bio = bio;
            }
            if let Some(avatar_url) = update.avatar_url {
                row.avatar_url = avatar_url;
            }
            if let Some(github_handle) = update.github_handle {
                row.github_handle = github_handle;
            }
            if let Some(twitter_handle) = update.twitter_handle {
                row.twitter_handle = twitter_handle;
            }
            if let Some(linkedin_handle) = update.linkedin_handle {
                row.linkedin_handle = linkedin_handle;
            }

            diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(&key)))
                .set((
                    user_profiles::headline.eq(row.headline),
                    user_profiles::bio.eq(row.bio),
                    user_profiles::avatar_url.eq(row.avatar_url),
                    user_profiles::github_handle.eq(row.github_handle),
                    user_profiles::twitter_handle.eq(row.twitter_handle),
                    user_profiles::linkedin_handle.eq(row.linkedin_handle),
                ))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn set_github_handle(&self, user_id: Uuid, handle: &str) -> Result<(), DatabaseError> {
        let key = user_id.to_string();
        let handle = handle.to_string();
        with_conn(self.pool.clone(), move |conn| {
            diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(key)))
                .set(user_profiles::github_handle.eq(handle))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }
}

pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::ProfileStore for PostgresProfileStore {
    async fn get_cf_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CodeforcesProfile>, DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            codeforces_profiles::table
                .filter(codeforces_profiles::user_id.eq(key))
                .select(DbCfProfile::as_select())
                .first::<DbCfProfile>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbCfProfile::into_profile)
                .transpose()
        })
        .await
    }

    async fn upsert_cf_profile(
        &self,
        profile: &CodeforcesProfile,
    ) -> Result<UpsertOutcome, DatabaseError> {
        let profile = profile.clone();
        with_conn(self.pool.clone(), move |conn| {
            let key = profile.user_id.to_string();
            let exists = codeforces_profiles::table
                .filter(codeforces_profiles::user_id.eq(&key))
                .select(codeforces_profiles::id)
                .first::<i64>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            match exists {
                Some(_) => {
                    let changes = UpdateCfProfile {
                        handle: &profile.handle,
                        rating: profile.rating,
                        max_rating: profile.max_rating,
                        rank: &profile.rank,
                        max_rank: &profile.max_rank,
                        avatar_url: &profile.avatar_url,
                        contribution: profile.contribution,
                        friend_count: profile.friend_count,
                        problems_solved: profile.problems_solved,
                        last_synced: profile.last_synced,
                    };
                    diesel::update(
                        codeforces_profiles::table
                            .filter(codeforces_profiles::user_id.eq(&key)),
                    )
                    .set(&changes)
                    .execute(conn)
                    .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    Ok(UpsertOutcome::Updated)
                }
                None => {
                    let row = NewCfProfile {
                        user_id: key,
                        handle: &profile.handle,
                        rating: profile.rating,
                        max_rating: profile.max_rating,
                        rank: &profile.rank,
                        max_rank: &profile.max_rank,
                        avatar_url: &profile.avatar_url,
                        contribution: profile.contribution,
                        friend_count: profile.friend_count,
                        problems_solved: profile.problems_solved,
                        last_synced: profile.last_synced,
                    };
                    diesel::insert_into(codeforces_profiles::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    Ok(UpsertOutcome::Created)
                }
            }
        })
        .await
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            let profiles = codeforces_profiles::table
                .order(codeforces_profiles::rating.desc())
                .select(DbCfProfile::as_select())
                .load::<DbCfProfile>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let mut rows = Vec::with_capacity(profiles.len());
            for db_profile in profiles {
                let owner_id = db_profile.user_id.clone();
                let user = users::table
                    .filter(users::id.eq(&owner_id))
                    .select(DbUser::as_select())
                    .first::<DbUser>(conn)
                    .optional()
                    .map_err(|e| DatabaseError::Query(e.to_string()))?;
                let Some(user) = user else {
                    continue;
                };
                let total_xp = user_profiles::table
                    .filter(user_profiles::user_id.eq(&owner_id))
                    .select(user_profiles::total_xp)
                    .first::<i32>(conn)
                    .optional()
                    .map_err(|e| DatabaseError::Query(e.to_string()))?
                    .unwrap_or(0);

                let profile = db_profile.into_profile()?;
                let display_name = if user.display_name.is_empty() {
                    profile.handle.clone()
                } else {
                    user.display_name.clone()
                };
                rows.push(LeaderboardRow {
                    profile,
                    username: user.username,
                    display_name,
                    total_xp,
                });
            }
            Ok(rows)
        })
        .await
    }

    async fn get_gh_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<GitHubProfile>, DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            github_profiles::table
                .filter(github_profiles::user_id.eq(key))
                .select(DbGhProfile::as_select())
                .first::<DbGhProfile>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbGhProfile::into_profile)
                .transpose()
        })
        .await
    }

    async fn get_gh_profile_by_username(
        &self,
        name: &str,
    ) -> Result<Option<GitHubProfile>, DatabaseError> {
        let name = name.to_string();
        with_conn(self.pool.clone(), move |conn| {
            github_profiles::table
                .filter(github_profiles::username.eq(name))
                .select(DbGhProfile::as_select())
                .first::<DbGhProfile>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbGhProfile::into_profile)
                .transpose()
        })
        .await
    }

    async fn upsert_gh_profile(
        &self,
        profile: &GitHubProfile,
    ) -> Result<UpsertOutcome, DatabaseError> {
        let profile = profile.clone();
        with_conn(self.pool.clone(), move |conn| {
            let key = profile.user_id.to_string();
            let top_languages = to_json(&profile.top_languages)?;
            let top_repos = to_json(&profile.top_repos)?;

            let exists = github_profiles::table
                .filter(github_profiles::user_id.eq(&key))
                .select(github_profiles::id)
                .first::<i64>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            match exists {
                Some(_) => {
                    let changes = UpdateGhProfile {
                        username: &profile.username,
                        github_id: profile.github_id,
                        avatar_url: &profile.avatar_url,
                        html_url: &profile.html_url,
                        bio: &profile.bio,
                        company: &profile.company,
                        location: &profile.location,
                        blog: &profile.blog,
                        public_repos: profile.public_repos,
                        public_gists: profile.public_gists,
                        followers: profile.followers,
                        following: profile.following,
                        total_commits: profile.total_commits,
                        total_prs: profile.total_prs,
                        total_issues: profile.total_issues,
                        total_stars_received: profile.total_stars_received,
                        top_languages,
                        top_repos,
                        access_token: &profile.access_token,
                        last_synced: profile.last_synced,
                        github_created_at: profile.github_created_at,
                    };
                    diesel::update(
                        github_profiles::table.filter(github_profiles::user_id.eq(&key)),
                    )
                    .set(&changes)
                    .execute(conn)
                    .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    Ok(UpsertOutcome::Updated)
                }
                None => {
                    let row = NewGhProfile {
                        user_id: key,
                        username: &profile.username,
                        github_id: profile.github_id,
                        avatar_url: &profile.avatar_url,
                        html_url: &profile.html_url,
                        bio: &profile.bio,
                        company: &profile.company,
                        location: &profile.location,
                        blog: &profile.blog,
                        public_repos: profile.public_repos,
                        public_gists: profile.public_gists,
                        followers: profile.followers,
                        following: profile.following,
                        total_commits: profile.total_commits,
                        total_prs: profile.total_prs,
                        total_issues: profile.total_issues,
                        total_stars_received: profile.total_stars_received,
                        top_languages,
                        top_repos,
                        access_token: &profile.access_token,
                        last_synced: profile.last_synced,
                        github_created_at: profile.github_created_at,
                    };
                    diesel::insert_into(github_profiles::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    Ok(UpsertOutcome::Created)
                }
            }
        })
        .await
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            challenges::table
                .order(challenges::points.asc())
                .select(DbChallenge::as_select())
                .load::<DbChallenge>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbChallenge::into_challenge)
                .collect()
        })
        .await
    }

    async fn create_challenge(&self, challenge: &Challenge) -> Result<(), DatabaseError> {
        let row = DbChallenge::from_challenge(challenge);
        with_conn(self.pool.clone(), move |conn| {
            diesel::insert_into(challenges::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }
}

pub struct PostgresFeedStore {
    pool: PgPool,
}

impl PostgresFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::FeedStore for PostgresFeedStore {
    async fn create_post(&self, post: &Post) -> Result<(), DatabaseError> {
        let row = DbPost::from_post(post);
        with_conn(self.pool.clone(), move |conn| {
            diesel::insert_into(posts::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let key = post_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            posts::table
                .filter(posts::id.eq(key))
                .select(DbPost::as_select())
                .first::<DbPost>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbPost::into_post)
                .transpose()
        })
        .await
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            posts::table
                .order(posts::created_at.desc())
                .limit(limit)
                .offset(offset)
                .select(DbPost::as_select())
                .load::<DbPost>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbPost::into_post)
                .collect()
        })
        .await
    }

    async fn toggle_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        reaction_type: ReactionType,
    ) -> Result<ReactionToggle, DatabaseError> {
        let post_key = post_id.to_string();
        let user_key = user_id.to_string();
        let kind = reaction_type.as_str().to_string();
        with_conn(self.pool.clone(), move |conn| {
            let existing = reactions::table
                .filter(
                    reactions::post_id
                        .eq(&post_key)
                        .and(reactions::user_id.eq(&user_key))
                        .and(reactions::reaction_type.eq(&kind)),
                )
                .select(reactions::id)
                .first::<i64>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            match existing {
                Some(reaction_id) => {
                    diesel::delete(reactions::table.filter(reactions::id.eq(reaction_id)))
                        .execute(conn)
                        .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    Ok(ReactionToggle::Removed)
                }
                None => {
                    let row = NewReaction {
                        post_id: post_key,
                        user_id: user_key,
                        reaction_type: kind,
                    };
                    diesel::insert_into(reactions::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    Ok(ReactionToggle::Added)
                }
            }
        })
        .await
    }

    async fn list_reactions(&self, post_id: Uuid) -> Result<Vec<Reaction>, DatabaseError> {
        let key = post_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            reactions::table
                .filter(reactions::post_id.eq(key))
                .order(reactions::id.asc())
                .select(DbReaction::as_select())
                .load::<DbReaction>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbReaction::into_reaction)
                .collect()
        })
        .await
    }

    async fn create_comment(&self, comment: &Comment) -> Result<Comment, DatabaseError> {
        let comment = comment.clone();
        with_conn(self.pool.clone(), move |conn| {
            let row = NewComment {
                post_id: comment.post_id.to_string(),
                user_id: comment.user_id.to_string(),
                content: &comment.content,
                code_snippet: &comment.code_snippet,
                created_at: comment.created_at,
            };
            diesel::insert_into(comments::table)
                .values(&row)
                .returning(DbComment::as_returning())
                .get_result::<DbComment>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_comment()
        })
        .await
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, DatabaseError> {
        let key = post_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            comments::table
                .filter(comments::post_id.eq(key))
                .order(comments::created_at.asc())
                .select(DbComment::as_select())
                .load::<DbComment>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbComment::into_comment)
                .collect()
        })
        .await
    }
}

pub struct PostgresForumStore {
    pool: PgPool,
}

impl PostgresForumStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::ForumStore for PostgresForumStore {
    async fn create_channel(&self, channel: &Channel) -> Result<Channel, DatabaseError> {
        let channel = channel.clone();
        with_conn(self.pool.clone(), move |conn| {
            let row = NewChannel {
                name: &channel.name,
                description: &channel.description,
                slug: &channel.slug,
                color: &channel.color,
            };
            let stored = diesel::insert_into(channels::table)
                .values(&row)
                .returning(DbChannel::as_returning())
                .get_result::<DbChannel>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(stored.into_channel())
        })
        .await
    }

    async fn list_channels(&self) -> Result<Vec<Channel>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            Ok(channels::table
                .order(channels::name.asc())
                .select(DbChannel::as_select())
                .load::<DbChannel>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbChannel::into_channel)
                .collect())
        })
        .await
    }

    async fn get_channel(&self, channel_id: i64) -> Result<Option<Channel>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            Ok(channels::table
                .filter(channels::id.eq(channel_id))
                .select(DbChannel::as_select())
                .first::<DbChannel>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbChannel::into_channel))
        })
        .await
    }

    async fn get_channel_by_slug(&self, slug: &str) -> Result<Option<Channel>, DatabaseError> {
        let slug = slug.to_string();
        with_conn(self.pool.clone(), move |conn| {
            Ok(channels::table
                .filter(channels::slug.eq(slug))
                .select(DbChannel::as_select())
                .first::<DbChannel>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbChannel::into_channel))
        })
        .await
    }

    async fn create_thread(&self, thread: &Thread) -> Result<Thread, DatabaseError> {
        let thread = thread.clone();
        with_conn(self.pool.clone(), move |conn| {
            let tags = to_json(&thread.tags)?;
            let row = NewThread {
                channel_id: thread.channel_id,
                author_id: thread.author_id.to_string(),
                title: &thread.title,
                content: &thread.content,
                pinned: thread.pinned,
                views: thread.views,
                tags,
                created_at: thread.created_at,
                updated_at: thread.updated_at,
            };
            diesel::insert_into(threads::table)
                .values(&row)
                .returning(DbThread::as_returning())
                .get_result::<DbThread>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_thread()
        })
        .await
    }

    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            threads::table
                .filter(threads::id.eq(thread_id))
                .select(DbThread::as_select())
                .first::<DbThread>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbThread::into_thread)
                .transpose()
        })
        .await
    }

    async fn list_threads(&self, query: &ThreadQuery) -> Result<Vec<Thread>, DatabaseError> {
        let query = query.clone();
        with_conn(self.pool.clone(), move |conn| {
            let mut statement = threads::table.into_boxed();
            if let Some(channel_id) = query.channel_id {
                statement = statement.filter(threads::channel_id.eq(channel_id));
            }
            if let Some(ref search) = query.search {
                let pattern = format!("%{}%", search);
                statement = statement.filter(
                    threads::title
                        .like(pattern.clone())
                        .or(threads::content.like(pattern)),
                );
            }
            statement = match query.ordering {
                ThreadOrdering::Newest => statement.order(threads::created_at.desc()),
                ThreadOrdering::Views => statement.order(threads::views.desc()),
            };
            statement
                .select(DbThread::as_select())
                .load::<DbThread>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbThread::into_thread)
                .collect()
        })
        .await
    }

    async fn increment_thread_views(&self, thread_id: i64) -> Result<(), DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            diesel::update(threads::table.filter(threads::id.eq(thread_id)))
                .set(threads::views.eq(threads::views + 1))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn upsert_vote(
        &self,
        thread_id: i64,
        user_id: Uuid,
        value: i32,
    ) -> Result<(), DatabaseError> {
        let user_key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            let row = NewVote {
                thread_id,
                user_id: user_key,
                value,
                created_at: Utc::now(),
            };
            diesel::insert_into(votes::table)
                .values(&row)
                .on_conflict((votes::user_id, votes::thread_id))
                .do_update()
                .set(votes::value.eq(value))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn vote_total(&self, thread_id: i64) -> Result<i64, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            let total: Option<i64> = votes::table
                .filter(votes::thread_id.eq(thread_id))
                .select(diesel::dsl::sum(votes::value))
                .first(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(total.unwrap_or(0))
        })
        .await
    }

    async fn user_vote(&self, thread_id: i64, user_id: Uuid) -> Result<i32, DatabaseError> {
        let user_key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            let value = votes::table
                .filter(
                    votes::thread_id
                        .eq(thread_id)
                        .and(votes::user_id.eq(user_key)),
                )
                .select(votes::value)
                .first::<i32>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(value.unwrap_or(0))
        })
        .await
    }

    async fn count_replies(&self, thread_id: i64) -> Result<i64, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            replies::table
                .filter(replies::thread_id.eq(thread_id))
                .count()
                .get_result::<i64>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn create_reply(&self, reply: &Reply) -> Result<Reply, DatabaseError> {
        let reply = reply.clone();
        with_conn(self.pool.clone(), move |conn| {
            let row = NewReply {
                thread_id: reply.thread_id,
                author_id: reply.author_id.to_string(),
                content: &reply.content,
                created_at: reply.created_at,
                updated_at: reply.updated_at,
            };
            diesel::insert_into(replies::table)
                .values(&row)
                .returning(DbReply::as_returning())
                .get_result::<DbReply>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_reply()
        })
        .await
    }

    async fn list_replies(&self, thread_id: i64) -> Result<Vec<Reply>, DatabaseError> {
        with_conn(self.pool.clone(), move |conn| {
            replies::table
                .filter(replies::thread_id.eq(thread_id))
                .order(replies::created_at.asc())
                .select(DbReply::as_select())
                .load::<DbReply>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbReply::into_reply)
                .collect()
        })
        .await
    }
}

pub struct PostgresRepositoryStore {
    pool: PgPool,
}

impl PostgresRepositoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::RepositoryStore for PostgresRepositoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Repository>, DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            repositories::table
                .filter(repositories::user_id.eq(key))
                .order(repositories::full_name.asc())
                .select(DbRepository::as_select())
                .load::<DbRepository>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .into_iter()
                .map(DbRepository::into_repository)
                .collect()
        })
        .await
    }

    async fn get_for_user(
        &self,
        repo_id: i64,
        user_id: Uuid,
    ) -> Result<Option<Repository>, DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            repositories::table
                .filter(repositories::id.eq(repo_id).and(repositories::user_id.eq(key)))
                .select(DbRepository::as_select())
                .first::<DbRepository>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbRepository::into_repository)
                .transpose()
        })
        .await
    }

    async fn update_settings(
        &self,
        repo_id: i64,
        user_id: Uuid,
        settings: &RepositorySettings,
    ) -> Result<Option<Repository>, DatabaseError> {
        let key = user_id.to_string();
        let settings = settings.clone();
        with_conn(self.pool.clone(), move |conn| {
            let existing = repositories::table
                .filter(repositories::id.eq(repo_id).and(repositories::user_id.eq(&key)))
                .select(DbRepository::as_select())
                .first::<DbRepository>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let Some(mut row) = existing else {
                return Ok(None);
            };
            if let Some(active) = settings.is_active {
                row.is_active = active;
            }
            if let Some(description) = settings.default_description {
                row.default_description = description;
            }

            diesel::update(repositories::table.filter(repositories::id.eq(repo_id)))
                .set((
                    repositories::is_active.eq(row.is_active),
                    repositories::default_description.eq(row.default_description.clone()),
                ))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            row.into_repository().map(Some)
        })
        .await
    }

    async fn get_active_by_github_repo_id(
        &self,
        github_repo_id: &str,
    ) -> Result<Option<Repository>, DatabaseError> {
        let repo_key = github_repo_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            repositories::table
                .filter(
                    repositories::github_repo_id
                        .eq(repo_key)
                        .and(repositories::is_active.eq(true)),
                )
                .select(DbRepository::as_select())
                .first::<DbRepository>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(DbRepository::into_repository)
                .transpose()
        })
        .await
    }

    async fn upsert(&self, repository: &Repository) -> Result<(), DatabaseError> {
        let repository = repository.clone();
        with_conn(self.pool.clone(), move |conn| {
            let user_key = repository.user_id.to_string();
            let existing = repositories::table
                .filter(
                    repositories::user_id
                        .eq(&user_key)
                        .and(repositories::github_repo_id.eq(&repository.github_repo_id)),
                )
                .select(DbRepository::as_select())
                .first::<DbRepository>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            match existing {
                Some(row) => {
                    if !row.is_active {
                        diesel::update(repositories::table.filter(repositories::id.eq(row.id)))
                            .set(repositories::is_active.eq(true))
                            .execute(conn)
                            .map_err(|e| DatabaseError::Query(e.to_string()))?;
                    }
                }
                None => {
                    let row = NewRepository {
                        user_id: user_key,
                        github_repo_id: &repository.github_repo_id,
                        full_name: &repository.full_name,
                        html_url: &repository.html_url,
                        is_active: repository.is_active,
                        default_description: &repository.default_description,
                    };
                    diesel::insert_into(repositories::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(|e| DatabaseError::Query(e.to_string()))?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<(), DatabaseError> {
        let key = user_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            diesel::delete(repositories::table.filter(repositories::user_id.eq(key)))
                .execute(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn delete_for_user_by_github_repo_id(
        &self,
        user_id: Uuid,
        github_repo_id: &str,
    ) -> Result<(), DatabaseError> {
        let user_key = user_id.to_string();
        let repo_key = github_repo_id.to_string();
        with_conn(self.pool.clone(), move |conn| {
            diesel::delete(
                repositories::table.filter(
                    repositories::user_id
                        .eq(user_key)
                        .and(repositories::github_repo_id.eq(repo_key)),
                ),
            )
            .execute(conn)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
