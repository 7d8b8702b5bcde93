use crate::config::{DatabaseConfig, DbType as ConfigDbType};
use crate::db::{
    DatabaseError, FeedStore, ForumStore, ProfileStore, RepositoryStore, UserStore,
};
use std::sync::Arc;

#[cfg(feature = "postgres")]
use crate::db::postgres::{
    PgPool, PostgresFeedStore, PostgresForumStore, PostgresProfileStore, PostgresRepositoryStore,
    PostgresUserStore,
};
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "postgres")]
use diesel::r2d2::{self, ConnectionManager};

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{
    SqliteFeedStore, SqliteForumStore, SqliteProfileStore, SqliteRepositoryStore, SqliteUserStore,
};
#[cfg(feature = "sqlite")]
use diesel::Connection;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

use diesel::RunQueryDsl;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

impl From<ConfigDbType> for DbType {
    fn from(value: ConfigDbType) -> Self {
        match value {
            ConfigDbType::Postgres => DbType::Postgres,
            ConfigDbType::Sqlite => DbType::Sqlite,
        }
    }
}

#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "postgres")]
    postgres_pool: Option<PgPool>,
    #[cfg(feature = "sqlite")]
    sqlite_path: Option<String>,
    user_store: Arc<dyn UserStore>,
    profile_store: Arc<dyn ProfileStore>,
    feed_store: Arc<dyn FeedStore>,
    forum_store: Arc<dyn ForumStore>,
    repository_store: Arc<dyn RepositoryStore>,
    db_type: DbType,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = DbType::from(config.db_type());

        match db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let manager =
                    ConnectionManager::<PgConnection>::new(config.connection_string());
                let pool = r2d2::Pool::builder()
                    .max_size(config.max_connections().unwrap_or(10))
                    .min_idle(Some(config.min_connections().unwrap_or(1)))
                    .build(manager)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;

                Ok(Self {
                    postgres_pool: Some(pool.clone()),
                    #[cfg(feature = "sqlite")]
                    sqlite_path: None,
                    user_store: Arc::new(PostgresUserStore::new(pool.clone())),
                    profile_store: Arc::new(PostgresProfileStore::new(pool.clone())),
                    feed_store: Arc::new(PostgresFeedStore::new(pool.clone())),
                    forum_store: Arc::new(PostgresForumStore::new(pool.clone())),
                    repository_store: Arc::new(PostgresRepositoryStore::new(pool)),
                    db_type,
                })
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config.sqlite_path().ok_or_else(|| {
                    DatabaseError::Connection("missing sqlite path".to_string())
                })?;
                let path_arc = Arc::new(path.clone());

                Ok(Self {
                    #[cfg(feature = "postgres")]
                    postgres_pool: None,
                    sqlite_path: Some(path),
                    user_store: Arc::new(SqliteUserStore::new(path_arc.clone())),
                    profile_store: Arc::new(SqliteProfileStore::new(path_arc.clone())),
                    feed_store: Arc::new(SqliteFeedStore::new(path_arc.clone())),
                    forum_store: Arc::new(SqliteForumStore::new(path_arc.clone())),
                    repository_store: Arc::new(SqliteRepositoryStore::new(path_arc)),
                    db_type,
                })
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Connection(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Connection(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = self.postgres_pool.as_ref().ok_or_else(|| {
                    DatabaseError::Migration("postgres pool not initialized".to_string())
                })?;
                Self::migrate_postgres(pool).await
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = self.sqlite_path.as_ref().ok_or_else(|| {
                    DatabaseError::Migration("sqlite path not initialized".to_string())
                })?;
                Self::migrate_sqlite(path).await
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Migration(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Migration(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    #[cfg(feature = "postgres")]
    async fn migrate_postgres(pool: &PgPool) -> Result<(), DatabaseError> {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL DEFAULT '',
                    display_name TEXT NOT NULL DEFAULT '',
                    auth_token TEXT UNIQUE,
                    is_verified BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS user_profiles (
                    id BIGSERIAL PRIMARY KEY,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    headline TEXT NOT NULL DEFAULT '',
                    bio TEXT NOT NULL DEFAULT '',
                    avatar_url TEXT NOT NULL DEFAULT '',
                    github_handle TEXT NOT NULL DEFAULT '',
                    twitter_handle TEXT NOT NULL DEFAULT '',
                    linkedin_handle TEXT NOT NULL DEFAULT '',
                    elo_rating INTEGER NOT NULL DEFAULT 1000,
                    current_streak INTEGER NOT NULL DEFAULT 0,
                    total_xp INTEGER NOT NULL DEFAULT 0
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS codeforces_profiles (
                    id BIGSERIAL PRIMARY KEY,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    handle TEXT NOT NULL UNIQUE,
                    rating INTEGER NOT NULL DEFAULT 0,
                    max_rating INTEGER NOT NULL DEFAULT 0,
                    rank TEXT NOT NULL DEFAULT 'Newbie',
                    max_rank TEXT NOT NULL DEFAULT 'Newbie',
                    avatar_url TEXT NOT NULL DEFAULT '',
                    contribution INTEGER NOT NULL DEFAULT 0,
                    friend_count INTEGER NOT NULL DEFAULT 0,
                    problems_solved INTEGER NOT NULL DEFAULT 0,
                    last_synced TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS github_profiles (
                    id BIGSERIAL PRIMARY KEY,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    username TEXT NOT NULL UNIQUE,
                    github_id BIGINT,
                    avatar_url TEXT NOT NULL DEFAULT '',
                    html_url TEXT NOT NULL DEFAULT '',
                    bio TEXT NOT NULL DEFAULT '',
                    company TEXT NOT NULL DEFAULT '',
                    location TEXT NOT NULL DEFAULT '',
                    blog TEXT NOT NULL DEFAULT '',
                    public_repos INTEGER NOT NULL DEFAULT 0,
                    public_gists INTEGER NOT NULL DEFAULT 0,
                    followers INTEGER NOT NULL DEFAULT 0,
                    following INTEGER NOT NULL DEFAULT 0,
                    total_commits INTEGER NOT NULL DEFAULT 0,
                    total_prs INTEGER NOT NULL DEFAULT 0,
                    total_issues INTEGER NOT NULL DEFAULT 0,
                    total_stars_received INTEGER NOT NULL DEFAULT 0,
                    top_languages TEXT NOT NULL DEFAULT '[]',
                    top_repos TEXT NOT NULL DEFAULT '[]',
                    access_token TEXT NOT NULL DEFAULT '',
                    last_synced TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    github_created_at TIMESTAMPTZ
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS posts (
                    id TEXT PRIMARY KEY,
                    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    code_snippet TEXT NOT NULL DEFAULT '',
                    image_url TEXT NOT NULL DEFAULT '',
                    post_type TEXT NOT NULL DEFAULT 'MANUAL',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS reactions (
                    id BIGSERIAL PRIMARY KEY,
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    reaction_type TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS comments (
                    id BIGSERIAL PRIMARY KEY,
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    code_snippet TEXT NOT NULL DEFAULT '',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS channels (
                    id BIGSERIAL PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL DEFAULT '',
                    slug TEXT NOT NULL UNIQUE,
                    color TEXT NOT NULL DEFAULT '#00d4ff'
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS threads (
                    id BIGSERIAL PRIMARY KEY,
                    channel_id BIGINT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    pinned BOOLEAN NOT NULL DEFAULT FALSE,
                    views INTEGER NOT NULL DEFAULT 0,
                    tags TEXT NOT NULL DEFAULT '[]',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS replies (
                    id BIGSERIAL PRIMARY KEY,
                    thread_id BIGINT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS votes (
                    id BIGSERIAL PRIMARY KEY,
                    thread_id BIGINT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    value INTEGER NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    UNIQUE (user_id, thread_id)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS repositories (
                    id BIGSERIAL PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    github_repo_id TEXT NOT NULL,
                    full_name TEXT NOT NULL DEFAULT '',
                    html_url TEXT NOT NULL DEFAULT '',
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    default_description TEXT NOT NULL DEFAULT '',
                    UNIQUE (user_id, github_repo_id)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS challenges (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    difficulty TEXT NOT NULL DEFAULT 'EASY',
                    points INTEGER NOT NULL DEFAULT 0
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_users_auth_token ON users(auth_token)",
                "CREATE INDEX IF NOT EXISTS idx_user_profiles_github_handle ON user_profiles(github_handle)",
                "CREATE INDEX IF NOT EXISTS idx_github_profiles_username ON github_profiles(username)",
                "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id)",
                "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at)",
                "CREATE INDEX IF NOT EXISTS idx_reactions_post ON reactions(post_id)",
                "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id)",
                "CREATE INDEX IF NOT EXISTS idx_threads_channel ON threads(channel_id)",
                "CREATE INDEX IF NOT EXISTS idx_replies_thread ON replies(thread_id)",
                "CREATE INDEX IF NOT EXISTS idx_votes_thread ON votes(thread_id)",
                "CREATE INDEX IF NOT EXISTS idx_repositories_github_repo ON repositories(github_repo_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(feature = "sqlite")]
    async fn migrate_sqlite(path: &str) -> Result<(), DatabaseError> {
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = SqliteConnection::establish(&path)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL DEFAULT '',
                    display_name TEXT NOT NULL DEFAULT '',
                    auth_token TEXT UNIQUE,
                    is_verified INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS user_profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    headline TEXT NOT NULL DEFAULT '',
                    bio TEXT NOT NULL DEFAULT '',
                    avatar_url TEXT NOT NULL DEFAULT '',
                    github_handle TEXT NOT NULL DEFAULT '',
                    twitter_handle TEXT NOT NULL DEFAULT '',
                    linkedin_handle TEXT NOT NULL DEFAULT '',
                    elo_rating INTEGER NOT NULL DEFAULT 1000,
                    current_streak INTEGER NOT NULL DEFAULT 0,
                    total_xp INTEGER NOT NULL DEFAULT 0
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS codeforces_profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    handle TEXT NOT NULL UNIQUE,
                    rating INTEGER NOT NULL DEFAULT 0,
                    max_rating INTEGER NOT NULL DEFAULT 0,
                    rank TEXT NOT NULL DEFAULT 'Newbie',
                    max_rank TEXT NOT NULL DEFAULT 'Newbie',
                    avatar_url TEXT NOT NULL DEFAULT '',
                    contribution INTEGER NOT NULL DEFAULT 0,
                    friend_count INTEGER NOT NULL DEFAULT 0,
                    problems_solved INTEGER NOT NULL DEFAULT 0,
                    last_synced TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS github_profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    username TEXT NOT NULL UNIQUE,
                    github_id INTEGER,
                    avatar_url TEXT NOT NULL DEFAULT '',
                    html_url TEXT NOT NULL DEFAULT '',
                    bio TEXT NOT NULL DEFAULT '',
                    company TEXT NOT NULL DEFAULT '',
                    location TEXT NOT NULL DEFAULT '',
                    blog TEXT NOT NULL DEFAULT '',
                    public_repos INTEGER NOT NULL DEFAULT 0,
                    public_gists INTEGER NOT NULL DEFAULT 0,
                    followers INTEGER NOT NULL DEFAULT 0,
                    following INTEGER NOT NULL DEFAULT 0,
                    total_commits INTEGER NOT NULL DEFAULT 0,
                    total_prs INTEGER NOT NULL DEFAULT 0,
                    total_issues INTEGER NOT NULL DEFAULT 0,
                    total_stars_received INTEGER NOT NULL DEFAULT 0,
                    top_languages TEXT NOT NULL DEFAULT '[]',
                    top_repos TEXT NOT NULL DEFAULT '[]',
                    access_token TEXT NOT NULL DEFAULT '',
                    last_synced TEXT NOT NULL,
                    github_created_at TEXT
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS posts (
                    id TEXT PRIMARY KEY,
                    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    code_snippet TEXT NOT NULL DEFAULT '',
                    image_url TEXT NOT NULL DEFAULT '',
                    post_type TEXT NOT NULL DEFAULT 'MANUAL',
                    created_at TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS reactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    reaction_type TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    code_snippet TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS channels (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL DEFAULT '',
                    slug TEXT NOT NULL UNIQUE,
                    color TEXT NOT NULL DEFAULT '#00d4ff'
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS threads (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    channel_id INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    pinned INTEGER NOT NULL DEFAULT 0,
                    views INTEGER NOT NULL DEFAULT 0,
                    tags TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS replies (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    thread_id INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS votes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    thread_id INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    value INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE (user_id, thread_id)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS repositories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    github_repo_id TEXT NOT NULL,
                    full_name TEXT NOT NULL DEFAULT '',
                    html_url TEXT NOT NULL DEFAULT '',
                    is_active INTEGER NOT NULL DEFAULT 1,
                    default_description TEXT NOT NULL DEFAULT '',
                    UNIQUE (user_id, github_repo_id)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS challenges (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    difficulty TEXT NOT NULL DEFAULT 'EASY',
                    points INTEGER NOT NULL DEFAULT 0
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_users_auth_token ON users(auth_token)",
                "CREATE INDEX IF NOT EXISTS idx_user_profiles_github_handle ON user_profiles(github_handle)",
                "CREATE INDEX IF NOT EXISTS idx_github_profiles_username ON github_profiles(username)",
                "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id)",
                "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at)",
                "CREATE INDEX IF NOT EXISTS idx_reactions_post ON reactions(post_id)",
                "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id)",
                "CREATE INDEX IF NOT EXISTS idx_threads_channel ON threads(channel_id)",
                "CREATE INDEX IF NOT EXISTS idx_replies_thread ON replies(thread_id)",
                "CREATE INDEX IF NOT EXISTS idx_votes_thread ON votes(thread_id)",
                "CREATE INDEX IF NOT EXISTS idx_repositories_github_repo ON repositories(github_repo_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        self.user_store.clone()
    }

    pub fn profile_store(&self) -> Arc<dyn ProfileStore> {
        self.profile_store.clone()
    }

    pub fn feed_store(&self) -> Arc<dyn FeedStore> {
        self.feed_store.clone()
    }

    pub fn forum_store(&self) -> Arc<dyn ForumStore> {
        self.forum_store.clone()
    }

    pub fn repository_store(&self) -> Arc<dyn RepositoryStore> {
        self.repository_store.clone()
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use chrono::Utc;
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    use super::DatabaseManager;
    use crate::config::DatabaseConfig;
    use crate::db::models::{
        Channel, CodeforcesProfile, GitHubProfile, LanguageStat, Post, PostType, ReactionType,
        Repository, Thread, User, UserProfile,
    };
    use crate::db::stores::{ReactionToggle, RepositorySettings, ThreadQuery, UpsertOutcome};

    async fn test_manager() -> (DatabaseManager, NamedTempFile) {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = DatabaseConfig {
            url: None,
            filename: Some(file.path().to_string_lossy().to_string()),
            max_connections: Some(1),
            min_connections: Some(1),
        };
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        (manager, file)
    }

    fn sample_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.org"),
            display_name: "Ada Lovelace".to_string(),
            auth_token: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_cf_profile(user_id: Uuid, handle: &str, rating: i32) -> CodeforcesProfile {
        CodeforcesProfile {
            id: 0,
            user_id,
            handle: handle.to_string(),
            rating,
            max_rating: rating,
            rank: "Expert".to_string(),
            max_rank: "Expert".to_string(),
            avatar_url: String::new(),
            contribution: 4,
            friend_count: 12,
            problems_solved: 0,
            last_synced: Utc::now(),
        }
    }

    #[tokio::test]
    async fn user_and_token_roundtrip() {
        let (manager, _file) = test_manager().await;
        let store = manager.user_store();

        let user = sample_user("ada");
        store.create_user(&user).await.expect("create user");
        store.create_profile(&UserProfile::new(user.id)).await.expect("create profile");

        store
            .set_auth_token(user.id, "token-123")
            .await
            .expect("set token");

        let found = store
            .get_user_by_token("token-123")
            .await
            .expect("query by token")
            .expect("user exists");
        assert_eq!(found.id, user.id);
        assert_eq!(found.username, "ada");

        assert!(
            store
                .get_user_by_token("wrong-token")
                .await
                .expect("query by bad token")
                .is_none()
        );

        let profile = store
            .get_profile(user.id)
            .await
            .expect("query profile")
            .expect("profile exists");
        assert_eq!(profile.elo_rating, 1000);
    }

    #[tokio::test]
    async fn relinking_updates_cf_profile_instead_of_duplicating() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let profiles = manager.profile_store();

        let user = sample_user("ada");
        users.create_user(&user).await.expect("create user");
        users.create_profile(&UserProfile::new(user.id)).await.expect("create profile");

        let outcome = profiles
            .upsert_cf_profile(&sample_cf_profile(user.id, "ada_cf", 1500))
            .await
            .expect("first upsert");
        assert_eq!(outcome, UpsertOutcome::Created);

        let outcome = profiles
            .upsert_cf_profile(&sample_cf_profile(user.id, "ada_cf", 1800))
            .await
            .expect("second upsert");
        assert_eq!(outcome, UpsertOutcome::Updated);

        let stored = profiles
            .get_cf_profile(user.id)
            .await
            .expect("query")
            .expect("profile exists");
        assert_eq!(stored.rating, 1800);

        let rows = profiles.leaderboard().await.expect("leaderboard");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_rating_desc() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let profiles = manager.profile_store();

        for (name, handle, rating) in
            [("ada", "ada_cf", 1500), ("grace", "grace_cf", 2400), ("linus", "linus_cf", 900)]
        {
            let user = sample_user(name);
            users.create_user(&user).await.expect("create user");
            users.create_profile(&UserProfile::new(user.id)).await.expect("create profile");
            profiles
                .upsert_cf_profile(&sample_cf_profile(user.id, handle, rating))
                .await
                .expect("upsert");
        }

        let rows = profiles.leaderboard().await.expect("leaderboard");
        let handles: Vec<_> = rows.iter().map(|r| r.profile.handle.as_str()).collect();
        assert_eq!(handles, vec!["grace_cf", "ada_cf", "linus_cf"]);
    }

    #[tokio::test]
    async fn gh_profile_json_columns_roundtrip() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let profiles = manager.profile_store();

        let user = sample_user("ada");
        users.create_user(&user).await.expect("create user");

        let mut profile = GitHubProfile {
            id: 0,
            user_id: user.id,
            username: "octo-ada".to_string(),
            github_id: Some(42),
            avatar_url: String::new(),
            html_url: String::new(),
            bio: String::new(),
            company: String::new(),
            location: String::new(),
            blog: String::new(),
            public_repos: 7,
            public_gists: 0,
            followers: 10,
            following: 3,
            total_commits: 120,
            total_prs: 9,
            total_issues: 2,
            total_stars_received: 33,
            top_languages: vec![LanguageStat {
                name: "Rust".to_string(),
                percentage: 61.5,
                bytes: 120_000,
            }],
            top_repos: Vec::new(),
            access_token: String::new(),
            last_synced: Utc::now(),
            github_created_at: None,
        };

        assert_eq!(
            profiles.upsert_gh_profile(&profile).await.expect("insert"),
            UpsertOutcome::Created
        );

        profile.followers = 11;
        assert_eq!(
            profiles.upsert_gh_profile(&profile).await.expect("update"),
            UpsertOutcome::Updated
        );

        let stored = profiles
            .get_gh_profile_by_username("octo-ada")
            .await
            .expect("query")
            .expect("profile exists");
        assert_eq!(stored.followers, 11);
        assert_eq!(stored.top_languages.len(), 1);
        assert_eq!(stored.top_languages[0].name, "Rust");
        assert_eq!(stored.top_languages[0].bytes, 120_000);
    }

    #[tokio::test]
    async fn toggling_same_reaction_twice_removes_it() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let feed = manager.feed_store();

        let user = sample_user("ada");
        users.create_user(&user).await.expect("create user");

        let post = Post {
            id: Uuid::new_v4(),
            author_id: user.id,
            content: "shipped a thing".to_string(),
            code_snippet: String::new(),
            image_url: String::new(),
            post_type: PostType::Manual,
            created_at: Utc::now(),
        };
        feed.create_post(&post).await.expect("create post");

        let first = feed
            .toggle_reaction(post.id, user.id, ReactionType::Fire)
            .await
            .expect("first toggle");
        assert_eq!(first, ReactionToggle::Added);

        let second = feed
            .toggle_reaction(post.id, user.id, ReactionType::Fire)
            .await
            .expect("second toggle");
        assert_eq!(second, ReactionToggle::Removed);

        let reactions = feed.list_reactions(post.id).await.expect("list reactions");
        assert!(reactions.is_empty());
    }

    #[tokio::test]
    async fn revoting_overwrites_previous_vote() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let forum = manager.forum_store();

        let user = sample_user("ada");
        users.create_user(&user).await.expect("create user");

        let channel = forum
            .create_channel(&Channel {
                id: 0,
                name: "General".to_string(),
                description: String::new(),
                slug: "general".to_string(),
                color: "#00d4ff".to_string(),
            })
            .await
            .expect("create channel");

        let now = Utc::now();
        let thread = forum
            .create_thread(&Thread {
                id: 0,
                channel_id: channel.id,
                author_id: user.id,
                title: "hello".to_string(),
                content: "world".to_string(),
                pinned: false,
                views: 0,
                tags: vec!["intro".to_string()],
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("create thread");

        forum.upsert_vote(thread.id, user.id, 1).await.expect("upvote");
        assert_eq!(forum.vote_total(thread.id).await.expect("total"), 1);
        assert_eq!(forum.user_vote(thread.id, user.id).await.expect("mine"), 1);

        forum.upsert_vote(thread.id, user.id, -1).await.expect("downvote");
        assert_eq!(forum.vote_total(thread.id).await.expect("total"), -1);
        assert_eq!(forum.user_vote(thread.id, user.id).await.expect("mine"), -1);
    }

    #[tokio::test]
    async fn thread_views_and_filters() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let forum = manager.forum_store();

        let user = sample_user("ada");
        users.create_user(&user).await.expect("create user");

        let general = forum
            .create_channel(&Channel {
                id: 0,
                name: "General".to_string(),
                description: String::new(),
                slug: "general".to_string(),
                color: "#00d4ff".to_string(),
            })
            .await
            .expect("channel");
        let help = forum
            .create_channel(&Channel {
                id: 0,
                name: "Help".to_string(),
                description: String::new(),
                slug: "help".to_string(),
                color: "#ff8800".to_string(),
            })
            .await
            .expect("channel");

        let now = Utc::now();
        for (channel, title) in [(&general, "rust tips"), (&help, "segfault question")] {
            forum
                .create_thread(&Thread {
                    id: 0,
                    channel_id: channel.id,
                    author_id: user.id,
                    title: title.to_string(),
                    content: "body".to_string(),
                    pinned: false,
                    views: 0,
                    tags: Vec::new(),
                    created_at: now,
                    updated_at: now,
                })
                .await
                .expect("thread");
        }

        let in_help = forum
            .list_threads(&ThreadQuery {
                channel_id: Some(help.id),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(in_help.len(), 1);
        assert_eq!(in_help[0].title, "segfault question");

        let searched = forum
            .list_threads(&ThreadQuery {
                search: Some("rust".to_string()),
                ..Default::default()
            })
            .await
            .expect("search");
        assert_eq!(searched.len(), 1);

        forum
            .increment_thread_views(in_help[0].id)
            .await
            .expect("bump views");
        let reloaded = forum
            .get_thread(in_help[0].id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(reloaded.views, 1);
    }

    #[tokio::test]
    async fn repository_upsert_and_active_lookup() {
        let (manager, _file) = test_manager().await;
        let users = manager.user_store();
        let repos = manager.repository_store();

        let user = sample_user("ada");
        users.create_user(&user).await.expect("create user");

        let repo = Repository {
            id: 0,
            user_id: user.id,
            github_repo_id: "9001".to_string(),
            full_name: "ada/engine".to_string(),
            html_url: "https://github.com/ada/engine".to_string(),
            is_active: true,
            default_description: String::new(),
        };
        repos.upsert(&repo).await.expect("upsert");
        repos.upsert(&repo).await.expect("idempotent upsert");

        let listed = repos.list_for_user(user.id).await.expect("list");
        assert_eq!(listed.len(), 1);

        let active = repos
            .get_active_by_github_repo_id("9001")
            .await
            .expect("lookup")
            .expect("active repo");
        assert_eq!(active.full_name, "ada/engine");

        let updated = repos
            .update_settings(
                active.id,
                user.id,
                &RepositorySettings {
                    is_active: Some(false),
                    default_description: Some("Shipping the engine".to_string()),
                },
            )
            .await
            .expect("update")
            .expect("row exists");
        assert!(!updated.is_active);

        assert!(
            repos
                .get_active_by_github_repo_id("9001")
                .await
                .expect("lookup inactive")
                .is_none()
        );

        // Re-tracking through the webhook path flips the repo active again.
        repos.upsert(&repo).await.expect("reactivate");
        assert!(
            repos
                .get_active_by_github_repo_id("9001")
                .await
                .expect("lookup reactivated")
                .is_some()
        );
    }
}
