pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{
    Challenge, Channel, CodeforcesProfile, Comment, GitHubProfile, LanguageStat, Post, PostType,
    ProfileUpdate, Reaction, ReactionType, Reply, Repository, RepoSummary, Thread, User,
    UserProfile,
};
pub use self::stores::{
    FeedStore, ForumStore, LeaderboardRow, ProfileStore, ReactionToggle, RepositorySettings,
    RepositoryStore, ThreadOrdering, ThreadQuery, UpsertOutcome, UserStore,
};

pub mod error;
pub mod manager;
pub mod models;
pub mod stores;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
#[cfg(feature = "sqlite")]
pub mod sqlite;
