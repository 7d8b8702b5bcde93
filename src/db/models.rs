use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    /// Bearer token minted at login. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub headline: String,
    pub bio: String,
    pub avatar_url: String,
    pub github_handle: String,
    pub twitter_handle: String,
    pub linkedin_handle: String,
    pub elo_rating: i32,
    pub current_streak: i32,
    pub total_xp: i32,
}

impl UserProfile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: 0,
            user_id,
            headline: String::new(),
            bio: String::new(),
            avatar_url: String::new(),
            github_handle: String::new(),
            twitter_handle: String::new(),
            linkedin_handle: String::new(),
            elo_rating: 1000,
            current_streak: 0,
            total_xp: 0,
        }
    }
}

/// Partial profile update applied by `PATCH /api/users/me`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub github_handle: Option<String>,
    pub twitter_handle: Option<String>,
    pub linkedin_handle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeforcesProfile {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub handle: String,
    pub rating: i32,
    pub max_rating: i32,
    pub rank: String,
    pub max_rank: String,
    pub avatar_url: String,
    pub contribution: i32,
    pub friend_count: i32,
    pub problems_solved: i32,
    pub last_synced: DateTime<Utc>,
}

impl CodeforcesProfile {
    /// Combined score: Codeforces rating weighted 70%, internal XP 30%.
    pub fn combined_score(&self, total_xp: i32) -> i64 {
        (f64::from(self.rating) * 0.7 + f64::from(total_xp) * 0.3) as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubProfile {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    /// GitHub login; serialized as `github_username` to leave `username`
    /// free for the Hive account name in profile responses.
    #[serde(rename = "github_username")]
    pub username: String,
    pub github_id: Option<i64>,
    pub avatar_url: String,
    pub html_url: String,
    pub bio: String,
    pub company: String,
    pub location: String,
    pub blog: String,
    pub public_repos: i32,
    pub public_gists: i32,
    pub followers: i32,
    pub following: i32,
    pub total_commits: i32,
    pub total_prs: i32,
    pub total_issues: i32,
    pub total_stars_received: i32,
    pub top_languages: Vec<LanguageStat>,
    pub top_repos: Vec<RepoSummary>,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub last_synced: DateTime<Utc>,
    pub github_created_at: Option<DateTime<Utc>>,
}

/// One entry of a language histogram aggregated across repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStat {
    pub name: String,
    pub percentage: f64,
    pub bytes: i64,
}

/// Simplified repository record kept for profile display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub html_url: String,
    pub language: String,
    pub stargazers_count: i64,
    pub forks_count: i64,
    pub updated_at: String,
    pub fork: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostType {
    #[serde(rename = "MANUAL")]
    Manual,
    #[serde(rename = "GITHUB_COMMIT")]
    GithubCommit,
    #[serde(rename = "CODEFORCES_SOLVE")]
    CodeforcesSolve,
    #[serde(rename = "MILESTONE")]
    Milestone,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::GithubCommit => "GITHUB_COMMIT",
            Self::CodeforcesSolve => "CODEFORCES_SOLVE",
            Self::Milestone => "MILESTONE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MANUAL" => Some(Self::Manual),
            "GITHUB_COMMIT" => Some(Self::GithubCommit),
            "CODEFORCES_SOLVE" => Some(Self::CodeforcesSolve),
            "MILESTONE" => Some(Self::Milestone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub code_snippet: String,
    pub image_url: String,
    pub post_type: PostType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionType {
    #[serde(rename = "RESPECT")]
    Respect,
    #[serde(rename = "FIRE")]
    Fire,
    #[serde(rename = "BUG")]
    Bug,
}

impl ReactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Respect => "RESPECT",
            Self::Fire => "FIRE",
            Self::Bug => "BUG",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RESPECT" => Some(Self::Respect),
            "FIRE" => Some(Self::Fire),
            "BUG" => Some(Self::Bug),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub post_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub reaction_type: ReactionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub code_snippet: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub channel_id: i64,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub pinned: bool,
    pub views: i32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub thread_id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const UPVOTE: i32 = 1;
pub const DOWNVOTE: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub thread_id: i64,
    pub user_id: Uuid,
    pub value: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub github_repo_id: String,
    pub full_name: String,
    pub html_url: String,
    pub is_active: bool,
    pub default_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub points: i32,
}

#[cfg(test)]
mod tests {
    use super::{CodeforcesProfile, PostType, ReactionType};
    use chrono::Utc;
    use uuid::Uuid;

    fn cf_profile(rating: i32) -> CodeforcesProfile {
        CodeforcesProfile {
            id: 0,
            user_id: Uuid::new_v4(),
            handle: "tourist".to_string(),
            rating,
            max_rating: rating,
            rank: "Newbie".to_string(),
            max_rank: "Newbie".to_string(),
            avatar_url: String::new(),
            contribution: 0,
            friend_count: 0,
            problems_solved: 0,
            last_synced: Utc::now(),
        }
    }

    #[test]
    fn combined_score_weights_rating_and_xp() {
        let profile = cf_profile(2000);
        assert_eq!(profile.combined_score(1000), 1700);
    }

    #[test]
    fn combined_score_ignores_fractional_part() {
        let profile = cf_profile(1000);
        assert_eq!(profile.combined_score(0), 700);
        let profile = cf_profile(0);
        assert_eq!(profile.combined_score(1000), 300);
    }

    #[test]
    fn post_type_round_trips_through_wire_names() {
        for kind in [
            PostType::Manual,
            PostType::GithubCommit,
            PostType::CodeforcesSolve,
            PostType::Milestone,
        ] {
            assert_eq!(PostType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PostType::parse("NOT_A_TYPE"), None);
    }

    #[test]
    fn reaction_type_rejects_unknown_names() {
        assert_eq!(ReactionType::parse("FIRE"), Some(ReactionType::Fire));
        assert_eq!(ReactionType::parse("fire"), None);
    }
}
