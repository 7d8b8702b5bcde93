use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::models::{Post, PostType, Repository};
use crate::db::{DatabaseError, FeedStore, ProfileStore, RepositoryStore, UserStore};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature")]
    MissingSignature,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Verifies `sha256=<hex>` over the raw request body with the shared secret.
/// The comparison is constant-time; no replay protection is attempted.
pub fn verify_signature(
    secret: &SecretString,
    body: &[u8],
    signature_header: Option<&str>,
) -> Result<(), WebhookError> {
    let Some(signature) = signature_header else {
        return Err(WebhookError::MissingSignature);
    };

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    let expected = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookSender {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookRepository {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookCommit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPullRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub merged: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallationRepository {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// One struct covers every event shape we dispatch on; absent fields fall
/// back to defaults instead of failing the whole delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub sender: Option<WebhookSender>,
    #[serde(default)]
    pub repository: Option<WebhookRepository>,
    #[serde(default)]
    pub commits: Vec<WebhookCommit>,
    #[serde(default)]
    pub pull_request: Option<WebhookPullRequest>,
    #[serde(default)]
    pub repositories: Vec<InstallationRepository>,
    #[serde(default)]
    pub repositories_added: Vec<InstallationRepository>,
    #[serde(default)]
    pub repositories_removed: Vec<InstallationRepository>,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    pub fn sender_login(&self) -> &str {
        self.sender.as_ref().map(|s| s.login.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub message: String,
}

impl WebhookOutcome {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn short_commit_id(commit_id: &str) -> &str {
    &commit_id[..commit_id.len().min(7)]
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

/// Body of an auto-generated commit post. `intro` is the repository's
/// default description when one is set.
fn push_post_content(intro: &str, message: &str, url: &str) -> String {
    format!("{}\n\n**Commit:** {}\n[View Commit]({})", intro, message, url)
}

fn default_push_intro(repo_full_name: &str) -> String {
    format!("🚀 Pushed to {}", repo_full_name)
}

/// Display verb for a pull-request action; `None` means the action is not
/// worth a feed post.
fn pr_action_text(action: &str, merged: bool) -> Option<&'static str> {
    match (action, merged) {
        ("opened", _) => Some("Opened"),
        ("closed", true) => Some("Merged"),
        ("closed", false) => Some("Closed"),
        _ => None,
    }
}

/// Applies webhook side effects: feed posts for pushes and pull requests,
/// repository bookkeeping for app installations.
pub struct WebhookProcessor {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileStore>,
    feed: Arc<dyn FeedStore>,
    repositories: Arc<dyn RepositoryStore>,
}

impl WebhookProcessor {
    pub fn new(
        users: Arc<dyn UserStore>,
        profiles: Arc<dyn ProfileStore>,
        feed: Arc<dyn FeedStore>,
        repositories: Arc<dyn RepositoryStore>,
    ) -> Self {
        Self {
            users,
            profiles,
            feed,
            repositories,
        }
    }

    pub async fn handle_event(
        &self,
        event_type: &str,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, DatabaseError> {
        match event_type {
            "push" => self.handle_push(payload).await,
            "pull_request" => self.handle_pull_request(payload).await,
            "installation" => self.handle_installation(payload).await,
            "installation_repositories" => self.handle_installation_repositories(payload).await,
            "ping" => Ok(WebhookOutcome::new("Pong!")),
            other => {
                debug!(event = other, "ignoring webhook event");
                Ok(WebhookOutcome::new("Event ignored"))
            }
        }
    }

    /// One GITHUB_COMMIT post per pushed commit, gated on the repository
    /// being tracked and active. Duplicate deliveries create duplicate
    /// posts; there is no idempotency key.
    async fn handle_push(&self, payload: &WebhookPayload) -> Result<WebhookOutcome, DatabaseError> {
        let Some(repository) = payload.repository.as_ref() else {
            return Ok(WebhookOutcome::new("Event ignored"));
        };
        let repo_key = repository.id.to_string();

        let Some(tracked) = self
            .repositories
            .get_active_by_github_repo_id(&repo_key)
            .await?
        else {
            return Ok(WebhookOutcome::new(format!(
                "Repo {} not active or not found",
                repository.full_name
            )));
        };

        let intro = if tracked.default_description.is_empty() {
            default_push_intro(&repository.full_name)
        } else {
            tracked.default_description.clone()
        };

        let mut created_count = 0;
        for commit in &payload.commits {
            let post = Post {
                id: Uuid::new_v4(),
                author_id: tracked.user_id,
                content: push_post_content(&intro, &commit.message, &commit.url),
                code_snippet: format!(
                    "Repo: {}\nCommit: {}",
                    repository.full_name,
                    short_commit_id(&commit.id)
                ),
                image_url: String::new(),
                post_type: PostType::GithubCommit,
                created_at: Utc::now(),
            };
            self.feed.create_post(&post).await?;
            created_count += 1;
        }

        info!(
            repo = %repository.full_name,
            commits = created_count,
            "created feed posts from push webhook"
        );
        Ok(WebhookOutcome::new(format!(
            "Processed {} commits for {}",
            created_count, repository.full_name
        )))
    }

    /// A single post for opened/closed pull requests, keyed on the sender's
    /// linked GitHub profile.
    async fn handle_pull_request(
        &self,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, DatabaseError> {
        let action = payload.action.as_deref().unwrap_or("");
        let pr = payload.pull_request.clone().unwrap_or_default();
        let Some(action_text) = pr_action_text(action, pr.merged) else {
            return Ok(WebhookOutcome::new("Event ignored"));
        };

        let sender = payload.sender_login();
        let Some(profile) = self.profiles.get_gh_profile_by_username(sender).await? else {
            return Ok(WebhookOutcome::new(format!("User {} not found", sender)));
        };

        let repo_name = payload
            .repository
            .as_ref()
            .map(|r| r.full_name.as_str())
            .unwrap_or("");

        let post = Post {
            id: Uuid::new_v4(),
            author_id: profile.user_id,
            content: format!("{} PR in {}: {}", action_text, repo_name, pr.title),
            code_snippet: String::new(),
            image_url: String::new(),
            post_type: PostType::GithubCommit,
            created_at: Utc::now(),
        };
        self.feed.create_post(&post).await?;

        Ok(WebhookOutcome::new(format!(
            "Processed pull request for {}",
            repo_name
        )))
    }

    async fn handle_installation(
        &self,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, DatabaseError> {
        let sender = payload.sender_login();
        let Some(profile) = self.users.get_profile_by_github_handle(sender).await? else {
            return Ok(WebhookOutcome::new(format!("User {} not found", sender)));
        };

        match payload.action.as_deref() {
            Some("created") | Some("added") => {
                self.sync_repos(profile.user_id, &payload.repositories)
                    .await?;
            }
            Some("deleted") => {
                self.repositories.delete_all_for_user(profile.user_id).await?;
            }
            _ => {}
        }
        Ok(WebhookOutcome::new("Synced repositories"))
    }

    async fn handle_installation_repositories(
        &self,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, DatabaseError> {
        let sender = payload.sender_login();
        let Some(profile) = self.users.get_profile_by_github_handle(sender).await? else {
            return Ok(WebhookOutcome::new(format!("User {} not found", sender)));
        };

        match payload.action.as_deref() {
            Some("added") => {
                self.sync_repos(profile.user_id, &payload.repositories_added)
                    .await?;
            }
            Some("removed") => {
                for repo in &payload.repositories_removed {
                    self.repositories
                        .delete_for_user_by_github_repo_id(profile.user_id, &repo.id.to_string())
                        .await?;
                }
            }
            _ => {}
        }
        Ok(WebhookOutcome::new("Synced repositories"))
    }

    async fn sync_repos(
        &self,
        user_id: Uuid,
        repos: &[InstallationRepository],
    ) -> Result<(), DatabaseError> {
        for repo in repos {
            let html_url = repo
                .html_url
                .clone()
                .unwrap_or_else(|| format!("https://github.com/{}", repo.full_name));
            self.repositories
                .upsert(&Repository {
                    id: 0,
                    user_id,
                    github_repo_id: repo.id.to_string(),
                    full_name: repo.full_name.clone(),
                    html_url,
                    is_active: true,
                    default_description: String::new(),
                })
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{
        SIGNATURE_HEADER, WebhookError, WebhookPayload, pr_action_text, push_post_content,
        short_commit_id, verify_signature,
    };

    fn secret() -> SecretString {
        SecretString::from("hive-webhook-secret")
    }

    fn sign(body: &[u8]) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        let mut mac = Hmac::<Sha256>::new_from_slice(b"hive-webhook-secret").expect("mac");
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"zen": "Design for failure."}"#;
        let header = sign(body);
        assert!(verify_signature(&secret(), body, Some(&header)).is_ok());
    }

    #[test]
    fn missing_signature_is_rejected() {
        let result = verify_signature(&secret(), b"{}", None);
        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign(b"original body");
        let result = verify_signature(&secret(), b"tampered body", Some(&header));
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"payload";
        let header = {
            use hmac::{Hmac, Mac};
            use sha2::Sha256;
            let mut mac = Hmac::<Sha256>::new_from_slice(b"other-secret").expect("mac");
            mac.update(body);
            format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
        };
        let result = verify_signature(&secret(), body, Some(&header));
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn malformed_signature_header_is_rejected() {
        let result = verify_signature(&secret(), b"payload", Some("sha256=nothex"));
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
        let result = verify_signature(&secret(), b"payload", Some(""));
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn signature_header_name_matches_github() {
        assert_eq!(SIGNATURE_HEADER, "X-Hub-Signature-256");
    }

    #[test]
    fn payload_parses_push_shape() {
        let body = br#"{
            "sender": {"login": "octocat"},
            "repository": {"id": 9001, "full_name": "octocat/engine"},
            "commits": [
                {"id": "a1b2c3d4e5f6a7b8", "message": "fix parser", "url": "https://github.com/c/1"}
            ]
        }"#;
        let payload = WebhookPayload::parse(body).expect("parses");
        assert_eq!(payload.sender_login(), "octocat");
        assert_eq!(payload.repository.expect("repo").id, 9001);
        assert_eq!(payload.commits.len(), 1);
    }

    #[test]
    fn payload_rejects_invalid_json() {
        assert!(matches!(
            WebhookPayload::parse(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }

    #[test]
    fn short_commit_id_truncates_to_seven() {
        assert_eq!(short_commit_id("a1b2c3d4e5f6"), "a1b2c3d");
        assert_eq!(short_commit_id("abc"), "abc");
    }

    #[test]
    fn push_content_includes_commit_and_link() {
        let content =
            push_post_content("🚀 Pushed to octocat/engine", "fix parser", "https://x/c/1");
        assert!(content.starts_with("🚀 Pushed to octocat/engine"));
        assert!(content.contains("**Commit:** fix parser"));
        assert!(content.contains("[View Commit](https://x/c/1)"));
    }

    #[test]
    fn pr_action_text_prefers_merged_over_closed() {
        assert_eq!(pr_action_text("opened", false), Some("Opened"));
        assert_eq!(pr_action_text("closed", false), Some("Closed"));
        assert_eq!(pr_action_text("closed", true), Some("Merged"));
        assert_eq!(pr_action_text("synchronize", false), None);
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod processor_tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    use super::{WebhookPayload, WebhookProcessor};
    use crate::config::DatabaseConfig;
    use crate::db::models::{GitHubProfile, Repository, User, UserProfile};
    use crate::db::{DatabaseManager, RepositorySettings};

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

    fn processor(manager: &DatabaseManager) -> WebhookProcessor {
        WebhookProcessor::new(
            manager.user_store(),
            manager.profile_store(),
            manager.feed_store(),
            manager.repository_store(),
        )
    }

    async fn seed_user(manager: &DatabaseManager, github_handle: &str) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: format!("github:{}", github_handle),
            email: String::new(),
            display_name: github_handle.to_string(),
            auth_token: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        manager.user_store().create_user(&user).await.expect("user");
        let mut profile = UserProfile::new(user.id);
        profile.github_handle = github_handle.to_string();
        manager
            .user_store()
            .create_profile(&profile)
            .await
            .expect("profile");
        user.id
    }

    fn push_payload(repo_id: i64) -> WebhookPayload {
        WebhookPayload::parse(
            format!(
                r#"{{
                    "sender": {{"login": "octocat"}},
                    "repository": {{"id": {repo_id}, "full_name": "octocat/engine"}},
                    "commits": [
                        {{"id": "a1b2c3d4e5f6", "message": "fix parser", "url": "https://x/c/1"}},
                        {{"id": "b2c3d4e5f6a7", "message": "add tests", "url": "https://x/c/2"}}
                    ]
                }}"#
            )
            .as_bytes(),
        )
        .expect("payload")
    }

    #[tokio::test]
    async fn push_for_active_repo_creates_posts_per_commit() {
        let (manager, _file) = test_manager().await;
        let user_id = seed_user(&manager, "octocat").await;

        manager
            .repository_store()
            .upsert(&Repository {
                id: 0,
                user_id,
                github_repo_id: "9001".to_string(),
                full_name: "octocat/engine".to_string(),
                html_url: String::new(),
                is_active: true,
                default_description: String::new(),
            })
            .await
            .expect("repo");

        let outcome = processor(&manager)
            .handle_event("push", &push_payload(9001))
            .await
            .expect("handled");
        assert_eq!(outcome.message, "Processed 2 commits for octocat/engine");

        let posts = manager.feed_store().list_posts(50, 0).await.expect("posts");
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.author_id == user_id));
        assert!(posts.iter().any(|p| p.content.contains("fix parser")));
    }

    #[tokio::test]
    async fn push_for_inactive_repo_creates_no_post() {
        let (manager, _file) = test_manager().await;
        let user_id = seed_user(&manager, "octocat").await;

        manager
            .repository_store()
            .upsert(&Repository {
                id: 0,
                user_id,
                github_repo_id: "9001".to_string(),
                full_name: "octocat/engine".to_string(),
                html_url: String::new(),
                is_active: true,
                default_description: String::new(),
            })
            .await
            .expect("repo");
        let tracked = manager
            .repository_store()
            .list_for_user(user_id)
            .await
            .expect("list")
            .remove(0);
        manager
            .repository_store()
            .update_settings(
                tracked.id,
                user_id,
                &RepositorySettings {
                    is_active: Some(false),
                    default_description: None,
                },
            )
            .await
            .expect("deactivate");

        let outcome = processor(&manager)
            .handle_event("push", &push_payload(9001))
            .await
            .expect("handled");
        assert_eq!(outcome.message, "Repo octocat/engine not active or not found");

        let posts = manager.feed_store().list_posts(50, 0).await.expect("posts");
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn push_for_untracked_repo_creates_no_post() {
        let (manager, _file) = test_manager().await;
        seed_user(&manager, "octocat").await;

        let outcome = processor(&manager)
            .handle_event("push", &push_payload(4242))
            .await
            .expect("handled");
        assert!(outcome.message.contains("not active or not found"));
        assert!(
            manager
                .feed_store()
                .list_posts(50, 0)
                .await
                .expect("posts")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn push_uses_default_description_when_set() {
        let (manager, _file) = test_manager().await;
        let user_id = seed_user(&manager, "octocat").await;

        manager
            .repository_store()
            .upsert(&Repository {
                id: 0,
                user_id,
                github_repo_id: "9001".to_string(),
                full_name: "octocat/engine".to_string(),
                html_url: String::new(),
                is_active: true,
                default_description: String::new(),
            })
            .await
            .expect("repo");
        let tracked = manager
            .repository_store()
            .list_for_user(user_id)
            .await
            .expect("list")
            .remove(0);
        manager
            .repository_store()
            .update_settings(
                tracked.id,
                user_id,
                &RepositorySettings {
                    is_active: None,
                    default_description: Some("Building the engine in public".to_string()),
                },
            )
            .await
            .expect("describe");

        processor(&manager)
            .handle_event("push", &push_payload(9001))
            .await
            .expect("handled");

        let posts = manager.feed_store().list_posts(50, 0).await.expect("posts");
        assert!(
            posts
                .iter()
                .all(|p| p.content.starts_with("Building the engine in public"))
        );
    }

    #[tokio::test]
    async fn pull_request_post_keyed_on_linked_profile() {
        let (manager, _file) = test_manager().await;
        let user_id = seed_user(&manager, "octocat").await;
        manager
            .profile_store()
            .upsert_gh_profile(&GitHubProfile {
                id: 0,
                user_id,
                username: "octocat".to_string(),
                github_id: Some(1),
                avatar_url: String::new(),
                html_url: String::new(),
                bio: String::new(),
                company: String::new(),
                location: String::new(),
                blog: String::new(),
                public_repos: 0,
                public_gists: 0,
                followers: 0,
                following: 0,
                total_commits: 0,
                total_prs: 0,
                total_issues: 0,
                total_stars_received: 0,
                top_languages: Vec::new(),
                top_repos: Vec::new(),
                access_token: String::new(),
                last_synced: Utc::now(),
                github_created_at: None,
            })
            .await
            .expect("gh profile");

        let payload = WebhookPayload::parse(
            br#"{
                "action": "closed",
                "sender": {"login": "octocat"},
                "repository": {"id": 9001, "full_name": "octocat/engine"},
                "pull_request": {"title": "Add codegen", "merged": true}
            }"#,
        )
        .expect("payload");

        processor(&manager)
            .handle_event("pull_request", &payload)
            .await
            .expect("handled");

        let posts = manager.feed_store().list_posts(50, 0).await.expect("posts");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].content, "Merged PR in octocat/engine: Add codegen");
    }

    #[tokio::test]
    async fn pull_request_from_unlinked_sender_is_ignored() {
        let (manager, _file) = test_manager().await;

        let payload = WebhookPayload::parse(
            br#"{
                "action": "opened",
                "sender": {"login": "stranger"},
                "repository": {"id": 1, "full_name": "s/r"},
                "pull_request": {"title": "hi", "merged": false}
            }"#,
        )
        .expect("payload");

        let outcome = processor(&manager)
            .handle_event("pull_request", &payload)
            .await
            .expect("handled");
        assert_eq!(outcome.message, "User stranger not found");
        assert!(
            manager
                .feed_store()
                .list_posts(50, 0)
                .await
                .expect("posts")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn installation_created_tracks_repos_and_deleted_removes_them() {
        let (manager, _file) = test_manager().await;
        let user_id = seed_user(&manager, "octocat").await;

        let created = WebhookPayload::parse(
            br#"{
                "action": "created",
                "sender": {"login": "octocat"},
                "repositories": [
                    {"id": 1, "full_name": "octocat/one"},
                    {"id": 2, "full_name": "octocat/two", "html_url": "https://github.com/octocat/two"}
                ]
            }"#,
        )
        .expect("payload");

        processor(&manager)
            .handle_event("installation", &created)
            .await
            .expect("handled");
        let repos = manager
            .repository_store()
            .list_for_user(user_id)
            .await
            .expect("list");
        assert_eq!(repos.len(), 2);
        // Absent html_url falls back to the canonical GitHub URL.
        assert!(
            repos
                .iter()
                .any(|r| r.html_url == "https://github.com/octocat/one")
        );

        let deleted = WebhookPayload::parse(
            br#"{"action": "deleted", "sender": {"login": "octocat"}}"#,
        )
        .expect("payload");
        processor(&manager)
            .handle_event("installation", &deleted)
            .await
            .expect("handled");
        assert!(
            manager
                .repository_store()
                .list_for_user(user_id)
                .await
                .expect("list")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn installation_repositories_add_and_remove() {
        let (manager, _file) = test_manager().await;
        let user_id = seed_user(&manager, "octocat").await;

        let added = WebhookPayload::parse(
            br#"{
                "action": "added",
                "sender": {"login": "octocat"},
                "repositories_added": [{"id": 7, "full_name": "octocat/seven"}]
            }"#,
        )
        .expect("payload");
        processor(&manager)
            .handle_event("installation_repositories", &added)
            .await
            .expect("handled");
        assert_eq!(
            manager
                .repository_store()
                .list_for_user(user_id)
                .await
                .expect("list")
                .len(),
            1
        );

        let removed = WebhookPayload::parse(
            br#"{
                "action": "removed",
                "sender": {"login": "octocat"},
                "repositories_removed": [{"id": 7, "full_name": "octocat/seven"}]
            }"#,
        )
        .expect("payload");
        processor(&manager)
            .handle_event("installation_repositories", &removed)
            .await
            .expect("handled");
        assert!(
            manager
                .repository_store()
                .list_for_user(user_id)
                .await
                .expect("list")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn ping_pongs_and_unknown_events_are_ignored() {
        let (manager, _file) = test_manager().await;
        let payload = WebhookPayload::default();

        let pong = processor(&manager)
            .handle_event("ping", &payload)
            .await
            .expect("handled");
        assert_eq!(pong.message, "Pong!");

        let ignored = processor(&manager)
            .handle_event("workflow_run", &payload)
            .await
            .expect("handled");
        assert_eq!(ignored.message, "Event ignored");
    }
}
