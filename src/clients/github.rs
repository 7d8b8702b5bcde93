use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::throttle::RequestThrottle;

use super::ApiError;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("hive-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: i64,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub public_repos: i32,
    #[serde(default)]
    pub public_gists: i32,
    #[serde(default)]
    pub followers: i32,
    #[serde(default)]
    pub following: i32,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub owner: Option<RepoOwner>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRepo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCommit {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPullRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub merged: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventIssue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub number: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventForkee {
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub commits: Vec<EventCommit>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub pull_request: Option<EventPullRequest>,
    #[serde(default)]
    pub issue: Option<EventIssue>,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub ref_type: Option<String>,
    #[serde(default)]
    pub forkee: Option<EventForkee>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub repo: Option<EventRepo>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub payload: EventPayload,
}

impl GitHubEvent {
    pub fn repo_name(&self) -> &str {
        self.repo.as_ref().map(|r| r.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    server_token: Option<SecretString>,
    client_id: String,
    client_secret: Option<SecretString>,
    throttle: RequestThrottle,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let server_token = if config.token.is_empty() {
            None
        } else {
            Some(SecretString::from(config.token.clone()))
        };
        let client_secret = if config.client_secret.is_empty() {
            None
        } else {
            Some(SecretString::from(config.client_secret.clone()))
        };

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            oauth_base: config.oauth_base.trim_end_matches('/').to_string(),
            server_token,
            client_id: config.client_id.clone(),
            client_secret,
            throttle: RequestThrottle::from_millis(config.min_interval_ms),
        })
    }

    fn headers(&self, access_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        // Per-user token wins; the server token is the fallback.
        let token = access_token
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.server_token
                    .as_ref()
                    .map(|t| t.expose_secret().to_string())
            });
        if let Some(token) = token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert("Authorization", value);
            }
        }
        headers
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        access_token: Option<&str>,
    ) -> Result<T, ApiError> {
        self.throttle.wait().await;

        let url = format!("{}{}", self.api_base, path);
        debug!(path, "github request");
        let response = self
            .http
            .get(&url)
            .headers(self.headers(access_token))
            .query(params)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound("GitHub user not found".to_string())),
            StatusCode::FORBIDDEN => {
                let remaining = response
                    .headers()
                    .get("X-RateLimit-Remaining")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("?")
                    .to_string();
                Err(ApiError::RateLimited { remaining })
            }
            status if !status.is_success() => {
                Err(ApiError::Upstream(format!("GitHub API error ({})", status)))
            }
            _ => response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string())),
        }
    }

    pub async fn fetch_user(
        &self,
        username: &str,
        access_token: Option<&str>,
    ) -> Result<GitHubUser, ApiError> {
        self.get(&format!("/users/{}", username), &[], access_token)
            .await
    }

    /// Public repositories owned by the user, most recently updated first.
    /// A single fixed-size page; no cursor following.
    pub async fn fetch_user_repos(
        &self,
        username: &str,
        per_page: u32,
        access_token: Option<&str>,
    ) -> Result<Vec<GitHubRepo>, ApiError> {
        let params = [
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
            ("per_page", per_page.to_string()),
            ("type", "owner".to_string()),
        ];
        self.get(&format!("/users/{}/repos", username), &params, access_token)
            .await
    }

    pub async fn fetch_user_events(
        &self,
        username: &str,
        per_page: u32,
        access_token: Option<&str>,
    ) -> Result<Vec<GitHubEvent>, ApiError> {
        let params = [("per_page", per_page.to_string())];
        self.get(
            &format!("/users/{}/events/public", username),
            &params,
            access_token,
        )
        .await
    }

    /// Language byte counts for one repository, e.g. `{"Rust": 45000}`.
    pub async fn fetch_repo_languages(
        &self,
        owner: &str,
        repo: &str,
        access_token: Option<&str>,
    ) -> Result<HashMap<String, i64>, ApiError> {
        self.get(&format!("/repos/{}/{}/languages", owner, repo), &[], access_token)
            .await
    }

    /// Exchanges an OAuth authorization code for an access token.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<String, ApiError> {
        let url = format!("{}/login/oauth/access_token", self.oauth_base);
        let body = json!({
            "client_id": self.client_id,
            "client_secret": self
                .client_secret
                .as_ref()
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_default(),
            "code": code,
        });

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(
                "Failed to exchange code for token from GitHub.".to_string(),
            ));
        }

        let token: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if let Some(error) = token.error {
            return Err(ApiError::Upstream(format!(
                "GitHub error: {}",
                token.error_description.unwrap_or(error)
            )));
        }
        token
            .access_token
            .ok_or_else(|| ApiError::Decode("missing access_token field".to_string()))
    }

    /// Profile of the token's owner, with the primary verified email filled
    /// in from `/user/emails` when the profile email is private.
    pub async fn fetch_authenticated_user(
        &self,
        access_token: &str,
    ) -> Result<GitHubUser, ApiError> {
        let mut user: GitHubUser = self.get("/user", &[], Some(access_token)).await?;

        if user.email.is_none() {
            if let Ok(emails) = self
                .get::<Vec<UserEmail>>("/user/emails", &[], Some(access_token))
                .await
            {
                user.email = emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .map(|e| e.email);
            }
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::{GitHubEvent, GitHubRepo, GitHubUser};

    #[test]
    fn user_decodes_with_nulled_optional_fields() {
        let raw = r#"{
            "login": "octocat",
            "id": 583231,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "html_url": "https://github.com/octocat",
            "name": null,
            "company": null,
            "blog": "",
            "location": null,
            "bio": null,
            "public_repos": 8,
            "followers": 10000,
            "following": 9
        }"#;
        let user: GitHubUser = serde_json::from_str(raw).expect("decodes");
        assert_eq!(user.login, "octocat");
        assert_eq!(user.name, None);
        assert_eq!(user.public_repos, 8);
        assert_eq!(user.public_gists, 0);
        assert_eq!(user.email, None);
    }

    #[test]
    fn repo_decodes_with_defaults() {
        let raw = r#"{
            "name": "engine",
            "full_name": "octocat/engine",
            "html_url": "https://github.com/octocat/engine",
            "owner": {"login": "octocat"}
        }"#;
        let repo: GitHubRepo = serde_json::from_str(raw).expect("decodes");
        assert_eq!(repo.stargazers_count, 0);
        assert!(!repo.fork);
        assert_eq!(repo.owner.expect("owner").login, "octocat");
    }

    #[test]
    fn event_decodes_push_payload() {
        let raw = r#"{
            "type": "PushEvent",
            "repo": {"name": "octocat/engine"},
            "created_at": "2026-01-02T03:04:05Z",
            "payload": {
                "commits": [
                    {"message": "fix parser\n\nlong body"},
                    {"message": "add tests"}
                ]
            }
        }"#;
        let event: GitHubEvent = serde_json::from_str(raw).expect("decodes");
        assert_eq!(event.kind, "PushEvent");
        assert_eq!(event.repo_name(), "octocat/engine");
        assert_eq!(event.payload.commits.len(), 2);
    }

    #[test]
    fn event_decodes_unknown_type_to_empty_payload() {
        let raw = r#"{"type": "GollumEvent", "payload": {"pages": []}}"#;
        let event: GitHubEvent = serde_json::from_str(raw).expect("decodes");
        assert_eq!(event.kind, "GollumEvent");
        assert!(event.payload.commits.is_empty());
        assert_eq!(event.repo_name(), "");
    }
}
