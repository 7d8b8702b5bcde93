use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::db::models::{LanguageStat, RepoSummary};

use super::github::{GitHubClient, GitHubEvent, GitHubRepo};

/// Repos inspected for the language histogram; keeps a link well under the
/// unauthenticated rate limit.
const LANGUAGE_REPO_LIMIT: usize = 15;
const LANGUAGE_RESULT_LIMIT: usize = 10;
pub const TOP_REPO_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub commits: i32,
    pub prs: i32,
    pub issues: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub repo: String,
    pub message: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    pub created_at: String,
}

impl ActivityItem {
    fn new(kind: &'static str, repo: &str, message: String, created_at: &Option<String>) -> Self {
        Self {
            kind,
            repo: repo.to_string(),
            message,
            detail: String::new(),
            commit_count: None,
            action: None,
            pr_number: None,
            issue_number: None,
            ref_type: None,
            created_at: created_at.clone().unwrap_or_default(),
        }
    }
}

/// Aggregates byte counts into the ranked top-ten language list.
pub fn rank_languages(language_bytes: &HashMap<String, i64>) -> Vec<LanguageStat> {
    let total: i64 = language_bytes.values().sum();
    let total = if total == 0 { 1 } else { total };

    let mut stats: Vec<LanguageStat> = language_bytes
        .iter()
        .map(|(name, &bytes)| LanguageStat {
            name: name.clone(),
            percentage: ((bytes as f64 / total as f64) * 1000.0).round() / 10.0,
            bytes,
        })
        .collect();
    stats.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.name.cmp(&b.name)));
    stats.truncate(LANGUAGE_RESULT_LIMIT);
    stats
}

/// Fetches per-repo language breakdowns and ranks the aggregate. A repo
/// whose language fetch fails is skipped rather than failing the whole
/// aggregation.
pub async fn aggregate_languages(
    client: &GitHubClient,
    repos: &[GitHubRepo],
    access_token: Option<&str>,
) -> Vec<LanguageStat> {
    let mut language_bytes: HashMap<String, i64> = HashMap::new();
    for repo in repos.iter().take(LANGUAGE_REPO_LIMIT) {
        let Some(owner) = repo.owner.as_ref() else {
            continue;
        };
        match client
            .fetch_repo_languages(&owner.login, &repo.name, access_token)
            .await
        {
            Ok(languages) => {
                for (language, bytes) in languages {
                    *language_bytes.entry(language).or_insert(0) += bytes;
                }
            }
            Err(err) => {
                debug!(repo = %repo.full_name, error = %err, "skipping repo language fetch");
            }
        }
    }
    rank_languages(&language_bytes)
}

/// Top repos by stargazers for profile display. The cut to `limit` happens
/// before forks are dropped, so a starred fork shrinks the list rather than
/// letting a lower-ranked repo in.
pub fn top_repos(repos: &[GitHubRepo], limit: usize) -> Vec<RepoSummary> {
    let mut sorted: Vec<&GitHubRepo> = repos.iter().collect();
    sorted.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    sorted
        .into_iter()
        .take(limit)
        .filter(|repo| !repo.fork)
        .map(|repo| RepoSummary {
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            description: repo.description.clone().unwrap_or_default(),
            html_url: repo.html_url.clone(),
            language: repo.language.clone().unwrap_or_default(),
            stargazers_count: repo.stargazers_count,
            forks_count: repo.forks_count,
            updated_at: repo.updated_at.clone().unwrap_or_default(),
            fork: repo.fork,
        })
        .collect()
}

pub fn total_stars(repos: &[GitHubRepo]) -> i32 {
    repos.iter().map(|r| r.stargazers_count).sum::<i64>() as i32
}

/// Counts commits, PRs and issues across recent public events.
pub fn count_event_stats(events: &[GitHubEvent]) -> EventStats {
    let mut stats = EventStats::default();
    for event in events {
        match event.kind.as_str() {
            "PushEvent" => stats.commits += event.payload.commits.len() as i32,
            "PullRequestEvent" => stats.prs += 1,
            "IssuesEvent" => stats.issues += 1,
            _ => {}
        }
    }
    stats
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Flattens raw GitHub events into display-ready activity items. Unhandled
/// event types inside the first `limit` events are dropped.
pub fn events_to_activity(events: &[GitHubEvent], limit: usize) -> Vec<ActivityItem> {
    let mut activities = Vec::new();
    for event in events.iter().take(limit) {
        let repo = event.repo_name();
        match event.kind.as_str() {
            "PushEvent" => {
                let commits = &event.payload.commits;
                let commit_count = commits.len();
                let mut item = ActivityItem::new(
                    "push",
                    repo,
                    format!("Pushed {} commit{} to {}", commit_count, plural(commit_count), repo),
                    &event.created_at,
                );
                item.detail = commits
                    .last()
                    .map(|c| first_line(&c.message).to_string())
                    .unwrap_or_default();
                item.commit_count = Some(commit_count);
                activities.push(item);
            }
            "PullRequestEvent" => {
                let action = event.payload.action.clone().unwrap_or_default();
                let pr = event.payload.pull_request.clone().unwrap_or_default();
                let mut item = ActivityItem::new(
                    "pull_request",
                    repo,
                    format!("{} PR in {}: {}", capitalize(&action), repo, pr.title),
                    &event.created_at,
                );
                item.detail = pr.title;
                item.action = Some(action);
                item.pr_number = pr.number;
                activities.push(item);
            }
            "IssuesEvent" => {
                let action = event.payload.action.clone().unwrap_or_default();
                let issue = event.payload.issue.clone().unwrap_or_default();
                let mut item = ActivityItem::new(
                    "issue",
                    repo,
                    format!("{} issue in {}: {}", capitalize(&action), repo, issue.title),
                    &event.created_at,
                );
                item.detail = issue.title;
                item.action = Some(action);
                item.issue_number = issue.number;
                activities.push(item);
            }
            "CreateEvent" => {
                let ref_type = event.payload.ref_type.clone().unwrap_or_default();
                let git_ref = event.payload.git_ref.clone().unwrap_or_default();
                let message = if git_ref.is_empty() {
                    format!("Created {} {}", ref_type, repo)
                } else {
                    format!("Created {} {} in {}", ref_type, git_ref, repo)
                };
                let mut item = ActivityItem::new("create", repo, message, &event.created_at);
                item.ref_type = Some(ref_type);
                activities.push(item);
            }
            "WatchEvent" => {
                activities.push(ActivityItem::new(
                    "star",
                    repo,
                    format!("Starred {}", repo),
                    &event.created_at,
                ));
            }
            "ForkEvent" => {
                let mut item = ActivityItem::new(
                    "fork",
                    repo,
                    format!("Forked {}", repo),
                    &event.created_at,
                );
                item.detail = event
                    .payload
                    .forkee
                    .as_ref()
                    .map(|f| f.full_name.clone())
                    .unwrap_or_default();
                activities.push(item);
            }
            _ => {}
        }
    }
    activities
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::github::{
        EventCommit, EventIssue, EventPayload, EventPullRequest, EventRepo, GitHubEvent,
        GitHubRepo, RepoOwner,
    };
    use super::{count_event_stats, events_to_activity, rank_languages, top_repos, total_stars};

    fn repo(name: &str, stars: i64, fork: bool) -> GitHubRepo {
        GitHubRepo {
            name: name.to_string(),
            full_name: format!("octocat/{}", name),
            description: Some(format!("{} description", name)),
            html_url: format!("https://github.com/octocat/{}", name),
            language: Some("Rust".to_string()),
            stargazers_count: stars,
            forks_count: 1,
            updated_at: Some("2026-01-01T00:00:00Z".to_string()),
            fork,
            owner: Some(RepoOwner {
                login: "octocat".to_string(),
            }),
        }
    }

    fn push_event(repo: &str, messages: &[&str]) -> GitHubEvent {
        GitHubEvent {
            kind: "PushEvent".to_string(),
            repo: Some(EventRepo {
                name: repo.to_string(),
            }),
            created_at: Some("2026-01-02T03:04:05Z".to_string()),
            payload: EventPayload {
                commits: messages
                    .iter()
                    .map(|m| EventCommit {
                        message: (*m).to_string(),
                    })
                    .collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn rank_languages_sorts_and_rounds() {
        let mut bytes = HashMap::new();
        bytes.insert("Rust".to_string(), 60_000_i64);
        bytes.insert("Python".to_string(), 30_000);
        bytes.insert("Shell".to_string(), 10_000);

        let ranked = rank_languages(&bytes);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].name, "Rust");
        assert_eq!(ranked[0].percentage, 60.0);
        assert_eq!(ranked[1].name, "Python");
        assert_eq!(ranked[1].percentage, 30.0);
        assert_eq!(ranked[2].name, "Shell");
        assert_eq!(ranked[2].percentage, 10.0);
    }

    #[test]
    fn rank_languages_rounds_to_one_decimal() {
        let mut bytes = HashMap::new();
        bytes.insert("Rust".to_string(), 2_i64);
        bytes.insert("Python".to_string(), 1);

        let ranked = rank_languages(&bytes);
        assert_eq!(ranked[0].percentage, 66.7);
        assert_eq!(ranked[1].percentage, 33.3);
    }

    #[test]
    fn rank_languages_handles_empty_input() {
        let ranked = rank_languages(&HashMap::new());
        assert!(ranked.is_empty());
    }

    #[test]
    fn rank_languages_keeps_top_ten() {
        let mut bytes = HashMap::new();
        for i in 0..14_i64 {
            bytes.insert(format!("lang{:02}", i), 1000 - i);
        }
        let ranked = rank_languages(&bytes);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].name, "lang00");
    }

    #[test]
    fn top_repos_sorts_by_stars_and_drops_forks_after_cut() {
        let repos = vec![
            repo("small", 1, false),
            repo("popular-fork", 500, true),
            repo("flagship", 900, false),
            repo("mid", 50, false),
        ];

        let top = top_repos(&repos, 3);
        // The fork occupies a slot inside the cut, then gets filtered.
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "flagship");
        assert_eq!(top[1].name, "mid");
    }

    #[test]
    fn total_stars_sums_all_repos() {
        let repos = vec![repo("a", 3, false), repo("b", 4, true)];
        assert_eq!(total_stars(&repos), 7);
    }

    #[test]
    fn count_event_stats_tallies_by_kind() {
        let events = vec![
            push_event("octocat/engine", &["one", "two"]),
            push_event("octocat/engine", &["three"]),
            GitHubEvent {
                kind: "PullRequestEvent".to_string(),
                ..Default::default()
            },
            GitHubEvent {
                kind: "IssuesEvent".to_string(),
                ..Default::default()
            },
            GitHubEvent {
                kind: "WatchEvent".to_string(),
                ..Default::default()
            },
        ];

        let stats = count_event_stats(&events);
        assert_eq!(stats.commits, 3);
        assert_eq!(stats.prs, 1);
        assert_eq!(stats.issues, 1);
    }

    #[test]
    fn push_activity_formats_message_and_detail() {
        let events = vec![push_event(
            "octocat/engine",
            &["first commit", "fix parser\n\nlong body"],
        )];
        let activity = events_to_activity(&events, 20);
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].kind, "push");
        assert_eq!(activity[0].message, "Pushed 2 commits to octocat/engine");
        assert_eq!(activity[0].detail, "fix parser");
        assert_eq!(activity[0].commit_count, Some(2));
    }

    #[test]
    fn single_commit_message_is_singular() {
        let events = vec![push_event("octocat/engine", &["only"])];
        let activity = events_to_activity(&events, 20);
        assert_eq!(activity[0].message, "Pushed 1 commit to octocat/engine");
    }

    #[test]
    fn pull_request_activity_capitalizes_action() {
        let events = vec![GitHubEvent {
            kind: "PullRequestEvent".to_string(),
            repo: Some(EventRepo {
                name: "octocat/engine".to_string(),
            }),
            created_at: Some("2026-01-02T03:04:05Z".to_string()),
            payload: EventPayload {
                action: Some("opened".to_string()),
                pull_request: Some(EventPullRequest {
                    title: "Add codegen".to_string(),
                    number: Some(12),
                    merged: false,
                }),
                ..Default::default()
            },
        }];

        let activity = events_to_activity(&events, 20);
        assert_eq!(
            activity[0].message,
            "Opened PR in octocat/engine: Add codegen"
        );
        assert_eq!(activity[0].pr_number, Some(12));
    }

    #[test]
    fn issue_activity_carries_number() {
        let events = vec![GitHubEvent {
            kind: "IssuesEvent".to_string(),
            repo: Some(EventRepo {
                name: "octocat/engine".to_string(),
            }),
            payload: EventPayload {
                action: Some("closed".to_string()),
                issue: Some(EventIssue {
                    title: "Panic on empty input".to_string(),
                    number: Some(7),
                }),
                ..Default::default()
            },
            ..Default::default()
        }];

        let activity = events_to_activity(&events, 20);
        assert_eq!(
            activity[0].message,
            "Closed issue in octocat/engine: Panic on empty input"
        );
        assert_eq!(activity[0].issue_number, Some(7));
    }

    #[test]
    fn unknown_events_are_skipped_within_limit() {
        let events = vec![
            GitHubEvent {
                kind: "GollumEvent".to_string(),
                ..Default::default()
            },
            push_event("octocat/engine", &["one"]),
        ];
        let activity = events_to_activity(&events, 20);
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].kind, "push");
    }

    #[test]
    fn limit_applies_before_filtering() {
        let events = vec![
            GitHubEvent {
                kind: "GollumEvent".to_string(),
                ..Default::default()
            },
            push_event("octocat/engine", &["one"]),
        ];
        // The unknown event consumes the single slot.
        let activity = events_to_activity(&events, 1);
        assert!(activity.is_empty());
    }
}
