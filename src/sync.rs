use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::clients::codeforces::{CfUser, rank_tier};
use crate::clients::github::GitHubClient;
use crate::clients::stats::{self, TOP_REPO_LIMIT};
use crate::clients::{ApiError, stats::EventStats};
use crate::db::models::{CodeforcesProfile, GitHubProfile};

const REPO_FETCH_COUNT: u32 = 30;
const EVENT_FETCH_COUNT: u32 = 30;

/// Cached profile row built from a `user.info` response. Missing fields are
/// filled with the same defaults an unrated account gets.
pub fn codeforces_profile_from_user(user_id: Uuid, cf_user: &CfUser) -> CodeforcesProfile {
    let rating = cf_user.rating.unwrap_or(0);
    CodeforcesProfile {
        id: 0,
        user_id,
        handle: cf_user.handle.clone(),
        rating,
        max_rating: cf_user.max_rating.unwrap_or(0),
        rank: cf_user
            .rank
            .clone()
            .unwrap_or_else(|| rank_tier(rating).to_string()),
        max_rank: cf_user
            .max_rank
            .clone()
            .unwrap_or_else(|| rank_tier(rating).to_string()),
        avatar_url: cf_user.title_photo.clone().unwrap_or_default(),
        contribution: cf_user.contribution.unwrap_or(0),
        friend_count: cf_user.friend_of_count.unwrap_or(0),
        problems_solved: 0,
        last_synced: Utc::now(),
    }
}

/// Refresh semantics for an already-linked Codeforces profile: fields the
/// API response omits keep their cached values, and `problems_solved` is
/// tracked locally so a sync never resets it.
pub fn merge_codeforces_profile(
    existing: &CodeforcesProfile,
    cf_user: &CfUser,
) -> CodeforcesProfile {
    CodeforcesProfile {
        id: existing.id,
        user_id: existing.user_id,
        handle: existing.handle.clone(),
        rating: cf_user.rating.unwrap_or(existing.rating),
        max_rating: cf_user.max_rating.unwrap_or(existing.max_rating),
        rank: cf_user.rank.clone().unwrap_or_else(|| existing.rank.clone()),
        max_rank: cf_user
            .max_rank
            .clone()
            .unwrap_or_else(|| existing.max_rank.clone()),
        avatar_url: cf_user
            .title_photo
            .clone()
            .unwrap_or_else(|| existing.avatar_url.clone()),
        contribution: cf_user.contribution.unwrap_or(existing.contribution),
        friend_count: cf_user.friend_of_count.unwrap_or(existing.friend_count),
        problems_solved: existing.problems_solved,
        last_synced: Utc::now(),
    }
}

fn keep_if_empty(fresh: String, cached: &str) -> String {
    if fresh.is_empty() {
        cached.to_string()
    } else {
        fresh
    }
}

/// Refresh semantics for an already-linked GitHub profile: descriptive
/// strings the refresh came back empty for keep their cached values,
/// counters always take the fresh numbers.
pub fn merge_github_profile(existing: &GitHubProfile, fresh: GitHubProfile) -> GitHubProfile {
    GitHubProfile {
        id: existing.id,
        user_id: existing.user_id,
        username: existing.username.clone(),
        github_id: fresh.github_id.or(existing.github_id),
        avatar_url: keep_if_empty(fresh.avatar_url, &existing.avatar_url),
        html_url: keep_if_empty(fresh.html_url, &existing.html_url),
        bio: keep_if_empty(fresh.bio, &existing.bio),
        company: keep_if_empty(fresh.company, &existing.company),
        location: keep_if_empty(fresh.location, &existing.location),
        blog: keep_if_empty(fresh.blog, &existing.blog),
        public_repos: fresh.public_repos,
        public_gists: fresh.public_gists,
        followers: fresh.followers,
        following: fresh.following,
        total_commits: fresh.total_commits,
        total_prs: fresh.total_prs,
        total_issues: fresh.total_issues,
        total_stars_received: fresh.total_stars_received,
        top_languages: fresh.top_languages,
        top_repos: fresh.top_repos,
        access_token: existing.access_token.clone(),
        last_synced: fresh.last_synced,
        github_created_at: fresh.github_created_at.or(existing.github_created_at),
    }
}

fn parse_github_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fetches everything a cached GitHub profile holds and assembles the row.
///
/// Only the user lookup is fatal. Repos, languages and events degrade to
/// empty defaults when their fetches fail, so a partially rate-limited sync
/// still overwrites the row with what it could get.
pub async fn assemble_github_profile(
    client: &GitHubClient,
    user_id: Uuid,
    username: &str,
    access_token: &str,
) -> Result<GitHubProfile, ApiError> {
    let token = if access_token.is_empty() {
        None
    } else {
        Some(access_token)
    };

    let gh_user = client.fetch_user(username, token).await?;

    let repos = match client
        .fetch_user_repos(&gh_user.login, REPO_FETCH_COUNT, token)
        .await
    {
        Ok(repos) => repos,
        Err(err) => {
            debug!(username, error = %err, "repo fetch failed, degrading to empty");
            Vec::new()
        }
    };

    let top_languages = if repos.is_empty() {
        Vec::new()
    } else {
        stats::aggregate_languages(client, &repos, token).await
    };
    let top_repos = stats::top_repos(&repos, TOP_REPO_LIMIT);
    let total_stars = stats::total_stars(&repos);

    let event_stats = match client
        .fetch_user_events(&gh_user.login, EVENT_FETCH_COUNT, token)
        .await
    {
        Ok(events) => stats::count_event_stats(&events),
        Err(err) => {
            debug!(username, error = %err, "event fetch failed, degrading to zero counts");
            EventStats::default()
        }
    };

    Ok(GitHubProfile {
        id: 0,
        user_id,
        username: gh_user.login.clone(),
        github_id: Some(gh_user.id),
        avatar_url: gh_user.avatar_url.clone().unwrap_or_default(),
        html_url: gh_user.html_url.clone().unwrap_or_default(),
        bio: gh_user.bio.clone().unwrap_or_default(),
        company: gh_user.company.clone().unwrap_or_default(),
        location: gh_user.location.clone().unwrap_or_default(),
        blog: gh_user.blog.clone().unwrap_or_default(),
        public_repos: gh_user.public_repos,
        public_gists: gh_user.public_gists,
        followers: gh_user.followers,
        following: gh_user.following,
        total_commits: event_stats.commits,
        total_prs: event_stats.prs,
        total_issues: event_stats.issues,
        total_stars_received: total_stars,
        top_languages,
        top_repos,
        access_token: access_token.to_string(),
        last_synced: Utc::now(),
        github_created_at: parse_github_timestamp(gh_user.created_at.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{
        codeforces_profile_from_user, merge_codeforces_profile, merge_github_profile,
        parse_github_timestamp,
    };
    use crate::clients::codeforces::CfUser;

    #[test]
    fn cf_profile_copies_all_fields() {
        let cf_user = CfUser {
            handle: "tourist".to_string(),
            rating: Some(3858),
            max_rating: Some(4009),
            rank: Some("legendary grandmaster".to_string()),
            max_rank: Some("legendary grandmaster".to_string()),
            title_photo: Some("https://example.org/photo.jpg".to_string()),
            contribution: Some(128),
            friend_of_count: Some(70000),
        };

        let profile = codeforces_profile_from_user(Uuid::new_v4(), &cf_user);
        assert_eq!(profile.handle, "tourist");
        assert_eq!(profile.rating, 3858);
        assert_eq!(profile.max_rating, 4009);
        assert_eq!(profile.rank, "legendary grandmaster");
        assert_eq!(profile.friend_count, 70000);
        assert_eq!(profile.problems_solved, 0);
    }

    #[test]
    fn unrated_cf_user_gets_newbie_defaults() {
        let cf_user = CfUser {
            handle: "fresh_account".to_string(),
            rating: None,
            max_rating: None,
            rank: None,
            max_rank: None,
            title_photo: None,
            contribution: None,
            friend_of_count: None,
        };

        let profile = codeforces_profile_from_user(Uuid::new_v4(), &cf_user);
        assert_eq!(profile.rating, 0);
        assert_eq!(profile.rank, "Newbie");
        assert_eq!(profile.max_rank, "Newbie");
        assert_eq!(profile.avatar_url, "");
    }

    #[test]
    fn github_timestamps_parse_rfc3339() {
        let parsed = parse_github_timestamp(Some("2011-01-25T18:44:36Z"));
        assert!(parsed.is_some());
        assert!(parse_github_timestamp(Some("not a date")).is_none());
        assert!(parse_github_timestamp(None).is_none());
    }

    #[test]
    fn cf_sync_merge_keeps_cached_values_for_missing_fields() {
        let existing = {
            let mut profile = codeforces_profile_from_user(
                Uuid::new_v4(),
                &CfUser {
                    handle: "ada_cf".to_string(),
                    rating: Some(1500),
                    max_rating: Some(1600),
                    rank: Some("Specialist".to_string()),
                    max_rank: Some("Expert".to_string()),
                    title_photo: Some("https://x/old.jpg".to_string()),
                    contribution: Some(3),
                    friend_of_count: Some(9),
                },
            );
            profile.problems_solved = 42;
            profile
        };

        let refresh = CfUser {
            handle: "ada_cf".to_string(),
            rating: Some(1700),
            max_rating: None,
            rank: None,
            max_rank: None,
            title_photo: None,
            contribution: None,
            friend_of_count: None,
        };

        let merged = merge_codeforces_profile(&existing, &refresh);
        assert_eq!(merged.rating, 1700);
        assert_eq!(merged.max_rating, 1600);
        assert_eq!(merged.rank, "Specialist");
        assert_eq!(merged.avatar_url, "https://x/old.jpg");
        assert_eq!(merged.problems_solved, 42);
    }

    #[test]
    fn gh_sync_merge_keeps_cached_strings_but_takes_fresh_counters() {
        let user_id = Uuid::new_v4();
        let existing = gh_profile(user_id, "octo-ada", "Compilers and espresso", 10);
        let mut fresh = gh_profile(user_id, "ignored", "", 25);
        fresh.access_token = "new-token-should-not-stick".to_string();

        let merged = merge_github_profile(&existing, fresh);
        assert_eq!(merged.username, "octo-ada");
        assert_eq!(merged.bio, "Compilers and espresso");
        assert_eq!(merged.followers, 25);
        assert_eq!(merged.access_token, existing.access_token);
    }

    fn gh_profile(
        user_id: Uuid,
        username: &str,
        bio: &str,
        followers: i32,
    ) -> crate::db::models::GitHubProfile {
        crate::db::models::GitHubProfile {
            id: 0,
            user_id,
            username: username.to_string(),
            github_id: Some(1),
            avatar_url: String::new(),
            html_url: String::new(),
            bio: bio.to_string(),
            company: String::new(),
            location: String::new(),
            blog: String::new(),
            public_repos: 0,
            public_gists: 0,
            followers,
            following: 0,
            total_commits: 0,
            total_prs: 0,
            total_issues: 0,
            total_stars_received: 0,
            top_languages: Vec::new(),
            top_repos: Vec::new(),
            access_token: "cached-token".to_string(),
            last_synced: chrono::Utc::now(),
            github_created_at: None,
        }
    }
}
