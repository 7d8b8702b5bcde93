use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CodeforcesConfig;
use crate::throttle::RequestThrottle;

use super::ApiError;

/// Codeforces API responses wrap the payload in a status envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct CfEnvelope<T> {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfUser {
    pub handle: String,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub max_rating: Option<i32>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub max_rank: Option<String>,
    #[serde(default)]
    pub title_photo: Option<String>,
    #[serde(default)]
    pub contribution: Option<i32>,
    #[serde(default)]
    pub friend_of_count: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfRatingChange {
    pub contest_id: i64,
    pub contest_name: String,
    pub old_rating: i32,
    pub new_rating: i32,
    #[serde(default)]
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfContest {
    pub id: i64,
    pub name: String,
    pub phase: String,
    #[serde(default)]
    pub start_time_seconds: Option<i64>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}

pub struct CodeforcesClient {
    http: reqwest::Client,
    api_base: String,
    throttle: RequestThrottle,
}

impl CodeforcesClient {
    pub fn new(config: &CodeforcesConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            throttle: RequestThrottle::from_millis(config.min_interval_ms),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.throttle.wait().await;

        let url = format!("{}/{}", self.api_base, method);
        debug!(method, "codeforces request");
        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        let envelope: CfEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if envelope.status != "OK" {
            return Err(ApiError::Upstream(
                envelope
                    .comment
                    .unwrap_or_else(|| format!("Codeforces API error ({})", status)),
            ));
        }
        envelope
            .result
            .ok_or_else(|| ApiError::Decode("missing result field".to_string()))
    }

    /// `user.info` for a single handle. An unknown handle is reported by the
    /// API as a failed status; an empty result list maps to `NotFound`.
    pub async fn user_info(&self, handle: &str) -> Result<CfUser, ApiError> {
        let result: Vec<CfUser> = self
            .get("user.info", &[("handles", handle.to_string())])
            .await?;
        result.into_iter().next().ok_or_else(|| {
            ApiError::NotFound(format!("User \"{}\" not found on Codeforces", handle))
        })
    }

    pub async fn user_rating_history(
        &self,
        handle: &str,
    ) -> Result<Vec<CfRatingChange>, ApiError> {
        self.get("user.rating", &[("handle", handle.to_string())])
            .await
    }

    pub async fn contest_list(&self, gym: bool) -> Result<Vec<CfContest>, ApiError> {
        self.get("contest.list", &[("gym", gym.to_string())]).await
    }
}

/// Codeforces rating to rank-name mapping.
pub fn rank_tier(rating: i32) -> &'static str {
    if rating < 1200 {
        "Newbie"
    } else if rating < 1400 {
        "Pupil"
    } else if rating < 1600 {
        "Specialist"
    } else if rating < 1900 {
        "Expert"
    } else if rating < 2100 {
        "Candidate Master"
    } else if rating < 2300 {
        "Master"
    } else if rating < 2400 {
        "International Master"
    } else if rating < 2600 {
        "Grandmaster"
    } else if rating < 3000 {
        "International Grandmaster"
    } else {
        "Legendary Grandmaster"
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{CfEnvelope, CfUser, rank_tier};

    #[test_case(0, "Newbie")]
    #[test_case(1199, "Newbie")]
    #[test_case(1200, "Pupil")]
    #[test_case(1399, "Pupil")]
    #[test_case(1400, "Specialist")]
    #[test_case(1600, "Expert")]
    #[test_case(1899, "Expert")]
    #[test_case(1900, "Candidate Master")]
    #[test_case(2100, "Master")]
    #[test_case(2300, "International Master")]
    #[test_case(2400, "Grandmaster")]
    #[test_case(2600, "International Grandmaster")]
    #[test_case(2999, "International Grandmaster")]
    #[test_case(3000, "Legendary Grandmaster")]
    #[test_case(3800, "Legendary Grandmaster")]
    fn rank_tier_thresholds(rating: i32, expected: &str) {
        assert_eq!(rank_tier(rating), expected);
    }

    #[test]
    fn envelope_decodes_successful_response() {
        let raw = r#"{
            "status": "OK",
            "result": [{
                "handle": "tourist",
                "rating": 3858,
                "maxRating": 4009,
                "rank": "legendary grandmaster",
                "maxRank": "legendary grandmaster",
                "titlePhoto": "https://example.org/photo.jpg",
                "contribution": 128,
                "friendOfCount": 70000
            }]
        }"#;
        let envelope: CfEnvelope<Vec<CfUser>> = serde_json::from_str(raw).expect("decodes");
        assert_eq!(envelope.status, "OK");
        let user = &envelope.result.expect("result present")[0];
        assert_eq!(user.handle, "tourist");
        assert_eq!(user.rating, Some(3858));
        assert_eq!(user.max_rating, Some(4009));
        assert_eq!(user.friend_of_count, Some(70000));
    }

    #[test]
    fn envelope_decodes_unrated_user_with_missing_fields() {
        let raw = r#"{"status": "OK", "result": [{"handle": "fresh_account"}]}"#;
        let envelope: CfEnvelope<Vec<CfUser>> = serde_json::from_str(raw).expect("decodes");
        let user = &envelope.result.expect("result present")[0];
        assert_eq!(user.rating, None);
        assert_eq!(user.rank, None);
    }

    #[test]
    fn envelope_carries_failure_comment() {
        let raw = r#"{"status": "FAILED", "comment": "handles: User with handle nobody not found"}"#;
        let envelope: CfEnvelope<Vec<CfUser>> = serde_json::from_str(raw).expect("decodes");
        assert_eq!(envelope.status, "FAILED");
        assert!(envelope.comment.expect("comment").contains("not found"));
        assert!(envelope.result.is_none());
    }
}
