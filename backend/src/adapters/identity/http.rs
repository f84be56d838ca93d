//! HTTP client for the member service.
//!
//! `GET {base_url}/feign-member/student/info` with the caller's
//! Authorization header returns the student and their assigned teacher.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::domain::schedule::MemberIdentity;
use crate::ports::{IdentityError, IdentityLookup};

const STUDENT_INFO_PATH: &str = "/feign-member/student/info";

/// Configuration for the member service client.
#[derive(Debug, Clone)]
pub struct HttpIdentityConfig {
    pub base_url: String,
    pub timeout: Duration,
}

pub struct HttpIdentityLookup {
    config: HttpIdentityConfig,
    client: Client,
}

impl HttpIdentityLookup {
    pub fn new(config: HttpIdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn student_info_url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), STUDENT_INFO_PATH)
    }
}

/// Maps a non-success status from the member service.
fn status_to_error(status: StatusCode, body: String) -> IdentityError {
    match status.as_u16() {
        400 => IdentityError::InvalidRequest(body),
        401 | 403 => IdentityError::Forbidden,
        404 => IdentityError::NotFound,
        _ => IdentityError::Unavailable(format!("Unexpected status {}: {}", status, body)),
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityLookup {
    async fn student_info(&self, auth_token: &str) -> Result<MemberIdentity, IdentityError> {
        let response = self
            .client
            .get(self.student_info_url())
            .header(reqwest::header::AUTHORIZATION, auth_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::Unavailable(format!(
                        "Timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else {
                    IdentityError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, body));
        }

        response
            .json::<MemberIdentity>()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("Invalid member response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_member_service_contract() {
        assert_eq!(
            status_to_error(StatusCode::BAD_REQUEST, "bad".into()),
            IdentityError::InvalidRequest("bad".into())
        );
        assert_eq!(status_to_error(StatusCode::UNAUTHORIZED, String::new()), IdentityError::Forbidden);
        assert_eq!(status_to_error(StatusCode::FORBIDDEN, String::new()), IdentityError::Forbidden);
        assert_eq!(status_to_error(StatusCode::NOT_FOUND, String::new()), IdentityError::NotFound);
        assert!(status_to_error(StatusCode::BAD_GATEWAY, String::new()).is_dependency_fault());
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        let lookup = HttpIdentityLookup::new(HttpIdentityConfig {
            base_url: "http://member:8080/".to_string(),
            timeout: Duration::from_secs(3),
        })
        .unwrap();
        assert_eq!(lookup.student_info_url(), "http://member:8080/feign-member/student/info");
    }
}
