//! Remote memos server client
//!
//! Talks to the memos REST API (`/api/v1/memos`) with a bearer access token.

use crate::application::ports::CredentialsValidator;
use crate::domain::{Credentials, Memo};
use crate::error::{MemoTrackError, Result};
use crate::infrastructure::repository::MemosRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info};

const PAGE_SIZE: usize = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Memo as returned by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteMemo {
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    update_time: Option<DateTime<Utc>>,
}

impl From<RemoteMemo> for Memo {
    fn from(remote: RemoteMemo) -> Self {
        Memo {
            name: remote.name,
            content: remote.content,
            create_time: remote.create_time,
            update_time: remote.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMemosResponse {
    #[serde(default)]
    memos: Vec<RemoteMemo>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Debug, Serialize)]
struct MemoBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<&'a str>,
}

fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("memotrack/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(MemoTrackError::InvalidCredentials(format!(
            "server rejected the access token ({})",
            status.as_u16()
        )));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(MemoTrackError::MemoNotFound(message));
    }
    Err(MemoTrackError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Decode a response body, keeping serde's position info in the error
fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = response.bytes().await?;
    decode_json(&body)
}

/// Memos server implementation of MemosRepository
///
/// Credentials are swappable at runtime so a login takes effect without
/// rebuilding the repository.
pub struct RemoteMemosRepository {
    client: reqwest::Client,
    credentials: RwLock<Option<Credentials>>,
}

impl RemoteMemosRepository {
    pub fn new(credentials: Option<Credentials>) -> Result<Self> {
        Ok(RemoteMemosRepository {
            client: build_client()?,
            credentials: RwLock::new(credentials),
        })
    }

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = credentials;
    }

    fn credentials(&self) -> Result<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| MemoTrackError::InvalidCredentials("not logged in".to_string()))
    }

    fn url(credentials: &Credentials, path: &str) -> String {
        format!("{}/api/v1/{}", credentials.base_url(), path)
    }

    async fn fetch_page(
        client: &reqwest::Client,
        credentials: &Credentials,
        page_size: usize,
        page_token: &str,
    ) -> Result<ListMemosResponse> {
        let mut request = client
            .get(Self::url(credentials, "memos"))
            .bearer_auth(&credentials.token)
            .query(&[("pageSize", page_size.to_string())]);
        if !page_token.is_empty() {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = check_status(request.send().await?).await?;
        read_json(response).await
    }
}

#[async_trait]
impl MemosRepository for RemoteMemosRepository {
    async fn load_memos(&self) -> Result<Vec<Memo>> {
        let credentials = self.credentials()?;
        let mut memos = Vec::new();
        let mut page_token = String::new();

        loop {
            let page = Self::fetch_page(&self.client, &credentials, PAGE_SIZE, &page_token).await?;
            memos.extend(page.memos.into_iter().map(Memo::from));
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }

        debug!(count = memos.len(), "loaded remote memos");
        Ok(memos)
    }

    async fn create_memo(&self, content: &str) -> Result<Memo> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .post(Self::url(&credentials, "memos"))
            .bearer_auth(&credentials.token)
            .json(&MemoBody {
                content,
                visibility: Some("PRIVATE"),
            })
            .send()
            .await?;

        let memo: RemoteMemo = read_json(check_status(response).await?).await?;
        info!(memo = %memo.name, "created remote memo");
        Ok(memo.into())
    }

    async fn update_memo(&self, name: &str, content: &str) -> Result<Memo> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .patch(Self::url(&credentials, name))
            .bearer_auth(&credentials.token)
            .query(&[("updateMask", "content")])
            .json(&MemoBody {
                content,
                visibility: None,
            })
            .send()
            .await?;

        let memo: RemoteMemo = read_json(check_status(response).await?).await?;
        Ok(memo.into())
    }

    async fn delete_memo(&self, name: &str) -> Result<()> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .delete(Self::url(&credentials, name))
            .bearer_auth(&credentials.token)
            .send()
            .await?;

        check_status(response).await?;
        info!(memo = %name, "deleted remote memo");
        Ok(())
    }
}

/// Checks credentials with one authenticated list request
pub struct RemoteCredentialsValidator {
    client: reqwest::Client,
}

impl RemoteCredentialsValidator {
    pub fn new() -> Result<Self> {
        Ok(RemoteCredentialsValidator {
            client: build_client()?,
        })
    }
}

#[async_trait]
impl CredentialsValidator for RemoteCredentialsValidator {
    async fn validate(&self, credentials: &Credentials) -> Result<()> {
        RemoteMemosRepository::fetch_page(&self.client, credentials, 1, "").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_parses_camel_case() {
        let json = r##"{
            "memos": [
                {
                    "name": "memos/abc",
                    "content": "#habits/daily 2024-01-15",
                    "createTime": "2024-01-15T08:30:00Z",
                    "updateTime": "2024-01-15T09:00:00Z",
                    "visibility": "PRIVATE"
                }
            ],
            "nextPageToken": "next"
        }"##;

        let page: ListMemosResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token, "next");
        let memo: Memo = page.memos.into_iter().next().unwrap().into();
        assert_eq!(memo.name, "memos/abc");
        assert!(memo.create_time.is_some());
    }

    #[test]
    fn test_list_response_defaults() {
        let page: ListMemosResponse = serde_json::from_str("{}").unwrap();
        assert!(page.memos.is_empty());
        assert!(page.next_page_token.is_empty());
    }

    #[test]
    fn test_malformed_body_is_json_error() {
        let result: Result<ListMemosResponse> = decode_json(br#"{"memos": 3}"#);
        assert!(matches!(result, Err(MemoTrackError::Json(_))));

        let page: ListMemosResponse = decode_json(br#"{"nextPageToken": "p2"}"#).unwrap();
        assert_eq!(page.next_page_token, "p2");
    }

    #[test]
    fn test_url_joins_base() {
        let creds = Credentials::new("https://memos.example.com/", "t");
        assert_eq!(
            RemoteMemosRepository::url(&creds, "memos/abc"),
            "https://memos.example.com/api/v1/memos/abc"
        );
    }

    #[tokio::test]
    async fn test_requires_credentials() {
        let repo = RemoteMemosRepository::new(None).unwrap();
        let result = repo.load_memos().await;
        assert!(matches!(result, Err(MemoTrackError::InvalidCredentials(_))));
    }

    #[test]
    fn test_memo_body_omits_missing_visibility() {
        let body = MemoBody {
            content: "hi",
            visibility: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"content":"hi"}"#);
    }
}
