use super::{RemoteContent, RemoteFile};
use crate::config::ExportSettings;
use crate::error::RemoteError;
use async_trait::async_trait;
use base64::prelude::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// GitHub contents API 客户端（单个仓库）
pub struct GitHubContent {
    client: Client,
    api_base: String,
    repo: String,
    token: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: Option<String>,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: Option<WrittenContent>,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubContent {
    pub fn new(settings: &ExportSettings) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let api_base = settings.api_base.trim_end_matches('/').to_string();
        let repo = settings.repo.trim().to_string();

        Ok(Self {
            client: builder.build()?,
            name: format!("github://{}", repo),
            api_base,
            repo,
            token: settings.token.clone(),
        })
    }

    /// 文件的 contents 接口地址，路径逐段编码
    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repo,
            encoded.join("/")
        )
    }

    fn ref_url(&self, path: &str, reference: &str) -> String {
        format!(
            "{}?ref={}",
            self.contents_url(path),
            urlencoding::encode(reference)
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    /// 获取文件元数据，不存在时返回 `None`
    async fn fetch(&self, path: &str, reference: &str) -> Result<Option<ContentsResponse>, RemoteError> {
        let response = self
            .authorized(self.client.get(self.ref_url(path, reference)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(response.json::<ContentsResponse>().await?))
    }
}

/// 解码 contents 接口返回的 base64 内容（内容中可能带换行）
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, RemoteError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

/// 409，或 422 且提示缺少 sha，都视为版本冲突
fn is_conflict(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::UNPROCESSABLE_ENTITY && body.contains("sha"))
}

#[async_trait]
impl RemoteContent for GitHubContent {
    async fn read(&self, path: &str, reference: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let Some(data) = self.fetch(path, reference).await? else {
            return Ok(None);
        };

        let content = match data.content.as_deref() {
            Some(encoded) => decode_content(encoded)?,
            None => Vec::new(),
        };

        Ok(Some(RemoteFile {
            content,
            sha: data.sha,
        }))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected: Option<&str>,
    ) -> Result<String, RemoteError> {
        let body = WriteRequest {
            message,
            content: BASE64_STANDARD.encode(content),
            branch,
            sha: expected,
        };

        debug!(
            "PUT {} (branch={}, sha={:?}, {} bytes)",
            path,
            branch,
            expected,
            content.len()
        );

        let response = self
            .authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_conflict(status, &body) {
                return Err(RemoteError::Conflict {
                    path: path.to_string(),
                });
            }
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let written = response.json::<WriteResponse>().await?;
        Ok(written.content.map(|c| c.sha).unwrap_or_default())
    }

    async fn exists(&self, path: &str, branch: &str) -> bool {
        match self
            .authorized(self.client.get(self.ref_url(path, branch)))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("检查 {} 失败: {}", path, e);
                false
            }
        }
    }

    async fn revision(&self, path: &str, branch: &str) -> Option<String> {
        match self.fetch(path, branch).await {
            Ok(found) => found.map(|data| data.sha),
            Err(e) => {
                debug!("获取 {} 版本失败: {}", path, e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
