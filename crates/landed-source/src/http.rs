use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use landed_domain::{HttpAuth, HttpPagination, ResilienceSpec};
use landed_resilience::{Gate, ResilienceRegistry};
use reqwest::{Method, RequestBuilder};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::{CursorCell, RecordStream, SourceAdapter};
use crate::error::{is_retryable_status, SourceError};
use crate::json::{json_object_to_record, navigate_record_path};

#[derive(Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
    method: String,
    headers: Vec<(String, String)>,
    query_params: Vec<(String, String)>,
    auth: HttpAuth,
    pagination: HttpPagination,
    record_path: String,
    prefetch_depth: u32,
    identity: String,
    resilience: ResilienceSpec,
    registry: Arc<ResilienceRegistry>,
}

impl HttpAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base_url: String,
        endpoint: String,
        method: String,
        headers: Vec<(String, String)>,
        query_params: Vec<(String, String)>,
        auth: HttpAuth,
        pagination: HttpPagination,
        record_path: String,
        prefetch_depth: Option<u32>,
        identity: String,
        resilience: ResilienceSpec,
        registry: Arc<ResilienceRegistry>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            endpoint,
            method,
            headers,
            query_params,
            auth,
            pagination,
            record_path,
            prefetch_depth: prefetch_depth.unwrap_or(1).max(1),
            identity,
            resilience,
            registry,
        }
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.endpoint.trim_start_matches('/'))
    }

    /// Credentials are pulled from the environment just-in-time and attached
    /// directly to the request; they never get stored on `self` or logged.
    fn apply_auth(&self, builder: RequestBuilder) -> Result<RequestBuilder, SourceError> {
        match &self.auth {
            HttpAuth::None => Ok(builder),
            HttpAuth::Bearer { token_env } => {
                let token = read_env(token_env)?;
                Ok(builder.bearer_auth(token))
            }
            HttpAuth::HeaderKey { header, token_env } => {
                let token = read_env(token_env)?;
                Ok(builder.header(header, token))
            }
            HttpAuth::Basic { user_env, password_env } => {
                let user = read_env(user_env)?;
                let password = read_env(password_env)?;
                Ok(builder.basic_auth(user, Some(password)))
            }
        }
    }

    async fn run(
        self,
        tx: mpsc::Sender<Result<landed_domain::Record, SourceError>>,
        cursor_cell: CursorCell,
        cancel: CancellationToken,
    ) {
        if let Err(err) = self.drive(&tx, &cursor_cell, &cancel).await {
            let _ = tx.send(Err(err)).await;
        }
    }

    async fn drive(
        &self,
        tx: &mpsc::Sender<Result<landed_domain::Record, SourceError>>,
        cursor_cell: &CursorCell,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        let gate = Gate::new(&self.identity, &self.resilience, &self.registry).await;
        let mut offset: u32 = 0;
        let mut page: u32 = 1;
        let mut cursor_token: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let method = Method::from_bytes(self.method.as_bytes())
                .map_err(|_| SourceError::Config(format!("invalid http method '{}'", self.method)))?;

            let body = gate
                .call(cancel, || self.fetch_page(method.clone(), offset, page, cursor_token.as_deref()))
                .await
                .map_err(SourceError::from)?;

            let items = navigate_record_path(&body, &self.record_path)
                .and_then(|v| v.as_array())
                .cloned()
                .ok_or_else(|| SourceError::RecordPathNotFound(self.record_path.clone()))?;

            let page_len = items.len();
            for item in items {
                if tx.send(Ok(json_object_to_record(item))).await.is_err() {
                    return Ok(());
                }
            }

            match &self.pagination {
                HttpPagination::None => break,
                HttpPagination::Offset { size, .. } => {
                    if page_len < *size as usize {
                        break;
                    }
                    offset += *size;
                }
                HttpPagination::Page { .. } => {
                    if page_len == 0 {
                        break;
                    }
                    page += 1;
                }
                HttpPagination::Cursor { next_field_path, .. } => {
                    let next = navigate_record_path(&body, next_field_path).and_then(|v| v.as_str());
                    match next {
                        Some(next) if !next.is_empty() => cursor_token = Some(next.to_string()),
                        _ => break,
                    }
                }
            }
        }

        if let Some(token) = cursor_token {
            cursor_cell.set(token).await;
        }
        Ok(())
    }

    async fn fetch_page(
        &self,
        method: Method,
        offset: u32,
        page: u32,
        cursor_token: Option<&str>,
    ) -> Result<serde_json::Value, SourceError> {
        let mut builder = self.client.request(method, self.url());
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        builder = self.apply_auth(builder)?;

        let mut query = self.query_params.clone();
        match &self.pagination {
            HttpPagination::Offset { size, offset_param, limit_param } => {
                query.push((offset_param.clone(), offset.to_string()));
                query.push((limit_param.clone(), size.to_string()));
            }
            HttpPagination::Page { page_param, size_param: _ } => {
                // `size_param` names the query key the server expects a page
                // size under, but §4.3 doesn't give this variant its own
                // size value — callers fold it into `query_params` instead.
                query.push((page_param.clone(), page.to_string()));
            }
            HttpPagination::Cursor { request_param, .. } => {
                if let Some(token) = cursor_token {
                    query.push((request_param.clone(), token.to_string()));
                }
            }
            HttpPagination::None => {}
        }
        builder = builder.query(&query);

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        if !status.is_success() {
            let endpoint = self.endpoint.clone();
            let code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %endpoint, status = code, retryable = is_retryable_status(code), "http source error response");
            return Err(SourceError::Status { status: code, endpoint, body, retry_after });
        }

        let body: serde_json::Value = response.json().await?;
        debug!(endpoint = %self.endpoint, "fetched http page");
        Ok(body)
    }
}

fn read_env(name: &str) -> Result<String, SourceError> {
    std::env::var(name).map_err(|_| SourceError::Config(format!("environment variable '{name}' is not set")))
}

#[async_trait::async_trait]
impl SourceAdapter for HttpAdapter {
    async fn extract(&self, cancel: CancellationToken) -> Result<(RecordStream, CursorCell), SourceError> {
        let cursor_cell = CursorCell::new();
        let (tx, rx) = mpsc::channel(self.prefetch_depth as usize);
        let worker = self.clone();
        let worker_cursor = cursor_cell.clone();
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            worker.run(tx, worker_cursor, worker_cancel).await;
        });
        Ok((ReceiverStream::new(rx).boxed(), cursor_cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::ResilienceSpec;

    #[test]
    fn builds_url_without_double_slash() {
        let adapter = HttpAdapter::new(
            "https://example.com/api/".to_string(),
            "/v1/things".to_string(),
            "GET".to_string(),
            vec![],
            vec![],
            HttpAuth::None,
            HttpPagination::None,
            "".to_string(),
            None,
            "test".to_string(),
            ResilienceSpec::default(),
            Arc::new(ResilienceRegistry::new()),
        );
        assert_eq!(adapter.url(), "https://example.com/api/v1/things");
    }
}
