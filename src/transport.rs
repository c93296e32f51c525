//! HTTP 傳輸層抽象。
//!
//! 協議流程只透過 [`Transport`] 發出請求，預設實作 [`HttpTransport`] 使用
//! `reqwest` 的阻塞式客戶端；[`MockTransport`] 則以預先排定的回應取代網路，
//! 用於測試。

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// 簽名請求所使用的 Content-Type。
pub const JOSE_JSON: &str = "application/jose+json";

/// ACME 錯誤文件（RFC 7807）的 Content-Type。
pub const PROBLEM_JSON: &str = "application/problem+json";

/// 傳輸層可能發生的錯誤。
#[derive(Debug, Error)]
pub enum TransportError {
    /// 底層 HTTP 客戶端錯誤。
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    /// 伺服器回傳非 2xx 狀態碼。
    #[error("Request failed: {status}, {}", describe_failure(.problem, .body))]
    Status {
        status: StatusCode,
        problem: Option<Problem>,
        body: String,
    },
    /// 回應缺少預期的標頭。
    #[error("Missing {0} header in response")]
    MissingHeader(&'static str),
    /// 標頭值無法轉換成字串。
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::ToStrError),
    /// 測試用傳輸層沒有剩餘的回應可用。
    #[error("No scripted response left for {method} {url}")]
    Exhausted { method: Method, url: String },
}

type Result<T> = std::result::Result<T, TransportError>;

fn describe_failure(problem: &Option<Problem>, body: &str) -> String {
    match problem {
        Some(problem) => problem.to_string(),
        None => body.to_string(),
    }
}

/// ACME 伺服器回傳的錯誤文件。
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "type", default)]
    pub problem_type: String,
    #[serde(default)]
    pub detail: String,
    pub status: Option<u16>,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.problem_type, self.detail)
    }
}

/// 傳輸層支援的 HTTP 方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        })
    }
}

/// 一次 HTTP 交換的結果。
///
/// 標頭使用 [`HeaderMap`]，查詢時不區分大小寫。
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 建立一個沒有標頭的回應。
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 附加一個標頭，無效的名稱或值會被忽略。
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// 讀取字串形式的標頭值，缺少時回傳 [`TransportError::MissingHeader`]。
    pub fn header(&self, name: &'static str) -> Result<String> {
        let value = self
            .headers
            .get(name)
            .ok_or(TransportError::MissingHeader(name))?;
        Ok(value.to_str()?.to_string())
    }

    /// 非 2xx 狀態時轉換為 [`TransportError::Status`]，並盡量解析錯誤文件。
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }

        let is_problem = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(PROBLEM_JSON) || v.starts_with("application/json"));
        let problem = if is_problem {
            serde_json::from_slice(&self.body).ok()
        } else {
            None
        };

        Err(TransportError::Status {
            status: self.status,
            problem,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}

/// 發出 HTTP 請求的介面。
///
/// 逾時、重新導向與 TLS 設定都屬於實作者的責任。
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;

    fn head(&self, url: &str) -> Result<HttpResponse>;

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse>;
}

/// 基於 `reqwest` 阻塞式客戶端的傳輸層。
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// 以指定的 User-Agent 與可選的逾時建立傳輸層。
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent.to_string());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn collect(response: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        debug!(url, "GET");
        Self::collect(self.client.get(url).send()?)
    }

    fn head(&self, url: &str) -> Result<HttpResponse> {
        debug!(url, "HEAD");
        Self::collect(self.client.head(url).send()?)
    }

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse> {
        debug!(url, content_type, len = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()?;
        Self::collect(response)
    }
}

/// [`MockTransport`] 所記錄的一次請求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// 將請求本文解析為 JSON。
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}

/// 模擬傳輸層，依序回傳預先排定的回應並記錄所有請求，通常用於測試環境。
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 排入下一個要回傳的回應。
    pub fn push(&self, response: HttpResponse) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
        self
    }

    /// 取得目前為止記錄到的請求。
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn respond(&self, method: Method, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                body,
            });
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front())
            .ok_or_else(|| TransportError::Exhausted {
                method,
                url: url.to_string(),
            })
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        self.respond(Method::Get, url, Vec::new())
    }

    fn head(&self, url: &str) -> Result<HttpResponse> {
        self.respond(Method::Head, url, Vec::new())
    }

    fn post(&self, url: &str, _content_type: &str, body: Vec<u8>) -> Result<HttpResponse> {
        self.respond(Method::Post, url, body)
    }
}
