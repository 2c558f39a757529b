/// 后端 HTTP 客户端
///
/// 封装所有与变形题服务相关的 REST / 事件流调用
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::clients::backend::{ByteStream, StreamingBackend, TemplateSource, VariantBackend};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, ConfigError};
use crate::models::{DifficultySpec, GenerationBatch, OriginalSolution, Question, VariantCandidate};

const API_KEY_HEADER: &str = "x-gemini-api-key";

const GENERATE_CODE: &str = "variants/generate-code";
const EXECUTE_CODE: &str = "variants/execute-code";
const SOLVE_ORIGINAL: &str = "variants/solve-original";
const QUICK_VERIFY: &str = "variants/quick-verify";

/// 变形题服务客户端
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    default_template_url: Option<String>,
}

impl HttpBackend {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
        if let Some(key) = &config.gemini_api_key {
            match HeaderValue::from_str(key) {
                Ok(value) => {
                    headers.insert(API_KEY_HEADER, value);
                }
                Err(_) => warn!("⚠️ GEMINI_API_KEY 含有非法字符，已忽略"),
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| ConfigError::HttpClient { source })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            default_template_url: config.default_template_url.clone(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }

    /// POST JSON 并解析响应
    async fn post_json<T: DeserializeOwned>(&self, endpoint: &str, body: &JsonValue) -> AppResult<T> {
        let url = self.endpoint_url(endpoint);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: extract_message(&text),
            }
            .into());
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// POST JSON 并以字节流读取响应
    async fn post_stream(&self, endpoint: String, body: &JsonValue) -> AppResult<ByteStream> {
        let url = self.endpoint_url(&endpoint);
        debug!("POST (stream) {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
                message: extract_message(&text),
            }
            .into());
        }

        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map(|bytes| bytes.to_vec()).map_err(|source| {
                AppError::Api(ApiError::StreamFailed {
                    endpoint: endpoint.clone(),
                    source,
                })
            })
        });

        Ok(stream.boxed())
    }
}

impl VariantBackend for HttpBackend {
    async fn generate_code(&self, question: &Question) -> AppResult<String> {
        let response: GenerateCodeResponse = self
            .post_json(GENERATE_CODE, &json!({ "question": question }))
            .await?;
        response.into_code()
    }

    async fn execute_code(&self, code: &str, spec: &DifficultySpec) -> AppResult<GenerationBatch> {
        let response: ExecuteCodeResponse = self
            .post_json(EXECUTE_CODE, &json!({ "code": code, "difficulties": spec }))
            .await?;
        response.into_batch()
    }

    async fn solve_original(&self, question: &Question) -> AppResult<OriginalSolution> {
        let response: SolveOriginalResponse = self
            .post_json(SOLVE_ORIGINAL, &json!({ "question": question }))
            .await?;
        Ok(response.solution.unwrap_or_default())
    }

    async fn quick_verify(&self, variant: &VariantCandidate) -> AppResult<bool> {
        let response: QuickVerifyResponse = self
            .post_json(QUICK_VERIFY, &json!({ "variant": variant }))
            .await?;
        Ok(response.is_verified())
    }
}

impl TemplateSource for HttpBackend {
    async fn fetch_default_template(&self) -> AppResult<Option<String>> {
        let Some(url) = &self.default_template_url else {
            return Ok(None);
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(url.as_str(), e))?;

        if !response.status().is_success() {
            warn!("⚠️ 默认模板获取失败 ({}): {}", response.status(), url);
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(url.as_str(), e))?;
        Ok(Some(text))
    }
}

impl StreamingBackend for HttpBackend {
    async fn analyze_question(&self, session_id: &str, question: &Question) -> AppResult<ByteStream> {
        self.post_stream(
            format!("sessions/{}/analyze-question", session_id),
            &json!({ "question": question }),
        )
        .await
    }

    async fn generate_session_variants(
        &self,
        session_id: &str,
        question: &Question,
    ) -> AppResult<ByteStream> {
        self.post_stream(
            format!("sessions/{}/generate-variants", session_id),
            &json!({ "question": question }),
        )
        .await
    }
}

// ========== 响应格式 ==========

#[derive(Debug, Deserialize)]
struct GenerateCodeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GenerateCodeResponse {
    fn into_code(self) -> AppResult<String> {
        match (self.success, self.code) {
            (true, Some(code)) if !code.trim().is_empty() => Ok(code),
            _ => Err(AppError::api_rejected(GENERATE_CODE, self.message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteCodeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    variants: Vec<JsonValue>,
    #[serde(default)]
    message: Option<String>,
}

impl ExecuteCodeResponse {
    /// 逐条解析候选题，解析失败的单题丢弃
    fn into_batch(self) -> AppResult<GenerationBatch> {
        if !self.success {
            return Err(AppError::api_rejected(EXECUTE_CODE, self.message));
        }
        let total = self.total.unwrap_or(self.variants.len());
        let candidates = self
            .variants
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| match serde_json::from_value::<VariantCandidate>(raw) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    debug!("丢弃无法解析的候选题 #{}: {}", i + 1, e);
                    None
                }
            })
            .collect();
        Ok(GenerationBatch { total, candidates })
    }
}

#[derive(Debug, Deserialize)]
struct SolveOriginalResponse {
    #[serde(default)]
    solution: Option<OriginalSolution>,
}

#[derive(Debug, Deserialize)]
struct QuickVerifyResponse {
    #[serde(default)]
    verified: Option<JsonValue>,
}

impl QuickVerifyResponse {
    fn is_verified(&self) -> bool {
        matches!(self.verified, Some(JsonValue::Bool(true)))
    }
}

// ========== 辅助函数 ==========

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// 从错误响应体中取出 `message` / `detail` / `error` 字段
fn extract_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<JsonValue>(body).ok()?;
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|m| m.as_str()))
        .map(str::to_string)
}
