use thiserror::Error;

use crate::models::Stage;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 流程中止（代码生成 / 代码执行失败）
    ///
    /// 显示内容即服务端返回的原始消息，不加前缀
    #[error("{message}")]
    Aborted { stage: Stage, message: String },
    /// 运行被取消
    #[error("运行已取消 (阶段: {stage})")]
    Cancelled { stage: Stage },
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 非 2xx 响应
    #[error("API返回错误状态 ({endpoint}): status={status}, message={message:?}")]
    BadStatus {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// 2xx 但 success=false 或缺少必要字段
    #[error("API拒绝请求 ({endpoint}): message={message:?}")]
    Rejected {
        endpoint: String,
        message: Option<String>,
    },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: serde_json::Error,
    },
    /// 读取事件流失败
    #[error("事件流读取失败 ({endpoint}): {source}")]
    StreamFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// 服务端提供的错误消息（如有）
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::BadStatus { message, .. } | ApiError::Rejected { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("文件中没有题目: {path}")]
    NoQuestions { path: String },
    #[error("题目索引 {index} 超出范围 (共 {total} 道题)")]
    QuestionIndexOutOfRange { index: usize, total: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 题目数量超出允许范围
    #[error("题目数量 {value} 超出范围 [{min}, {max}]")]
    QuestionCountOutOfRange { value: usize, min: usize, max: usize },
    /// 无法识别的难度
    #[error("无法识别的难度: {value}")]
    UnknownDifficulty { value: String },
    /// HTTP 客户端构建失败
    #[error("HTTP客户端初始化失败: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed { source: err })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建API拒绝错误
    pub fn api_rejected(endpoint: impl Into<String>, message: Option<String>) -> Self {
        AppError::Api(ApiError::Rejected {
            endpoint: endpoint.into(),
            message,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 将阶段失败包装为中止错误
    ///
    /// 优先使用服务端消息；没有时使用 `fallback` 拼接底层错误
    pub fn abort(stage: Stage, fallback: &str, err: AppError) -> Self {
        if err.is_cancelled() {
            return err;
        }
        let message = match &err {
            AppError::Api(api) => match api.server_message() {
                Some(msg) => msg.to_string(),
                None => match api {
                    ApiError::Rejected { .. } => fallback.to_string(),
                    other => format!("{}: {}", fallback, other),
                },
            },
            AppError::Aborted { message, .. } => message.clone(),
            other => format!("{}: {}", fallback, other),
        };
        AppError::Aborted { stage, message }
    }

    /// 是否为取消
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_keeps_server_message_verbatim() {
        let err = AppError::api_rejected("variants/generate-code", Some("Gemini quota exceeded".into()));
        let aborted = AppError::abort(Stage::GeneratingCode, "代码生成失败", err);
        assert_eq!(aborted.to_string(), "Gemini quota exceeded");
    }

    #[test]
    fn abort_falls_back_when_server_is_silent() {
        let err = AppError::api_rejected("variants/execute-code", None);
        let aborted = AppError::abort(Stage::Executing, "代码执行失败", err);
        match aborted {
            AppError::Aborted { stage, message } => {
                assert_eq!(stage, Stage::Executing);
                assert_eq!(message, "代码执行失败");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn abort_passes_cancellation_through() {
        let err = AppError::Cancelled { stage: Stage::Solving };
        assert!(AppError::abort(Stage::Solving, "x", err).is_cancelled());
    }
}
