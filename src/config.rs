/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 后端服务地址
    pub api_base_url: String,
    /// Gemini API 密钥（可选，作为 X-Gemini-API-Key 请求头发送）
    pub gemini_api_key: Option<String>,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    /// 用户自定义模板路径
    pub template_override_path: String,
    /// 远程默认模板地址（可选）
    pub default_template_url: Option<String>,
    /// 输出目录
    pub output_dir: String,
    /// 同时进行的验证请求数
    pub verify_concurrency: usize,
    /// 进入选题的最大已验证变形题数
    pub max_variants: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4001".to_string(),
            gemini_api_key: None,
            request_timeout_secs: 300,
            template_override_path: "exam-template.html".to_string(),
            default_template_url: None,
            output_dir: "exam_output".to_string(),
            verify_concurrency: 1,
            max_variants: 10,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            gemini_api_key: non_empty_var("GEMINI_API_KEY").or(default.gemini_api_key),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            template_override_path: std::env::var("EXAM_TEMPLATE_PATH").unwrap_or(default.template_override_path),
            default_template_url: non_empty_var("DEFAULT_TEMPLATE_URL").or(default.default_template_url),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            verify_concurrency: std::env::var("VERIFY_CONCURRENCY").ok().and_then(|v| v.parse().ok()).filter(|n: &usize| *n > 0).unwrap_or(default.verify_concurrency),
            max_variants: std::env::var("MAX_VARIANTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_variants),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_client() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:4001");
        assert_eq!(config.verify_concurrency, 1);
        assert_eq!(config.max_variants, 10);
        assert!(config.gemini_api_key.is_none());
    }
}
