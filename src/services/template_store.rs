//! 试卷模板服务 - 业务能力层
//!
//! 模板优先级：用户保存的模板 > 远程默认模板 > 内置模板。
//! 只缓存远程默认模板，`reset` 会清掉缓存。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clients::TemplateSource;
use crate::error::{AppError, AppResult};

/// 内置模板
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/exam-default.html");

pub const TITLE_PLACEHOLDER: &str = "{{title}}";
pub const QUESTIONS_PLACEHOLDER: &str = "{{questions}}";
pub const ANSWER_SHEET_PLACEHOLDER: &str = "{{answerSheet}}";

const PLACEHOLDER_NAMES: [&str; 3] = ["title", "questions", "answerSheet"];
const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([^{}]*?)\s*\}\}";

/// 保存模板时的提示（不阻止保存）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    Missing(&'static str),
    Unknown(String),
}

impl std::fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateWarning::Missing(name) => write!(f, "缺少占位符 {{{{{}}}}}", name),
            TemplateWarning::Unknown(token) => write!(f, "无法识别的占位符 {}", token),
        }
    }
}

/// 检查模板中的占位符
///
/// 三个占位符必须完全匹配（区分大小写、不含空格），其余 `{{...}}` 报告为未知
pub fn validate_template(template: &str) -> AppResult<Vec<TemplateWarning>> {
    let re = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| AppError::Other(e.to_string()))?;

    let mut warnings: Vec<TemplateWarning> = PLACEHOLDER_NAMES
        .iter()
        .filter(|name| !template.contains(&format!("{{{{{}}}}}", name)))
        .map(|name| TemplateWarning::Missing(*name))
        .collect();

    for caps in re.captures_iter(template) {
        let token = &caps[0];
        let exact = PLACEHOLDER_NAMES
            .iter()
            .any(|name| token == format!("{{{{{}}}}}", name));
        let unknown = TemplateWarning::Unknown(token.to_string());
        if !exact && !warnings.contains(&unknown) {
            warnings.push(unknown);
        }
    }

    Ok(warnings)
}

/// 模板服务
///
/// 职责：
/// - 读取 / 保存 / 删除用户模板文件
/// - 获取并缓存远程默认模板
/// - 解析出当前生效的模板
pub struct TemplateStore<S> {
    source: S,
    override_path: PathBuf,
    cached_default: RwLock<Option<String>>,
}

impl<S: TemplateSource> TemplateStore<S> {
    pub fn new(source: S, override_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            override_path: override_path.into(),
            cached_default: RwLock::new(None),
        }
    }

    pub fn override_path(&self) -> &Path {
        &self.override_path
    }

    /// 用户保存的模板；文件不存在或为空时返回 `None`
    pub async fn saved_template(&self) -> AppResult<Option<String>> {
        match tokio::fs::read_to_string(&self.override_path).await {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::file_read_failed(
                self.override_path.display().to_string(),
                e,
            )),
        }
    }

    /// 默认模板：远程默认 > 内置，忽略用户模板
    ///
    /// 远程获取失败时退回内置模板，失败结果不缓存
    pub async fn default_template(&self) -> String {
        if let Some(cached) = self.cached_default.read().await.as_ref() {
            return cached.clone();
        }

        match self.source.fetch_default_template().await {
            Ok(Some(remote)) if !remote.trim().is_empty() => {
                debug!("已缓存远程默认模板 ({} 字节)", remote.len());
                *self.cached_default.write().await = Some(remote.clone());
                remote
            }
            Ok(_) => DEFAULT_TEMPLATE.to_string(),
            Err(e) => {
                warn!("⚠️ 远程默认模板获取失败，使用内置模板: {}", e);
                DEFAULT_TEMPLATE.to_string()
            }
        }
    }

    /// 当前生效的模板
    pub async fn active_template(&self) -> AppResult<String> {
        match self.saved_template().await? {
            Some(saved) => Ok(saved),
            None => Ok(self.default_template().await),
        }
    }

    /// 保存用户模板
    ///
    /// # 返回
    /// 占位符检查结果；有提示时仍然保存
    pub async fn save(&self, template: &str) -> AppResult<Vec<TemplateWarning>> {
        let warnings = validate_template(template)?;
        for warning in &warnings {
            warn!("⚠️ 模板检查: {}", warning);
        }

        if let Some(parent) = self.override_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
        tokio::fs::write(&self.override_path, template)
            .await
            .map_err(|e| AppError::file_write_failed(self.override_path.display().to_string(), e))?;

        info!("✓ 模板已保存: {}", self.override_path.display());
        Ok(warnings)
    }

    /// 恢复默认：删除用户模板并清空缓存
    pub async fn reset(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.override_path).await {
            Ok(()) => info!("✓ 已删除用户模板: {}", self.override_path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::file_write_failed(
                    self.override_path.display().to_string(),
                    e,
                ))
            }
        }
        *self.cached_default.write().await = None;
        Ok(())
    }
}
