//! 输出写入服务 - 业务能力层
//!
//! 只负责"把渲染结果落盘"能力，不关心流程

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 一次输出的文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedExam {
    pub html_path: PathBuf,
    pub json_path: PathBuf,
}

/// 输出写入服务
///
/// 职责：
/// - 生成 `<标题>_<时间戳>` 形式的文件名
/// - 写入 HTML 试卷和 JSON 报告
/// - 只在渲染完成后调用，不会写出半成品
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 写入试卷和报告
    ///
    /// # 参数
    /// - `title`: 试卷标题，用于文件名
    /// - `html`: 渲染好的试卷
    /// - `report`: 任意可序列化的报告
    pub async fn write<T: Serialize>(&self, title: &str, html: &str, report: &T) -> AppResult<SavedExam> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        let stem = format!(
            "{}_{}",
            slugify(title),
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let html_path = self.output_dir.join(format!("{}.html", stem));
        let json_path = self.output_dir.join(format!("{}.json", stem));

        let json = serde_json::to_string_pretty(report)?;

        write_file(&html_path, html).await?;
        write_file(&json_path, &json).await?;

        debug!("写入输出: {} / {}", html_path.display(), json_path.display());
        Ok(SavedExam { html_path, json_path })
    }
}

async fn write_file(path: &Path, contents: &str) -> AppResult<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 标题转文件名：保留字母数字（含中日韩文字），其余字符替换为 `_`
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "exam".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_keeps_cjk_and_replaces_punctuation() {
        assert_eq!(slugify("数学模拟考试"), "数学模拟考试");
        assert_eq!(slugify(" 2학기 / 중간고사 "), "2학기___중간고사");
        assert_eq!(slugify("///"), "exam");
    }

    #[tokio::test]
    async fn writes_html_and_json_side_by_side() {
        let dir = std::env::temp_dir().join(format!("variant_exam_out_{}", std::process::id()));
        let writer = OutputWriter::new(&dir);

        let saved = writer
            .write("测试 试卷", "<html></html>", &json!({"variants": []}))
            .await
            .unwrap();

        assert_eq!(saved.html_path.extension().unwrap(), "html");
        assert_eq!(saved.json_path.extension().unwrap(), "json");
        assert_eq!(saved.html_path.file_stem(), saved.json_path.file_stem());
        assert_eq!(tokio::fs::read_to_string(&saved.html_path).await.unwrap(), "<html></html>");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
