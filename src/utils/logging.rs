/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::{SavedExam, VerificationReport};

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，详细模式下为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 变形题试卷生成");
    info!("🌐 后端地址: {}", config.api_base_url);
    info!(
        "🔑 API 密钥: {}",
        if config.gemini_api_key.is_some() { "已配置" } else { "未配置" }
    );
    info!("📊 验证并发数: {}", config.verify_concurrency);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 验证统计
/// - `selected`: 选入试卷的题目数
/// - `requested`: 请求的题目数
/// - `saved`: 输出文件
pub fn print_final_stats(
    report: &VerificationReport,
    selected: usize,
    requested: usize,
    saved: &SavedExam,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 生成完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 验证通过: {}", report.verified.len());
    info!(
        "❌ 跳过 / 未通过 / 失败: {} / {} / {}",
        report.skipped, report.rejected, report.failed
    );
    info!("📝 选入试卷: {}/{}", selected, requested);
    info!("{}", "=".repeat(60));
    info!("\n试卷已保存至: {}", saved.html_path.display());
    info!("报告已保存至: {}", saved.json_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_by_characters() {
        assert_eq!(truncate_text("一元二次方程", 4), "一元二次...");
        assert_eq!(truncate_text("x+1=2", 10), "x+1=2");
    }
}
