use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use variant_exam::models::{ExamDifficulty, ExamSettings};
use variant_exam::utils::logging;
use variant_exam::{App, Config, StreamOutcome};

/// 变形题试卷生成工具
#[derive(Parser, Debug)]
#[command(name = "variant_exam", version)]
struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 以 JSON 行输出进度事件
    #[arg(long, global = true)]
    json_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 由原题生成变形题试卷
    Exam {
        /// 原题文件（.json / .toml）
        question: PathBuf,
        /// 文件中第几道题（从 0 开始）
        #[arg(long, default_value_t = 0)]
        index: usize,
        /// 题目数量 (1-20)
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        /// 难度：easy / medium / hard / mixed
        #[arg(short, long, default_value = "mixed")]
        difficulty: ExamDifficulty,
        /// 试卷标题
        #[arg(short, long)]
        title: Option<String>,
        /// 不附答案表
        #[arg(long)]
        no_answer_sheet: bool,
    },
    /// 单题深度分析（事件流）
    Analyze {
        session_id: String,
        question: PathBuf,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// 会话内生成变形题（事件流）
    SessionVariants {
        session_id: String,
        question: PathBuf,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// 试卷模板管理
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    /// 显示当前生效的模板
    Show,
    /// 显示默认模板
    Default,
    /// 保存用户模板
    Save { file: PathBuf },
    /// 恢复默认模板
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env();
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::initialize(config)
        .context("应用初始化失败")?
        .with_json_progress(cli.json_progress);

    match cli.command {
        Command::Exam {
            question,
            index,
            count,
            difficulty,
            title,
            no_answer_sheet,
        } => {
            let defaults = ExamSettings::default();
            let settings = ExamSettings {
                question_count: count,
                difficulty,
                title: title.unwrap_or(defaults.title),
                include_answer_sheet: !no_answer_sheet,
            };
            let saved = app.run_exam(&question, index, &settings).await?;
            info!("✅ 试卷: {}", saved.html_path.display());
        }
        Command::Analyze {
            session_id,
            question,
            index,
        } => {
            let outcome = app.run_analysis(&session_id, &question, index).await?;
            report_stream_outcome(outcome)?;
        }
        Command::SessionVariants {
            session_id,
            question,
            index,
        } => {
            let outcome = app
                .run_session_variants(&session_id, &question, index)
                .await?;
            report_stream_outcome(outcome)?;
        }
        Command::Template { action } => match action {
            TemplateAction::Show => println!("{}", app.show_template().await?),
            TemplateAction::Default => println!("{}", app.default_template().await),
            TemplateAction::Save { file } => {
                let warnings = app
                    .save_template(&file)
                    .await
                    .with_context(|| format!("保存模板失败: {}", file.display()))?;
                if warnings.is_empty() {
                    info!("✓ 模板检查通过");
                }
            }
            TemplateAction::Reset => {
                app.reset_template().await?;
                info!("✓ 已恢复默认模板");
            }
        },
    }

    Ok(())
}

fn report_stream_outcome(outcome: StreamOutcome) -> Result<()> {
    match outcome {
        StreamOutcome::Completed {
            message,
            html_url,
            json_url,
        } => {
            info!("✅ {}", message);
            if let Some(url) = html_url {
                info!("HTML: {}", url);
            }
            if let Some(url) = json_url {
                info!("JSON: {}", url);
            }
            Ok(())
        }
        StreamOutcome::Failed { message } => bail!("{}", message),
        StreamOutcome::Incomplete {
            last_percent,
            last_message,
        } => {
            warn!("⚠️ 状态未知，最后进度 {}%: {}", last_percent, last_message);
            bail!("事件流未完成")
        }
        StreamOutcome::Cancelled { last_percent } => bail!("已取消 ({}%)", last_percent),
    }
}
