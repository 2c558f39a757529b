//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建 HTTP 客户端、模板服务、输出服务
//! 2. **加载原题**：从 JSON / TOML 文件读取题目
//! 3. **创建运行**：每次操作一个独立的 `PipelineRun`
//! 4. **取消**：Ctrl-C 触发取消标志
//! 5. **落盘与统计**：渲染完成后写文件并输出统计
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 `HttpBackend` 的模块
//! - **向下委托**：流程细节交给 workflow

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clients::{HttpBackend, StreamingBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::CancelToken;
use crate::models::{load_question, ExamSettings, Question};
use crate::services::{OutputWriter, SavedExam, TemplateStore, TemplateWarning};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::{consume_stream, PipelineRun, StreamOutcome, VariantFlow};

/// 应用主结构
pub struct App {
    config: Config,
    backend: HttpBackend,
    templates: TemplateStore<HttpBackend>,
    writer: OutputWriter,
    json_progress: bool,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let backend = HttpBackend::new(&config)?;
        let templates = TemplateStore::new(backend.clone(), &config.template_override_path);
        let writer = OutputWriter::new(&config.output_dir);

        Ok(Self {
            config,
            backend,
            templates,
            writer,
            json_progress: false,
        })
    }

    /// 把进度事件以 JSON 行输出到标准输出
    pub fn with_json_progress(mut self, enabled: bool) -> Self {
        self.json_progress = enabled;
        self
    }

    /// 生成试卷
    ///
    /// # 参数
    /// - `question_path`: 原题文件
    /// - `index`: 文件中第几道题（从 0 开始）
    /// - `settings`: 试卷设置
    pub async fn run_exam(
        &self,
        question_path: &Path,
        index: usize,
        settings: &ExamSettings,
    ) -> AppResult<SavedExam> {
        let question = self.load(question_path, index).await?;
        let (mut run, printer) = self.new_run(&question);
        let watcher = watch_ctrl_c(run.cancel_token());

        let flow = VariantFlow::new(&self.backend, &self.templates, &self.config);
        let result = flow
            .run(&question, settings, &mut run, StdRng::from_entropy())
            .await;

        watcher.abort();
        drop(run);
        if let Some(printer) = printer {
            let _ = printer.await;
        }

        let output = result?;
        let saved = self
            .writer
            .write(&settings.title, &output.html, &output.result)
            .await?;

        print_final_stats(
            &output.report,
            output.selected.len(),
            settings.question_count,
            &saved,
        );
        Ok(saved)
    }

    /// 单题深度分析（服务端事件流）
    pub async fn run_analysis(
        &self,
        session_id: &str,
        question_path: &Path,
        index: usize,
    ) -> AppResult<StreamOutcome> {
        let question = self.load(question_path, index).await?;
        info!("🔍 开始分析题目 {} (会话 {})", question.number, session_id);
        let stream = self.backend.analyze_question(session_id, &question).await?;
        self.consume(&question, stream).await
    }

    /// 会话内生成变形题（服务端事件流）
    pub async fn run_session_variants(
        &self,
        session_id: &str,
        question_path: &Path,
        index: usize,
    ) -> AppResult<StreamOutcome> {
        let question = self.load(question_path, index).await?;
        info!("🧪 开始生成变形题 {} (会话 {})", question.number, session_id);
        let stream = self
            .backend
            .generate_session_variants(session_id, &question)
            .await?;
        self.consume(&question, stream).await
    }

    /// 当前生效的模板
    pub async fn show_template(&self) -> AppResult<String> {
        self.templates.active_template().await
    }

    /// 默认模板（忽略用户模板）
    pub async fn default_template(&self) -> String {
        self.templates.default_template().await
    }

    /// 从文件读取并保存用户模板
    pub async fn save_template(&self, path: &Path) -> AppResult<Vec<TemplateWarning>> {
        let template = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        self.templates.save(&template).await
    }

    /// 删除用户模板
    pub async fn reset_template(&self) -> AppResult<()> {
        self.templates.reset().await
    }

    async fn load(&self, path: &Path, index: usize) -> AppResult<Question> {
        info!("📁 正在读取题目: {} (第 {} 题)", path.display(), index + 1);
        load_question(path, index).await
    }

    async fn consume(
        &self,
        question: &Question,
        stream: crate::clients::ByteStream,
    ) -> AppResult<StreamOutcome> {
        let (mut run, printer) = self.new_run(question);
        let watcher = watch_ctrl_c(run.cancel_token());

        let outcome = consume_stream(stream, &mut run).await;

        watcher.abort();
        drop(run);
        if let Some(printer) = printer {
            let _ = printer.await;
        }
        outcome
    }

    fn new_run(&self, question: &Question) -> (PipelineRun, Option<JoinHandle<()>>) {
        if !self.json_progress {
            return (PipelineRun::new(question.number.clone()), None);
        }

        let (run, mut rx) = PipelineRun::with_channel(question.number.clone());
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("⚠️ 进度事件序列化失败: {}", e),
                }
            }
        });
        (run, Some(printer))
    }
}

/// Ctrl-C 时设置取消标志
fn watch_ctrl_c(token: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️ 收到 Ctrl-C，当前阶段结束后停止");
            token.cancel();
        }
    })
}
