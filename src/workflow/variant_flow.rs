//! 变形题生成流程 - 流程层
//!
//! 核心职责：定义"一道原题 → 一份试卷"的完整处理流程
//!
//! 流程顺序：
//! 1. 生成代码（失败即中止）
//! 2. 执行代码得到候选题（失败即中止）
//! 3. 求解原题（失败则参考信息留空，继续）
//! 4. 逐题验证候选题
//! 5. 选题并渲染试卷

use rand::Rng;
use tracing::{debug, info, warn};

use crate::clients::{TemplateSource, VariantBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    DifficultySpec, ExamSettings, OriginalReference, OriginalSolution, Question, Stage,
    VariantCandidate, VariantsResult,
};
use crate::services::{
    DocumentRenderer, ItemVerifier, SelectionFilter, TemplateStore, VerificationReport,
};
use crate::utils::logging::truncate_text;
use crate::workflow::run_ctx::PipelineRun;

pub const GENERATION_METHOD: &str = "stepwise_api";

const CODE_FAILED: &str = "代码生成失败";
const EXEC_FAILED: &str = "代码执行失败";

/// 一次成功运行的产物
#[derive(Debug, Clone)]
pub struct ExamOutput {
    /// 渲染好的试卷
    pub html: String,
    /// 变形题报告（原题参考 + 全部已验证变形题）
    pub result: VariantsResult,
    /// 最终选入试卷的题目
    pub selected: Vec<VariantCandidate>,
    /// 验证统计
    pub report: VerificationReport,
}

/// 变形题生成流程
///
/// - 编排完整的生成流程，决定哪一步失败中止、哪一步失败降级
/// - 运行状态全部放在 `PipelineRun` 中，流程本身可被多次复用
/// - 只依赖业务能力（services）和后端接口（clients）
pub struct VariantFlow<'a, B, S> {
    backend: &'a B,
    templates: &'a TemplateStore<S>,
    spec: DifficultySpec,
    verify_concurrency: usize,
    max_variants: usize,
}

impl<'a, B, S> VariantFlow<'a, B, S>
where
    B: VariantBackend,
    S: TemplateSource,
{
    /// 创建新的生成流程
    pub fn new(backend: &'a B, templates: &'a TemplateStore<S>, config: &Config) -> Self {
        Self {
            backend,
            templates,
            spec: DifficultySpec::default(),
            verify_concurrency: config.verify_concurrency,
            max_variants: config.max_variants,
        }
    }

    /// 替换难度分布
    pub fn with_spec(mut self, spec: DifficultySpec) -> Self {
        self.spec = spec;
        self
    }

    /// 执行完整流程
    ///
    /// 成功时发出 `complete` 事件，失败时发出一个 `error` 事件并返回错误
    ///
    /// # 参数
    /// - `question`: 原题
    /// - `settings`: 试卷设置
    /// - `run`: 本次运行的上下文
    /// - `rng`: 选题用的随机源
    pub async fn run<R: Rng>(
        &self,
        question: &Question,
        settings: &ExamSettings,
        run: &mut PipelineRun,
        rng: R,
    ) -> AppResult<ExamOutput> {
        info!("{} 📝 原题: {}", run, truncate_text(&question.text, 60));

        match self.run_stages(question, settings, run, rng).await {
            Ok(output) => {
                run.complete(format!("试卷生成完成，共 {} 道题", output.selected.len()));
                Ok(output)
            }
            Err(e) => {
                run.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_stages<R: Rng>(
        &self,
        question: &Question,
        settings: &ExamSettings,
        run: &mut PipelineRun,
        rng: R,
    ) -> AppResult<ExamOutput> {
        settings.validate()?;

        // ========== 1. 生成代码 ==========
        run.enter(Stage::GeneratingCode, "正在生成变形题代码...")?;
        let code = run
            .guard(Stage::GeneratingCode, self.backend.generate_code(question))
            .await
            .map_err(|e| AppError::abort(Stage::GeneratingCode, CODE_FAILED, e))?;
        run.finish_stage(Stage::GeneratingCode, "✓ 代码生成完成");

        // ========== 2. 执行代码 ==========
        run.enter(
            Stage::Executing,
            format!("正在执行代码，生成 {} 道候选题...", self.spec.total()),
        )?;
        let batch = run
            .guard(Stage::Executing, self.backend.execute_code(&code, &self.spec))
            .await
            .map_err(|e| AppError::abort(Stage::Executing, EXEC_FAILED, e))?;
        run.finish_stage(
            Stage::Executing,
            format!("✓ 生成 {} 道候选题 (预期 {})", batch.candidates.len(), batch.total),
        );

        // ========== 3. 求解原题 ==========
        run.enter(Stage::Solving, "正在求解原题...")?;
        let solution = match run
            .guard(Stage::Solving, self.backend.solve_original(question))
            .await
        {
            Ok(solution) => solution,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("{} ⚠️ 原题求解失败，参考信息留空: {}", run, e);
                OriginalSolution::default()
            }
        };
        run.finish_stage(Stage::Solving, "✓ 原题求解完成");

        // ========== 4. 验证 ==========
        run.enter(
            Stage::Verifying,
            format!("开始验证 {} 道候选题", batch.candidates.len()),
        )?;
        let report = {
            let (cancel, reporter) = run.parts();
            ItemVerifier::new(self.backend, self.verify_concurrency)
                .verify(batch.candidates, reporter, cancel)
                .await?
        };

        let mut variants = report.verified.clone();
        if variants.len() > self.max_variants {
            debug!(
                "{} 已验证 {} 道，只保留前 {} 道",
                run,
                variants.len(),
                self.max_variants
            );
            variants.truncate(self.max_variants);
        }
        if variants.is_empty() {
            warn!("{} ⚠️ 没有候选题通过验证", run);
        }
        run.finish_stage(
            Stage::Verifying,
            format!("✓ 验证通过 {} 道", report.verified.len()),
        );

        let result = VariantsResult {
            original: OriginalReference::new(question, &solution),
            variants: variants.clone(),
            generation_method: GENERATION_METHOD.to_string(),
            generated_code: code,
        };

        // ========== 5. 选题 + 渲染 ==========
        run.enter(Stage::Rendering, "正在选题并渲染试卷...")?;
        let selected = SelectionFilter::new(rng).select(variants, settings);
        if selected.len() < settings.question_count {
            info!(
                "{} 可用题目不足: {}/{}",
                run,
                selected.len(),
                settings.question_count
            );
        }
        let renderer = DocumentRenderer::new(self.templates);
        let html = run
            .guard(Stage::Rendering, renderer.render(&selected, settings))
            .await?;

        Ok(ExamOutput {
            html,
            result,
            selected,
            report,
        })
    }
}
