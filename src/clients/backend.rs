//! 后端能力接口
//!
//! 流程层只依赖这些 trait，测试时可以替换为内存实现

use futures::stream::BoxStream;

use crate::error::AppResult;
use crate::models::{DifficultySpec, GenerationBatch, OriginalSolution, Question, VariantCandidate};

/// 服务端推送的原始字节流
pub type ByteStream = BoxStream<'static, AppResult<Vec<u8>>>;

/// 变形题生成相关的后端操作
#[allow(async_fn_in_trait)]
pub trait VariantBackend {
    /// 由原题生成变形题代码
    async fn generate_code(&self, question: &Question) -> AppResult<String>;

    /// 执行代码，按难度分布生成候选题
    async fn execute_code(&self, code: &str, spec: &DifficultySpec) -> AppResult<GenerationBatch>;

    /// 求解原题
    async fn solve_original(&self, question: &Question) -> AppResult<OriginalSolution>;

    /// 快速验证单道候选题，只有明确返回 `true` 才算通过
    async fn quick_verify(&self, variant: &VariantCandidate) -> AppResult<bool>;
}

/// 远程默认模板
#[allow(async_fn_in_trait)]
pub trait TemplateSource {
    /// 没有配置或服务端没有提供时返回 `Ok(None)`
    async fn fetch_default_template(&self) -> AppResult<Option<String>>;
}

/// 以事件流返回进度的后端操作
#[allow(async_fn_in_trait)]
pub trait StreamingBackend {
    /// 单题深度分析
    async fn analyze_question(&self, session_id: &str, question: &Question) -> AppResult<ByteStream>;

    /// 在会话内生成变形题并保存报告
    async fn generate_session_variants(
        &self,
        session_id: &str,
        question: &Question,
    ) -> AppResult<ByteStream>;
}
