//! # Variant Exam
//!
//! 由一道原题生成经过验证的变形题，并渲染成可打印的 HTML 试卷
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `clients/` - 后端接口（trait）与 HTTP 实现，只暴露能力
//! - `infrastructure/` - 事件流解码、取消标志
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心调用顺序
//! - `ItemVerifier` - 逐题验证能力
//! - `SelectionFilter` - 按难度选题能力
//! - `DocumentRenderer` / `TemplateStore` - 模板与渲染能力
//! - `ProgressReporter` - 单调进度上报能力
//! - `OutputWriter` - 落盘能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次运行"的完整流程
//! - `PipelineRun` - 运行上下文（状态机 + 进度 + 取消）
//! - `VariantFlow` - 生成代码 → 执行 → 求解 → 验证 → 选题渲染
//! - `consume_stream` - 服务端事件流 → 结果
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/exam_app` - 应用入口，持有资源，调度各命令
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CancelToken, EventStreamDecoder};
pub use models::{ExamDifficulty, ExamSettings, ProgressEvent, Question, VariantCandidate};
pub use orchestrator::App;
pub use workflow::{ExamOutput, PipelineRun, StreamOutcome, VariantFlow};
