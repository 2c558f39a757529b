//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源持有和操作调度，是整个系统的"指挥中心"。
//!
//! ### `exam_app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 持有 HTTP 客户端、模板服务、输出服务
//! - 为每次操作创建独立的 `PipelineRun`
//! - 处理 Ctrl-C 取消
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! exam_app (一次命令)
//!     ↓
//! workflow::VariantFlow / consume_stream (一次运行)
//!     ↓
//! services (能力层：verify / select / render / template / output)
//!     ↓
//! clients + infrastructure (HTTP、事件流解码、取消标志)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 HTTP 客户端
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod exam_app;

pub use exam_app::App;
