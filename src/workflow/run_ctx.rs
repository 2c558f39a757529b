//! 运行上下文
//!
//! 封装"这一次生成运行"的全部可变状态：状态机、进度、取消标志。
//! 每次运行独占一个实例，不同运行之间不共享任何状态。

use std::fmt::Display;
use std::future::Future;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::{AppError, AppResult};
use crate::infrastructure::CancelToken;
use crate::models::{EventKind, ProgressEvent, Stage};
use crate::services::ProgressReporter;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    GeneratingCode,
    Executing,
    Solving,
    Verifying,
    Rendering,
    Complete,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::GeneratingCode => RunState::GeneratingCode,
            Stage::Executing => RunState::Executing,
            Stage::Solving => RunState::Solving,
            Stage::Verifying => RunState::Verifying,
            Stage::Rendering => RunState::Rendering,
        }
    }
}

/// 一次流程运行
#[derive(Debug)]
pub struct PipelineRun {
    /// 运行ID（仅用于日志显示）
    pub run_id: String,
    /// 原题题号
    pub question_number: String,
    state: RunState,
    cancel: CancelToken,
    reporter: ProgressReporter,
}

impl PipelineRun {
    /// 创建运行，进度只写日志
    pub fn new(question_number: impl Into<String>) -> Self {
        let run_id = new_run_id();
        let question_number = question_number.into();
        let tag = format!("[运行 #{} 题目#{}]", run_id, question_number);
        Self {
            run_id,
            question_number,
            state: RunState::Idle,
            cancel: CancelToken::new(),
            reporter: ProgressReporter::new(tag),
        }
    }

    /// 创建运行，同时返回进度接收端
    pub fn with_channel(
        question_number: impl Into<String>,
    ) -> (Self, UnboundedReceiver<ProgressEvent>) {
        let mut run = Self::new(question_number);
        let (reporter, rx) = ProgressReporter::channel(run.to_string());
        run.reporter = reporter;
        (run, rx)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// 取消标志的句柄，可交给其他任务
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn reporter(&mut self) -> &mut ProgressReporter {
        &mut self.reporter
    }

    /// 同时借出取消标志和上报器
    pub fn parts(&mut self) -> (&CancelToken, &mut ProgressReporter) {
        (&self.cancel, &mut self.reporter)
    }

    /// 进入下一阶段；已取消时返回 `Cancelled`
    pub fn enter(&mut self, stage: Stage, message: impl Into<String>) -> AppResult<()> {
        self.ensure_active(stage)?;
        self.state = stage.into();
        self.reporter.stage_start(stage, message);
        Ok(())
    }

    /// 检查取消标志
    pub fn ensure_active(&self, stage: Stage) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled { stage });
        }
        Ok(())
    }

    /// 执行一个进行中的请求，取消时立即放弃等待
    ///
    /// # 返回
    /// 取消时返回 `AppError::Cancelled`，否则返回请求本身的结果
    pub async fn guard<T, F>(&self, stage: Stage, request: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled { stage }),
            result = request => result,
        }
    }

    pub fn finish_stage(&mut self, stage: Stage, message: impl Into<String>) {
        self.reporter.stage_end(stage, message);
    }

    /// 转发事件流中的事件，终止事件同时更新状态
    pub fn observe(&mut self, event: &ProgressEvent) {
        self.reporter.forward(event);
        match event.kind {
            EventKind::Complete => self.state = RunState::Complete,
            EventKind::Error => self.state = RunState::Failed,
            _ => {}
        }
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.state = RunState::Complete;
        self.reporter.complete(message);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = RunState::Failed;
        self.reporter.fail(message);
    }
}

impl Display for PipelineRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[运行 #{} 题目#{}]", self.run_id, self.question_number)
    }
}

fn new_run_id() -> String {
    chrono::Local::now().format("%H%M%S%3f").to_string()
}
