//! 进度服务 - 业务能力层
//!
//! 把"当前阶段 + 已处理条目数"折算成对外可见的单一百分比和说明文字。
//! 同一次运行内百分比只增不减：较低的上报值会被钳制到已有最大值。

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::models::{EventKind, ProgressEvent, Stage};

/// 对外可见的进度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub message: String,
}

/// 进度聚合器
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    max: u8,
    message: String,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 上报一个原始百分比；低于当前最大值时保持最大值
    pub fn report(&mut self, raw: u8, message: impl Into<String>) -> ProgressSnapshot {
        self.max = self.max.max(raw.min(100));
        self.message = message.into();
        self.snapshot()
    }

    /// 进入阶段：区间起点
    pub fn stage_start(&mut self, stage: Stage, message: impl Into<String>) -> ProgressSnapshot {
        self.report(stage.band().0, message)
    }

    /// 阶段结束：区间终点
    pub fn stage_end(&mut self, stage: Stage, message: impl Into<String>) -> ProgressSnapshot {
        self.report(stage.band().1, message)
    }

    /// 阶段内按条目线性插值
    pub fn items(
        &mut self,
        stage: Stage,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) -> ProgressSnapshot {
        self.report(interpolate(stage, done, total), message)
    }

    pub fn complete(&mut self, message: impl Into<String>) -> ProgressSnapshot {
        self.report(100, message)
    }

    pub fn percent(&self) -> u8 {
        self.max
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.max,
            message: self.message.clone(),
        }
    }
}

/// 阶段区间内的线性插值；`total == 0` 视为已完成
pub fn interpolate(stage: Stage, done: usize, total: usize) -> u8 {
    let (start, end) = stage.band();
    if total == 0 {
        return end;
    }
    let done = done.min(total);
    let span = usize::from(end - start);
    start + (done * span / total) as u8
}

/// 进度上报器
///
/// 每次运行独占一个实例：持有聚合器，把进度写日志并通过通道发给界面。
/// 接收端关闭不影响流程继续执行。每次运行最多发出一个终止事件。
#[derive(Debug)]
pub struct ProgressReporter {
    tag: String,
    aggregator: ProgressAggregator,
    sender: Option<UnboundedSender<ProgressEvent>>,
    terminated: bool,
}

impl ProgressReporter {
    /// 只写日志，不发送
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            aggregator: ProgressAggregator::new(),
            sender: None,
            terminated: false,
        }
    }

    pub fn with_sender(tag: impl Into<String>, sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
            ..Self::new(tag)
        }
    }

    /// 创建上报器及其接收端
    pub fn channel(tag: impl Into<String>) -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sender(tag, tx), rx)
    }

    pub fn stage_start(&mut self, stage: Stage, message: impl Into<String>) {
        let snapshot = self.aggregator.stage_start(stage, message);
        self.emit(EventKind::Progress, snapshot);
    }

    pub fn stage_end(&mut self, stage: Stage, message: impl Into<String>) {
        let snapshot = self.aggregator.stage_end(stage, message);
        self.emit(EventKind::Progress, snapshot);
    }

    pub fn items(&mut self, stage: Stage, done: usize, total: usize, message: impl Into<String>) {
        let snapshot = self.aggregator.items(stage, done, total, message);
        self.emit(EventKind::Progress, snapshot);
    }

    /// 转发事件流中的一条事件（百分比同样钳制）
    pub fn forward(&mut self, event: &ProgressEvent) {
        let snapshot = self.aggregator.report(event.percent, event.message.clone());
        self.emit_with(event.kind, snapshot, event.html_url.clone(), event.json_url.clone());
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        let snapshot = self.aggregator.complete(message);
        self.emit(EventKind::Complete, snapshot);
    }

    /// 失败：保留最后的百分比，附带错误消息
    pub fn fail(&mut self, message: impl Into<String>) {
        let snapshot = ProgressSnapshot {
            percent: self.aggregator.percent(),
            message: message.into(),
        };
        self.emit(EventKind::Error, snapshot);
    }

    pub fn percent(&self) -> u8 {
        self.aggregator.percent()
    }

    pub fn last_message(&self) -> &str {
        self.aggregator.message()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn emit(&mut self, kind: EventKind, snapshot: ProgressSnapshot) {
        self.emit_with(kind, snapshot, None, None);
    }

    fn emit_with(
        &mut self,
        kind: EventKind,
        snapshot: ProgressSnapshot,
        html_url: Option<String>,
        json_url: Option<String>,
    ) {
        if self.terminated {
            debug!("{} 已结束，忽略进度: {}", self.tag, snapshot.message);
            return;
        }
        if kind.is_terminal() {
            self.terminated = true;
        }

        match kind {
            EventKind::Error | EventKind::AutoFixFailed => {
                warn!("{} ⚠️ [{}%] {}", self.tag, snapshot.percent, snapshot.message)
            }
            EventKind::AutoFixStart | EventKind::AutoFixDone => {
                info!("{} 🔧 [{}%] {}", self.tag, snapshot.percent, snapshot.message)
            }
            _ => info!("{} [{}%] {}", self.tag, snapshot.percent, snapshot.message),
        }

        let Some(sender) = &self.sender else {
            return;
        };
        let mut event = ProgressEvent::new(kind, snapshot.percent, snapshot.message);
        event.html_url = html_url;
        event.json_url = json_url;
        if sender.send(event).is_err() {
            debug!("{} 进度接收端已关闭", self.tag);
        }
    }
}
