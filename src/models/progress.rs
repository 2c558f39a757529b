use serde::Serialize;

/// 流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GeneratingCode,
    Executing,
    Solving,
    Verifying,
    Rendering,
}

impl Stage {
    /// 该阶段可以上报的进度区间
    pub fn band(self) -> (u8, u8) {
        match self {
            Stage::GeneratingCode => (10, 25),
            Stage::Executing => (25, 50),
            Stage::Solving => (50, 65),
            Stage::Verifying => (65, 90),
            Stage::Rendering => (90, 100),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::GeneratingCode => "generating_code",
            Stage::Executing => "executing",
            Stage::Solving => "solving",
            Stage::Verifying => "verifying",
            Stage::Rendering => "rendering",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    AutoFixStart,
    AutoFixDone,
    AutoFixFailed,
    Complete,
    Error,
}

impl EventKind {
    /// 由服务端的 `step` 字段推断
    pub fn from_step(step: &str) -> Self {
        match step {
            "complete" => EventKind::Complete,
            "error" => EventKind::Error,
            "auto_fix" => EventKind::AutoFixStart,
            "auto_fixed" => EventKind::AutoFixDone,
            "auto_fix_failed" => EventKind::AutoFixFailed,
            _ => EventKind::Progress,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Error)
    }
}

/// 进度事件：事件流的一行，或流程内部的一次进度上报
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
    pub kind: EventKind,
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
}

impl ProgressEvent {
    pub fn new(kind: EventKind, percent: u8, message: impl Into<String>) -> Self {
        let step = match kind {
            EventKind::Progress => "progress",
            EventKind::AutoFixStart => "auto_fix",
            EventKind::AutoFixDone => "auto_fixed",
            EventKind::AutoFixFailed => "auto_fix_failed",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        };
        Self {
            percent: percent.min(100),
            message: message.into(),
            kind,
            step: step.to_string(),
            html_url: None,
            json_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_ordered_and_disjoint() {
        let stages = [
            Stage::GeneratingCode,
            Stage::Executing,
            Stage::Solving,
            Stage::Verifying,
            Stage::Rendering,
        ];
        for pair in stages.windows(2) {
            let (_, end) = pair[0].band();
            let (start, _) = pair[1].band();
            assert!(end <= start, "{} overlaps {}", pair[0], pair[1]);
        }
        assert_eq!(Stage::Rendering.band().1, 100);
    }

    #[test]
    fn step_names_map_to_kinds() {
        assert_eq!(EventKind::from_step("auto_fix"), EventKind::AutoFixStart);
        assert_eq!(EventKind::from_step("auto_fixed"), EventKind::AutoFixDone);
        assert_eq!(EventKind::from_step("auto_fix_failed"), EventKind::AutoFixFailed);
        assert_eq!(EventKind::from_step("verify"), EventKind::Progress);
        assert!(EventKind::from_step("complete").is_terminal());
        assert!(!EventKind::from_step("auto_retry").is_terminal());
    }
}
