use serde::{Deserialize, Serialize};

use super::variant::Difficulty;
use crate::error::{AppResult, ConfigError};

/// 试卷难度要求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamDifficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl ExamDifficulty {
    /// 指定难度；`Mixed` 没有目标难度
    pub fn target(self) -> Option<Difficulty> {
        match self {
            ExamDifficulty::Easy => Some(Difficulty::Easy),
            ExamDifficulty::Medium => Some(Difficulty::Medium),
            ExamDifficulty::Hard => Some(Difficulty::Hard),
            ExamDifficulty::Mixed => None,
        }
    }
}

impl std::str::FromStr for ExamDifficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("mixed") || s.trim() == "混合" {
            return Ok(ExamDifficulty::Mixed);
        }
        match Difficulty::from_label(s) {
            Some(Difficulty::Easy) => Ok(ExamDifficulty::Easy),
            Some(Difficulty::Medium) => Ok(ExamDifficulty::Medium),
            Some(Difficulty::Hard) => Ok(ExamDifficulty::Hard),
            None => Err(ConfigError::UnknownDifficulty {
                value: s.to_string(),
            }),
        }
    }
}

/// 试卷设置，由调用方提供，流程只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSettings {
    pub question_count: usize,
    pub difficulty: ExamDifficulty,
    pub title: String,
    pub include_answer_sheet: bool,
}

impl ExamSettings {
    pub const MIN_QUESTIONS: usize = 1;
    pub const MAX_QUESTIONS: usize = 20;

    /// 检查题目数量是否在 [1, 20] 内
    pub fn validate(&self) -> AppResult<()> {
        if !(Self::MIN_QUESTIONS..=Self::MAX_QUESTIONS).contains(&self.question_count) {
            return Err(ConfigError::QuestionCountOutOfRange {
                value: self.question_count,
                min: Self::MIN_QUESTIONS,
                max: Self::MAX_QUESTIONS,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            question_count: 5,
            difficulty: ExamDifficulty::Mixed,
            title: "数学模拟考试".to_string(),
            include_answer_sheet: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_question_count_range() {
        let mut settings = ExamSettings::default();
        assert!(settings.validate().is_ok());

        settings.question_count = 0;
        assert!(settings.validate().is_err());

        settings.question_count = 21;
        assert!(settings.validate().is_err());

        settings.question_count = 20;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parses_difficulty_names() {
        assert_eq!("mixed".parse::<ExamDifficulty>().unwrap(), ExamDifficulty::Mixed);
        assert_eq!("Hard".parse::<ExamDifficulty>().unwrap(), ExamDifficulty::Hard);
        assert_eq!("쉬움".parse::<ExamDifficulty>().unwrap(), ExamDifficulty::Easy);
        assert!("nightmare".parse::<ExamDifficulty>().is_err());
        assert_eq!(ExamDifficulty::Mixed.target(), None);
    }
}
