use phf::phf_map;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use super::question::{Choice, Question};

/// 变形题难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// 难度别名表：英文名、服务端标签（韩文）、中文名
static DIFFICULTY_ALIASES: phf::Map<&'static str, Difficulty> = phf_map! {
    "easy" => Difficulty::Easy,
    "medium" => Difficulty::Medium,
    "hard" => Difficulty::Hard,
    "쉬움" => Difficulty::Easy,
    "보통" => Difficulty::Medium,
    "어려움" => Difficulty::Hard,
    "简单" => Difficulty::Easy,
    "中等" => Difficulty::Medium,
    "困难" => Difficulty::Hard,
};

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// 服务端使用的难度标签
    pub fn server_label(self) -> &'static str {
        match self {
            Difficulty::Easy => "쉬움",
            Difficulty::Medium => "보통",
            Difficulty::Hard => "어려움",
        }
    }

    /// 英文名
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// 从任意别名解析（大小写不敏感）
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        DIFFICULTY_ALIASES
            .get(trimmed)
            .or_else(|| DIFFICULTY_ALIASES.get(trimmed.to_lowercase().as_str()))
            .copied()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.server_label())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Difficulty::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown difficulty label: {}", label)))
    }
}

/// 单题验证结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub is_correct: bool,
    pub method: String,
}

impl Verification {
    /// 快速验证通过
    pub fn local() -> Self {
        Self {
            is_correct: true,
            method: "local".to_string(),
        }
    }
}

/// 生成阶段产出的候选变形题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantCandidate {
    pub difficulty: Difficulty,
    #[serde(rename = "question_text", alias = "text", default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_lenient_answer")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl VariantCandidate {
    pub fn new(difficulty: Difficulty, text: impl Into<String>) -> Self {
        Self {
            difficulty,
            text: text.into(),
            choices: None,
            answer: None,
            explanation: None,
            verification: None,
            error: None,
            extra: Map::new(),
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// 生成阶段是否已经报错
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn is_verified(&self) -> bool {
        self.verification.as_ref().is_some_and(|v| v.is_correct)
    }
}

/// 答案可能是字符串、数字或 null
fn deserialize_lenient_answer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// 一次运行的生成结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationBatch {
    pub total: usize,
    pub candidates: Vec<VariantCandidate>,
}

/// 代码执行时的难度分布，例如 3 易 / 4 中 / 3 难
///
/// 序列化为 `[[label, count], ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultySpec(pub Vec<(Difficulty, usize)>);

impl DifficultySpec {
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, n)| n).sum()
    }
}

impl Default for DifficultySpec {
    fn default() -> Self {
        Self(vec![
            (Difficulty::Easy, 3),
            (Difficulty::Medium, 4),
            (Difficulty::Hard, 3),
        ])
    }
}

impl Serialize for DifficultySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&str, usize)> = self
            .0
            .iter()
            .map(|(d, n)| (d.server_label(), *n))
            .collect();
        pairs.serialize(serializer)
    }
}

/// 原题的标准解答
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OriginalSolution {
    #[serde(default, deserialize_with = "deserialize_lenient_answer")]
    pub answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

/// 报告中的原题部分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginalReference {
    pub question_number: String,
    pub question_text: String,
    pub choices: Vec<Choice>,
    pub answer: String,
    pub explanation: String,
    pub key_concepts: Vec<String>,
}

impl OriginalReference {
    /// 解答失败时字段为空
    pub fn new(question: &Question, solution: &OriginalSolution) -> Self {
        Self {
            question_number: question.number.clone(),
            question_text: question.text.clone(),
            choices: question.choices.clone(),
            answer: solution.answer.clone().unwrap_or_default(),
            explanation: solution.explanation.clone().unwrap_or_default(),
            key_concepts: solution.key_concepts.clone(),
        }
    }
}

/// 变形题生成报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantsResult {
    pub original: OriginalReference,
    pub variants: Vec<VariantCandidate>,
    pub generation_method: String,
    pub generated_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn difficulty_accepts_every_alias() {
        assert_eq!(Difficulty::from_label("쉬움"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_label("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_label(" 中等 "), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_label("extreme"), None);
    }

    #[test]
    fn difficulty_spec_uses_server_labels() {
        let value = serde_json::to_value(DifficultySpec::default()).unwrap();
        assert_eq!(value, json!([["쉬움", 3], ["보통", 4], ["어려움", 3]]));
        assert_eq!(DifficultySpec::default().total(), 10);
    }

    #[test]
    fn candidate_parses_server_variant() {
        let candidate: VariantCandidate = serde_json::from_value(json!({
            "variant_id": 4,
            "difficulty": "보통",
            "question_text": "x+2=5 일 때 x는?",
            "choices": [{"number": "1", "text": "3"}],
            "answer": 1,
            "explanation": "x=3"
        }))
        .unwrap();

        assert_eq!(candidate.difficulty, Difficulty::Medium);
        assert_eq!(candidate.answer.as_deref(), Some("1"));
        assert!(!candidate.has_error());
        assert!(!candidate.is_verified());
        assert_eq!(candidate.extra["variant_id"], json!(4));
    }

    #[test]
    fn empty_error_string_is_not_an_error() {
        let candidate = VariantCandidate::new(Difficulty::Easy, "q").with_error("");
        assert!(!candidate.has_error());
    }
}
