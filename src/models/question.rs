use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub number: String,
    pub text: String,
}

impl Choice {
    pub fn new(number: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            text: text.into(),
        }
    }
}

/// 图片分析得到的原题
///
/// 分析完成后不再修改；流程只借用它。未识别的字段保存在 `extra` 中，
/// 原样回传给服务端（题干中的图表、表格等信息由服务端使用）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(
        rename = "question_number",
        alias = "number",
        deserialize_with = "deserialize_string_or_number"
    )]
    pub number: String,
    #[serde(rename = "question_text", alias = "text")]
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(
        rename = "topic_category",
        alias = "topic",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub topic: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Question {
    pub fn new(number: impl Into<String>, text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            number: number.into(),
            text: text.into(),
            choices,
            topic: None,
            extra: Map::new(),
        }
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 截断题干以便显示（最多80个字符）
        let preview = if self.text.chars().count() > 80 {
            self.text.chars().take(80).collect::<String>() + "..."
        } else {
            self.text.clone()
        };
        write!(f, "{}. {} [{} 个选项]", self.number, preview, self.choices.len())
    }
}

/// 题号 / 选项号既可能是字符串也可能是整数
pub(crate) fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct LabelVisitor;

    impl<'de> Visitor<'de> for LabelVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer label")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(LabelVisitor)
}
