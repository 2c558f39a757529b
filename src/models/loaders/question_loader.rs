use crate::error::{AppError, AppResult, FileError};
use crate::models::question::Question;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 题目文件：单道题，或图片分析结果 `{ questions: [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionFile {
    Analysis { questions: Vec<Question> },
    Single(Question),
}

impl QuestionFile {
    fn into_questions(self) -> Vec<Question> {
        match self {
            QuestionFile::Analysis { questions } => questions,
            QuestionFile::Single(question) => vec![question],
        }
    }
}

/// 从 JSON / TOML 文件加载题目列表
pub async fn load_questions(path: &Path) -> AppResult<Vec<Question>> {
    let path_str = path.display().to_string();

    if !path.exists() {
        return Err(FileError::NotFound { path: path_str }.into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let parsed = parse_question_file(path, &content)?;
    let questions = parsed.into_questions();

    if questions.is_empty() {
        return Err(FileError::NoQuestions { path: path_str }.into());
    }

    tracing::info!("成功加载 {} 道题目: {}", questions.len(), path_str);
    Ok(questions)
}

/// 加载文件中的第 `index` 道题（从 0 开始）
pub async fn load_question(path: &Path, index: usize) -> AppResult<Question> {
    let mut questions = load_questions(path).await?;
    let total = questions.len();
    if index >= total {
        return Err(FileError::QuestionIndexOutOfRange { index, total }.into());
    }
    Ok(questions.swap_remove(index))
}

fn parse_question_file(path: &Path, content: &str) -> AppResult<QuestionFile> {
    let path_str = path.display().to_string();
    let is_toml = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(content).map_err(|source| {
            FileError::TomlParseFailed {
                path: path_str,
                source,
            }
            .into()
        })
    } else {
        serde_json::from_str(content).map_err(|source| {
            FileError::JsonParseFailed {
                path: path_str,
                source,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "variant_exam_loader_{}_{}",
            std::process::id(),
            name
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn loads_analysis_result_json() {
        let path = temp_file(
            "analysis.json",
            r#"{"questions": [
                {"question_number": "1", "question_text": "A", "choices": []},
                {"question_number": "2", "question_text": "B", "choices": []}
            ]}"#,
        );

        let questions = load_questions(&path).await.unwrap();
        assert_eq!(questions.len(), 2);

        let second = load_question(&path, 1).await.unwrap();
        assert_eq!(second.text, "B");

        let err = load_question(&path, 5).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::File(FileError::QuestionIndexOutOfRange { index: 5, total: 2 })
        ));
    }

    #[tokio::test]
    async fn loads_single_question_toml() {
        let path = temp_file(
            "single.toml",
            r#"
question_number = "3"
question_text = "2x = 6 일 때 x는?"

[[choices]]
number = "1"
text = "3"

[[choices]]
number = "2"
text = "6"
"#,
        );

        let question = load_question(&path, 0).await.unwrap();
        assert_eq!(question.number, "3");
        assert_eq!(question.choices.len(), 2);
    }

    #[tokio::test]
    async fn empty_analysis_is_an_error() {
        let path = temp_file("empty.json", r#"{"questions": [], "error": "no text"}"#);
        let err = load_questions(&path).await.unwrap_err();
        assert!(matches!(err, AppError::File(FileError::NoQuestions { .. })));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_questions(Path::new("/definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
    }
}
