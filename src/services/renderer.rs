//! 试卷渲染服务 - 业务能力层
//!
//! 把最终选出的题目填入模板，生成 HTML 试卷。
//! 直接拼接字符串，不做 HTML 转义，调用方保证内容可以安全嵌入。

use tracing::debug;

use crate::clients::TemplateSource;
use crate::error::AppResult;
use crate::models::{ExamSettings, VariantCandidate};
use crate::services::template_store::{
    TemplateStore, ANSWER_SHEET_PLACEHOLDER, QUESTIONS_PLACEHOLDER, TITLE_PLACEHOLDER,
};

/// 题目区 HTML：每道题一个 `<div class="question">`
pub fn questions_html(questions: &[VariantCandidate]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let choices: String = q
                .choices
                .iter()
                .flatten()
                .map(|c| {
                    format!(
                        "<div class=\"choice\"><span class=\"choice-number\">{}.</span><span class=\"choice-text\">{}</span></div>",
                        c.number, c.text
                    )
                })
                .collect();

            format!(
                "\n<div class=\"question\">\n  <div class=\"question-header\"><span class=\"question-number\">{}.</span></div>\n  <div class=\"question-text\">{}</div>\n  <div class=\"choices\">{}</div>\n</div>\n",
                idx + 1,
                q.text,
                choices
            )
        })
        .collect()
}

/// 答案表 HTML：每道题一行，没有答案时显示 `-`
pub fn answer_sheet_html(questions: &[VariantCandidate]) -> String {
    let rows: String = questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let answer = q.answer.as_deref().filter(|a| !a.is_empty()).unwrap_or("-");
            format!(
                "\n    <tr class=\"answer-row\"><td>{}</td><td>{}</td></tr>",
                idx + 1,
                answer
            )
        })
        .collect();

    format!(
        "\n<div class=\"answer-sheet\">\n  <h2>答案</h2>\n  <table class=\"answer-table\">\n    <tr><th>题号</th><th>答案</th></tr>{}\n  </table>\n</div>\n",
        rows
    )
}

/// 替换模板中全部占位符（每个占位符的所有出现位置）
pub fn fill_template(template: &str, title: &str, questions: &str, answer_sheet: &str) -> String {
    template
        .replace(TITLE_PLACEHOLDER, title)
        .replace(QUESTIONS_PLACEHOLDER, questions)
        .replace(ANSWER_SHEET_PLACEHOLDER, answer_sheet)
}

/// 试卷渲染服务
///
/// 职责：
/// - 每次渲染时解析当前生效的模板
/// - 生成题目区和（可选的）答案表
/// - 填充模板
pub struct DocumentRenderer<'a, S> {
    templates: &'a TemplateStore<S>,
}

impl<'a, S: TemplateSource> DocumentRenderer<'a, S> {
    pub fn new(templates: &'a TemplateStore<S>) -> Self {
        Self { templates }
    }

    /// 渲染试卷
    ///
    /// # 参数
    /// - `questions`: 最终选出的题目
    /// - `settings`: 试卷设置（标题、是否附答案表）
    pub async fn render(
        &self,
        questions: &[VariantCandidate],
        settings: &ExamSettings,
    ) -> AppResult<String> {
        let template = self.templates.active_template().await?;
        Ok(self.render_with(&template, questions, settings))
    }

    /// 使用指定模板渲染
    pub fn render_with(
        &self,
        template: &str,
        questions: &[VariantCandidate],
        settings: &ExamSettings,
    ) -> String {
        let answer_sheet = if settings.include_answer_sheet {
            answer_sheet_html(questions)
        } else {
            String::new()
        };

        debug!(
            "渲染试卷: {} 道题, 答案表: {}",
            questions.len(),
            settings.include_answer_sheet
        );

        fill_template(template, &settings.title, &questions_html(questions), &answer_sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, Difficulty};

    fn question(text: &str, answer: Option<&str>) -> VariantCandidate {
        let q = VariantCandidate::new(Difficulty::Easy, text)
            .with_choices(vec![Choice::new("1", "3"), Choice::new("2", "<b>5</b>")]);
        match answer {
            Some(a) => q.with_answer(a),
            None => q,
        }
    }

    #[test]
    fn replaces_every_occurrence() {
        let template = "{{title}}|{{title}}|{{questions}}|{{questions}}|{{answerSheet}}|{{answerSheet}}";
        let filled = fill_template(template, "T", "Q", "A");
        assert_eq!(filled, "T|T|Q|Q|A|A");
    }

    #[test]
    fn answer_sheet_uses_dash_for_missing_answer() {
        let html = answer_sheet_html(&[question("a", Some("3")), question("b", None)]);
        assert_eq!(html.matches("<tr class=\"answer-row\">").count(), 2);
        assert!(html.contains("<td>1</td><td>3</td>"));
        assert!(html.contains("<td>2</td><td>-</td>"));
    }

    #[test]
    fn question_text_is_not_escaped() {
        let html = questions_html(&[question("x < 3 &amp; y", None)]);
        assert!(html.contains("x < 3 &amp; y"));
        assert!(html.contains("<span class=\"choice-text\"><b>5</b></span>"));
        assert!(html.contains("<span class=\"question-number\">1.</span>"));
    }

    #[test]
    fn candidate_without_choices_renders_empty_block() {
        let html = questions_html(&[VariantCandidate::new(Difficulty::Hard, "free response")]);
        assert!(html.contains("<div class=\"choices\"></div>"));
    }
}
