use quiz_core::model::Language;

const SYSTEM_PROMPT: &str = "You write multiple-choice quizzes and reply with JSON only, shaped as \
{\"questions\": [{\"question\": string, \"options\": [string], \"answer\": [string], \"explanation\": string}]}.";

#[must_use]
pub(crate) fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Builds the language-specific user prompt for `text`.
#[must_use]
pub(crate) fn quiz_prompt(text: &str, language: Language) -> String {
    match language {
        Language::English => format!(
            "Based on the following text, create a series of multiple-choice quiz questions.\n\
             Identify if a question has single or multiple correct answers based on the source text \
             (e.g., \"Answer: ABDE\" implies multiple answers).\n\
             For each question, provide a list of options, the correct answer(s), and a brief explanation.\n\
             The 'answer' field MUST ALWAYS be an array of strings copied exactly from 'options', \
             even for single-answer questions.\n\n\
             Text:\n---\n{text}\n---"
        ),
        Language::Chinese => format!(
            "请根据以下文本，创建一系列多项选择题。\n\
             根据源文本判断问题是单选还是多选（例如，“答案：ABDE”意味着多选）。\n\
             对于每个问题，提供一个选项列表、正确答案和简要解释。\n\
             JSON输出中的'answer'字段必须始终是一个字符串数组，且必须与'options'中的文字完全一致。\n\
             所有的问题、选项和解释都必须是中文。\n\n\
             文本：\n---\n{text}\n---"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text_in_requested_language() {
        let en = quiz_prompt("photosynthesis", Language::English);
        assert!(en.starts_with("Based on the following text"));
        assert!(en.contains("---\nphotosynthesis\n---"));

        let zh = quiz_prompt("光合作用", Language::Chinese);
        assert!(zh.contains("中文"));
        assert!(zh.contains("光合作用"));
    }
}
