//! Prompt construction for question answering and cover letters.

use chrono::Utc;

use super::{AnswerFormat, AskContext, CoverLetterRequest, UNKNOWN_SENTINEL};

/// System prompt for answering one application question.
pub fn answer_system_prompt(context: &AskContext) -> String {
    let mut prompt = String::from(
        "Your role is to answer job application questions as if you were the candidate.\n",
    );
    prompt.push_str(&format!(
        "IMPORTANT: If you can't determine the answer from the resume and the previous answers, \
         respond with '{UNKNOWN_SENTINEL}'.\n"
    ));

    match context.format {
        AnswerFormat::OneChoice => prompt.push_str(
            "IMPORTANT: The question has a list of choices. Your response MUST be exactly one \
             of the choices, with no other text.\n",
        ),
        AnswerFormat::ManyChoices => prompt.push_str(
            "IMPORTANT: The question has a list of choices and accepts several. Respond with \
             each selected choice on its own line, exactly as written, with no other text.\n",
        ),
        AnswerFormat::WholeNumber => prompt.push_str(
            "IMPORTANT: Your response MUST be a whole number between 0 and 99, WITHOUT ANY text \
             before or after the number. For example, if asked 'How many years of experience \
             do you have with Python?' and the answer is 6 years, respond with '6'.\n",
        ),
        AnswerFormat::FreeText { max_len: Some(max) } => prompt.push_str(&format!(
            "IMPORTANT: Your response MUST be at most {max} characters.\n"
        )),
        AnswerFormat::FreeText { max_len: None } => {}
    }

    prompt.push_str(&format!(
        "The current date is: {}.\n",
        Utc::now().format("%Y-%m-%d")
    ));

    if !context.related.is_empty() {
        prompt.push_str("\nPreviously answered questions:\n");
        for related in &context.related {
            prompt.push_str(&format!("Q: {}\nA: {}\n", related.question, related.answer));
        }
    }

    prompt.push_str(&format!("\nResume:\n{}", context.resume_text));
    prompt
}

/// User message for one question.
pub fn question_message(question: &str, choices: Option<&[String]>) -> String {
    match choices {
        Some(choices) if !choices.is_empty() => {
            let list: Vec<String> = choices.iter().map(|c| format!("- {c}")).collect();
            format!("Question: {question}\nChoices:\n{}", list.join("\n"))
        }
        _ => format!("Question: {question}"),
    }
}

/// System prompt for a cover letter.
pub fn cover_letter_system_prompt(request: &CoverLetterRequest) -> String {
    let mut prompt = String::from(
        "Your role is to write cover letters as if you were the candidate. You will be given a \
         job description and must write a cover letter tailored to it using the information \
         in the candidate's resume. The letter should be professional and highlight the \
         candidate's relevant skills and experience.\n",
    );
    prompt.push_str(&format!(
        "IMPORTANT: The cover letter MUST BEGIN WITH: '{}'.\n",
        request.greeting()
    ));
    prompt.push_str(&format!(
        "IMPORTANT: The cover letter MUST END WITH: '{}'.\n",
        request.closing
    ));
    prompt.push_str(&format!("\nResume:\n{}", request.resume_text));

    for (i, example) in request.examples.iter().enumerate() {
        prompt.push_str(&format!("\n\nExample Cover Letter {}:\n{}", i + 1, example));
    }
    prompt
}

/// User message for a cover letter.
pub fn cover_letter_message(request: &CoverLetterRequest) -> String {
    let mut message = format!(
        "Job Description for {} at {}:\n{}",
        request.job_title, request.company, request.job_description
    );
    if let Some(name) = request
        .hiring_manager
        .as_deref()
        .filter(|n| !n.trim().is_empty())
    {
        message.push_str(&format!("\n\nHiring manager: {name}"));
    }
    message
}
