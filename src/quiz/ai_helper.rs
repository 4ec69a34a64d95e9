use async_trait::async_trait;
use chatgpt::prelude::*;
use chatgpt::types::CompletionResponse;
use log::{debug, error};

use super::provider::{
    parse_evaluation, parse_questions, Evaluation, ProviderError, QuestionProvider,
    EVALUATION_FAILED_FEEDBACK, MISSING_KEY_FEEDBACK,
};
use super::Question;

/// Question generation and grading backed by ChatGPT.
pub struct QuizHelper {
    /// `None` when no API key is configured; every request then degrades.
    chat_gpt: Option<ChatGPT>,
    question_count: usize,
}

impl QuizHelper {
    pub fn new(chat_gpt: Option<ChatGPT>, question_count: usize) -> Self {
        Self {
            chat_gpt,
            question_count,
        }
    }

    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let chat_gpt = self
            .chat_gpt
            .as_ref()
            .ok_or(ProviderError::MissingCredential)?;

        debug!("Sending prompt: {:?}", prompt);
        let response: CompletionResponse = chat_gpt.send_message(prompt).await?;
        let content = response.message().clone().content;
        debug!("Completion: {:?}", content);

        Ok(content)
    }

    async fn request_questions(&self) -> std::result::Result<Vec<Question>, ProviderError> {
        let prompt = questions_prompt(self.question_count);
        let content = self.complete(&prompt).await?;
        parse_questions(&content)
    }

    async fn request_evaluation(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> std::result::Result<Evaluation, ProviderError> {
        let prompt = evaluation_prompt(question, answer, context);
        let content = self.complete(&prompt).await?;
        parse_evaluation(&content)
    }
}

#[async_trait]
impl QuestionProvider for QuizHelper {
    async fn generate_questions(&self) -> Vec<Question> {
        match self.request_questions().await {
            Ok(questions) => questions,
            Err(err) => {
                error!("Failed to generate questions: {}", err);
                Vec::new()
            }
        }
    }

    async fn evaluate_answer(&self, question: &str, answer: &str, context: &str) -> Evaluation {
        match self.request_evaluation(question, answer, context).await {
            Ok(evaluation) => evaluation,
            Err(ProviderError::MissingCredential) => Evaluation::zero(MISSING_KEY_FEEDBACK),
            Err(err) => {
                error!("Evaluation error: {}", err);
                Evaluation::zero(EVALUATION_FAILED_FEEDBACK)
            }
        }
    }
}

fn questions_prompt(count: usize) -> String {
    format!(
        "Generate a quiz with exactly {} Multiple Choice Questions (MCQs) about the **Basic** Bubble Sort algorithm.

        In the visible question text and options, refer to the algorithm simply as \"Bubble Sort\".
        Do not use the words \"unoptimized\", \"basic\" or \"standard\" to qualify the algorithm name.

        The underlying logic and answers MUST be based on the unoptimized version, which runs all passes regardless of whether swaps occurred.
        Best Case Time Complexity is O(N^2) for this version. Total comparisons is always N(N-1)/2.

        Strictly avoid questions about \"Optimized Bubble Sort\", early termination, a \"swapped\" flag, or a best case of O(N).
        Do not use options like \"All of the above\" or \"None of the above\", the options are shown in random order.

        Include questions about:
        - Core mechanics: comparing adjacent pairs, swapping if out of order.
        - Pass logic: after k passes, the k largest elements are sorted at the end.
        - Comparison counts: N-1 in pass 1, N-2 in pass 2, and so on.
        - Tracing: \"What is the state of array [X, Y, Z...] after the first pass?\"
        - Complexity: time O(N^2), space O(1).
        - Stability: definition and why Bubble Sort is stable.
        - Definitions: \"What is a pass?\", \"What is the bubbling effect?\".

        Reply with a JSON array only. Every element is an object with the fields
        \"id\" (string), \"type\" (always \"MCQ\"), \"text\" (string), \"options\" (array of strings),
        \"correctOptionIndex\" (integer index into options) and \"context\" (string explaining the answer).",
        count
    )
}

fn evaluation_prompt(question: &str, answer: &str, context: &str) -> String {
    format!(
        "You are a Computer Science Professor grading a student's answer about Bubble Sort.

        Context from course material:
        {}

        Question: \"{}\"
        Student Answer: \"{}\"

        Grade the answer on a scale of 0 to 100.
        Provide brief, constructive feedback.
        If the answer is incorrect, explain why based on the Bubble Sort algorithm rules.

        Reply with a JSON object only: {{\"score\": number, \"feedback\": string}}.",
        context, question, answer
    )
}
