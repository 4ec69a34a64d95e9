pub mod ai_helper;
pub mod provider;
pub mod session;

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use provider::QuestionProvider;

pub const FALLBACK_WARNING: &str = "Failed to load AI questions. Using standard set.";

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    #[serde(default)]
    pub context: String,
}

impl Question {
    pub fn new(id: &str, text: &str, options: &[&str], correct_option_index: usize, context: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_option_index,
            context: context.to_string(),
        }
    }

    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_option_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Shuffles the options so the correct one isn't always in the same spot.
    pub fn shuffle_options<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let correct = self.correct_option_index;
        let mut order: Vec<usize> = (0..self.options.len()).collect();
        order.shuffle(rng);

        self.options = order.iter().map(|&i| self.options[i].clone()).collect();
        if let Some(position) = order.iter().position(|&i| i == correct) {
            self.correct_option_index = position;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    /// Authoritative score, may be negative.
    pub raw_score: f64,
}

impl ScoreSummary {
    pub fn display_score(&self) -> f64 {
        self.raw_score.max(0.0)
    }
}

/// +1 per correct answer. Once there are more than 2 incorrect answers,
/// every one of them costs a third of a point.
pub fn score(outcomes: &[Outcome]) -> ScoreSummary {
    let count = |wanted: Outcome| outcomes.iter().filter(|o| **o == wanted).count();
    let correct = count(Outcome::Correct);
    let incorrect = count(Outcome::Incorrect);
    let skipped = count(Outcome::Skipped);

    let mut raw_score = correct as f64;
    if incorrect > 2 {
        raw_score -= incorrect as f64 / 3.0;
    }

    ScoreSummary {
        correct,
        incorrect,
        skipped,
        raw_score,
    }
}

pub fn fallback_questions() -> Vec<Question> {
    vec![
        Question::new(
            "static_1",
            "What is the average Time Complexity of Bubble Sort?",
            &["O(N)", "O(log N)", "O(N^2)", "O(1)"],
            2,
            "Bubble sort runs in O(N^2) time because of nested loops.",
        ),
        Question::new(
            "static_2",
            "In the first pass of Bubble Sort on an array of size N, how many comparisons are made?",
            &["N", "N - 1", "N / 2", "N * N"],
            1,
            "In the first pass, we compare indices 0 vs 1, 1 vs 2, ... up to N-2 vs N-1. This is N-1 comparisons.",
        ),
        Question::new(
            "static_3",
            "Is Bubble Sort a stable sorting algorithm?",
            &["Yes", "No", "Only for integers", "Only for small arrays"],
            0,
            "Yes, Bubble Sort is stable because it only swaps adjacent elements if the left one is strictly greater than the right one. Equal elements are not swapped.",
        ),
    ]
}

pub struct LoadedQuiz {
    pub questions: Vec<Question>,
    /// Soft warning for the user when the built-in questions are used instead.
    pub warning: Option<&'static str>,
}

/// Asks the provider for a fresh quiz, falling back to the built-in questions.
pub async fn load_questions(provider: &dyn QuestionProvider) -> LoadedQuiz {
    let mut questions = provider.generate_questions().await;
    if questions.is_empty() {
        warn!("No generated questions, using the fallback set");
        return LoadedQuiz {
            questions: fallback_questions(),
            warning: Some(FALLBACK_WARNING),
        };
    }

    let mut rng = rand::thread_rng();
    for question in questions.iter_mut() {
        question.shuffle_options(&mut rng);
    }

    LoadedQuiz {
        questions,
        warning: None,
    }
}
