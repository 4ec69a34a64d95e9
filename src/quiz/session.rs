use super::{score, Outcome, Question, ScoreSummary};

#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub outcome: Outcome,
    pub text: String,
    /// Index of the option the user picked, `None` when skipped.
    pub chosen: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Another question is on screen.
    Question,
    Finished,
}

/// One run through a list of questions.
///
/// Each question is answered or skipped exactly once; `advance` moves on
/// only after that happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizSession {
    questions: Vec<Question>,
    current: usize,
    outcomes: Vec<Outcome>,
    feedback: Option<Feedback>,
    finished: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        let finished = questions.is_empty();
        Self {
            questions,
            current: 0,
            outcomes: Vec::new(),
            feedback: None,
            finished,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Zero based position of the question on screen.
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current)
    }

    pub fn is_last_question(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    /// Feedback for the current question once it has been answered or skipped.
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Answers the current question. Ignored if it was already answered or
    /// the option doesn't exist.
    pub fn answer(&mut self, option: usize) -> Option<&Feedback> {
        if self.feedback.is_some() {
            return None;
        }
        let question = self.current_question()?;
        if option >= question.options.len() {
            return None;
        }

        let (outcome, text) = if option == question.correct_option_index {
            (Outcome::Correct, "Correct! Well done.".to_string())
        } else {
            (
                Outcome::Incorrect,
                format!("Incorrect. The correct answer is: {}", question.correct_option()),
            )
        };
        self.record(outcome, text, Some(option))
    }

    pub fn skip(&mut self) -> Option<&Feedback> {
        if self.feedback.is_some() {
            return None;
        }
        let question = self.current_question()?;
        let text = format!("Skipped. The correct answer was: {}", question.correct_option());
        self.record(Outcome::Skipped, text, None)
    }

    /// Moves past an answered question. Does nothing before feedback exists.
    pub fn advance(&mut self) -> Progress {
        if self.finished {
            return Progress::Finished;
        }
        if self.feedback.is_none() {
            return Progress::Question;
        }

        self.feedback = None;
        if self.is_last_question() {
            self.finished = true;
            Progress::Finished
        } else {
            self.current += 1;
            Progress::Question
        }
    }

    pub fn summary(&self) -> ScoreSummary {
        score(&self.outcomes)
    }

    fn record(&mut self, outcome: Outcome, text: String, chosen: Option<usize>) -> Option<&Feedback> {
        self.outcomes.push(outcome);
        self.feedback = Some(Feedback {
            outcome,
            text,
            chosen,
        });
        self.feedback.as_ref()
    }
}
