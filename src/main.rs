mod config;
mod lessons;
mod quiz;
mod visualizer;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use dotenv::dotenv;
use log::{debug, warn};
use quiz::{
    ai_helper::QuizHelper,
    provider::QuestionProvider,
    session::{Feedback, Progress, QuizSession},
    Outcome, Question,
};
use teloxide::{
    dispatching::dialogue::{ErasedStorage, InMemStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup, MessageId, ParseMode},
    utils::html,
};
use visualizer::{render::render_board, RunState, SnapshotStream, SortEngine};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    ReceiveModeChoice,
    Learn {
        slide: usize,
    },
    Visualize,
    Assess {
        session: QuizSession,
    },
    AssessFinished,
}

type UserInfoStorage = std::sync::Arc<ErasedStorage<State>>;

/// One sorting engine per chat, created on first visit.
#[derive(Clone)]
struct Visualizers {
    engines: Arc<Mutex<HashMap<ChatId, SortEngine<u32>>>>,
    sequence: Vec<u32>,
    step_delay: std::time::Duration,
}

impl Visualizers {
    fn engine_for(&self, chat_id: ChatId) -> SortEngine<u32> {
        let mut engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        engines
            .entry(chat_id)
            .or_insert_with(|| SortEngine::new(self.sequence.clone(), self.step_delay))
            .clone()
    }

    /// Cancels the chat's run and forgets its engine.
    fn release(&self, chat_id: ChatId) {
        let removed = self
            .engines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&chat_id);
        if let Some(engine) = removed {
            engine.reset();
        }
    }
}

#[tokio::main]
async fn main() {
    // The .env file is optional, the environment may already be set up
    let _ = dotenv();

    pretty_env_logger::init();
    log::info!("Starting bubble sort bot...");

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            return;
        }
    };

    let bot = Bot::from_env();

    let storage: UserInfoStorage = InMemStorage::<State>::new().erase();

    let gpt = match &config.chatgpt_api_key {
        Some(key) => match ChatGPT::new(key) {
            Ok(mut gpt) => {
                gpt.config.engine = ChatGPTEngine::Gpt35Turbo;
                gpt.config.timeout = config.chatgpt_timeout;
                Some(gpt)
            }
            Err(err) => {
                log::error!("Unable to set up ChatGPT, using built-in questions: {}", err);
                None
            }
        },
        None => {
            warn!("CHATGPT_API_KEY is not set, using built-in questions");
            None
        }
    };

    let quiz_helper: Arc<dyn QuestionProvider> =
        Arc::new(QuizHelper::new(gpt, config.question_count));
    let quiz_helper_for_retake = quiz_helper.clone();
    let quiz_helper_for_menu = quiz_helper.clone();

    let visualizers = Visualizers {
        engines: Arc::new(Mutex::new(HashMap::new())),
        sequence: config.sequence.clone(),
        step_delay: config.step_delay,
    };
    let visualizers_for_menu = visualizers.clone();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveModeChoice].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, msg: Message| {
                    receive_mode_choice(
                        quiz_helper_for_menu.clone(),
                        visualizers_for_menu.clone(),
                        bot,
                        dialogue,
                        msg,
                    )
                },
            ))
            .branch(dptree::case![State::Learn { slide }].endpoint(learn))
            .branch(dptree::case![State::Visualize].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, msg: Message| {
                    visualize(visualizers.clone(), bot, dialogue, msg)
                },
            ))
            .branch(dptree::case![State::Assess { session }].endpoint(assess))
            .branch(dptree::case![State::AssessFinished].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, msg: Message| {
                    assess_finished(quiz_helper_for_retake.clone(), bot, dialogue, msg)
                },
            )),
    )
    .dependencies(dptree::deps![storage])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const LEARN_MODE: &str = "Learn";
const VISUALIZER_MODE: &str = "Visualizer";
const ASSESS_MODE: &str = "Assessment";
const MENU: &str = "Menu";

const PREVIOUS_SLIDE: &str = "⬅ Previous";
const NEXT_SLIDE: &str = "Next ➡";

const START_SORTING: &str = "▶ Start sorting";
const RESET: &str = "↺ Reset";

const SKIP_QUESTION: &str = "Skip question";
const NEXT_QUESTION: &str = "Next question";
const VIEW_RESULTS: &str = "View results";
const TAKE_NEW_QUIZ: &str = "Take new quiz";

const GREETING_TEXT: &str = "Hi! I am the Bubble Sort master class bot.\n\n\
    <b>Learn</b> walks you through the lesson slides, the <b>Visualizer</b> sorts an array step by step \
    and the <b>Assessment</b> checks what you remember.\n\n\
    <i>Pro tip: remember, bubble sort is O(N²) which makes it slow for large data sets!</i>";

fn mode_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(LEARN_MODE),
        KeyboardButton::new(VISUALIZER_MODE),
        KeyboardButton::new(ASSESS_MODE),
    ]])
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_markup(mode_keyboard())
        .await?;

    dialogue.update(State::ReceiveModeChoice).await?;
    Ok(())
}

async fn show_menu(bot: &Bot, dialogue: &QuizDialogue, msg: &Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "What would you like to do?")
        .reply_markup(mode_keyboard())
        .await?;
    dialogue.update(State::ReceiveModeChoice).await?;
    Ok(())
}

async fn receive_mode_choice(
    quiz_helper: Arc<dyn QuestionProvider>,
    visualizers: Visualizers,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(LEARN_MODE) => {
            send_slide(&bot, msg.chat.id, 0).await?;
            dialogue.update(State::Learn { slide: 0 }).await?;
        }
        Some(VISUALIZER_MODE) => {
            let engine = visualizers.engine_for(msg.chat.id);
            send_board(&bot, msg.chat.id, &engine).await?;
            dialogue.update(State::Visualize).await?;
        }
        Some(ASSESS_MODE) => {
            begin_quiz(quiz_helper, &bot, &dialogue, &msg).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please pick one of the modes")
                .reply_markup(mode_keyboard())
                .await?;
        }
    }
    Ok(())
}

async fn send_slide(bot: &Bot, chat_id: ChatId, slide: usize) -> HandlerResult {
    let mut navigation = Vec::new();
    if !lessons::is_first(slide) {
        navigation.push(KeyboardButton::new(PREVIOUS_SLIDE));
    }
    if !lessons::is_last(slide) {
        navigation.push(KeyboardButton::new(NEXT_SLIDE));
    }

    bot.send_message(chat_id, lessons::render(slide))
        .parse_mode(ParseMode::Html)
        .reply_markup(KeyboardMarkup::new(vec![
            navigation,
            vec![KeyboardButton::new(MENU)],
        ]))
        .await?;
    Ok(())
}

async fn learn(bot: Bot, dialogue: QuizDialogue, slide: usize, msg: Message) -> HandlerResult {
    let next_slide = match msg.text() {
        Some(MENU) => return show_menu(&bot, &dialogue, &msg).await,
        Some(NEXT_SLIDE) => lessons::next(slide),
        Some(PREVIOUS_SLIDE) => lessons::previous(slide),
        _ => slide,
    };

    send_slide(&bot, msg.chat.id, next_slide).await?;
    dialogue.update(State::Learn { slide: next_slide }).await?;
    Ok(())
}

fn board_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(START_SORTING), KeyboardButton::new(RESET)],
        vec![KeyboardButton::new(MENU)],
    ])
}

async fn send_board(bot: &Bot, chat_id: ChatId, engine: &SortEngine<u32>) -> HandlerResult {
    bot.send_message(chat_id, render_board(&engine.snapshot()))
        .parse_mode(ParseMode::Html)
        .reply_markup(board_keyboard())
        .await?;
    Ok(())
}

async fn visualize(
    visualizers: Visualizers,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
) -> HandlerResult {
    let engine = visualizers.engine_for(msg.chat.id);

    match msg.text() {
        Some(START_SORTING) => match engine.state() {
            RunState::Idle => {
                // Every run animates its own message, so late edits from a
                // cancelled run never land on the current board.
                // No reply keyboard on it, those messages can't be edited
                let board = bot
                    .send_message(msg.chat.id, render_board(&engine.snapshot()))
                    .parse_mode(ParseMode::Html)
                    .await?;
                if let Some(stream) = engine.start() {
                    tokio::spawn(animate(bot.clone(), msg.chat.id, board.id, stream));
                }
            }
            RunState::Running => {
                bot.send_message(msg.chat.id, "Already sorting, press Reset to start over")
                    .await?;
            }
            RunState::Finished => {
                bot.send_message(msg.chat.id, "The array is sorted, press Reset to try again")
                    .await?;
            }
        },
        Some(RESET) => {
            engine.reset();
            send_board(&bot, msg.chat.id, &engine).await?;
        }
        Some(MENU) => {
            visualizers.release(msg.chat.id);
            show_menu(&bot, &dialogue, &msg).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Use the buttons to start or reset the sort")
                .reply_markup(board_keyboard())
                .await?;
        }
    }
    Ok(())
}

/// Edits the board message for every snapshot, in the order they arrive.
async fn animate(bot: Bot, chat_id: ChatId, message_id: MessageId, mut stream: SnapshotStream<u32>) {
    while let Some(snapshot) = stream.recv().await {
        let edited = bot
            .edit_message_text(chat_id, message_id, render_board(&snapshot))
            .parse_mode(ParseMode::Html)
            .await;
        if let Err(err) = edited {
            warn!("Failed to update the board in chat {}: {}", chat_id, err);
        }
    }
    debug!("Animation in chat {} is over", chat_id);
}

async fn begin_quiz(
    quiz_helper: Arc<dyn QuestionProvider>,
    bot: &Bot,
    dialogue: &QuizDialogue,
    msg: &Message,
) -> HandlerResult {
    bot.send_message(msg.chat.id, "Preparing your questions...")
        .await?;
    // We don't really care about the result here, it only makes the wait look alive
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let loaded = quiz::load_questions(quiz_helper.as_ref()).await;
    if let Some(warning) = loaded.warning {
        bot.send_message(msg.chat.id, warning).await?;
    }

    let session = QuizSession::new(loaded.questions);
    send_question(bot, msg.chat.id, &session).await?;
    dialogue.update(State::Assess { session }).await?;
    Ok(())
}

fn option_label(index: usize, option: &str) -> String {
    let letter = char::from_u32('A' as u32 + index as u32).unwrap_or('?');
    format!("{}. {}", letter, option)
}

/// Feedback message for an answered question, echoing the picked option.
fn feedback_reply(question: &Question, feedback: &Feedback) -> String {
    let heading = match feedback.outcome {
        Outcome::Correct => "✅",
        Outcome::Incorrect => "❌",
        Outcome::Skipped => "⏭",
    };

    let mut reply = String::new();
    if let Some(index) = feedback.chosen {
        if let Some(option) = question.options.get(index) {
            let label = option_label(index, option);
            reply.push_str(&format!("Your answer: {}\n", html::escape(&label)));
        }
    }
    reply.push_str(&format!("{} {}", heading, html::escape(&feedback.text)));
    if !question.context.is_empty() {
        reply.push_str(&format!("\n\n<i>{}</i>", html::escape(&question.context)));
    }
    reply
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    let Some(question) = session.current_question() else {
        return Ok(());
    };

    let mut keyboard: Vec<Vec<KeyboardButton>> = question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| vec![KeyboardButton::new(option_label(i, option))])
        .collect();
    keyboard.push(vec![KeyboardButton::new(SKIP_QUESTION), KeyboardButton::new(MENU)]);

    let text = format!(
        "<i>Question {} of {}</i>\n\n<b>{}</b>",
        session.position() + 1,
        session.len(),
        html::escape(&question.text)
    );
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(KeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

async fn assess(
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    let mut session = session;
    let text = msg.text().unwrap_or_default();

    if text == MENU {
        return show_menu(&bot, &dialogue, &msg).await;
    }

    if session.feedback().is_some() {
        if text != NEXT_QUESTION && text != VIEW_RESULTS {
            bot.send_message(msg.chat.id, "Press the button to continue").await?;
            return Ok(());
        }
        match session.advance() {
            Progress::Question => {
                send_question(&bot, msg.chat.id, &session).await?;
                dialogue.update(State::Assess { session }).await?;
            }
            Progress::Finished => {
                send_summary(&bot, msg.chat.id, &session).await?;
                dialogue.update(State::AssessFinished).await?;
            }
        }
        return Ok(());
    }

    let chosen = session.current_question().and_then(|question| {
        question
            .options
            .iter()
            .enumerate()
            .position(|(i, option)| option_label(i, option) == text)
    });

    let Some(question) = session.current_question().cloned() else {
        return Ok(());
    };
    let feedback = if text == SKIP_QUESTION {
        session.skip().cloned()
    } else if let Some(option) = chosen {
        session.answer(option).cloned()
    } else {
        None
    };

    let Some(feedback) = feedback else {
        bot.send_message(msg.chat.id, "Please pick one of the options")
            .await?;
        return Ok(());
    };

    let reply = feedback_reply(&question, &feedback);
    let next = if session.is_last_question() {
        VIEW_RESULTS
    } else {
        NEXT_QUESTION
    };
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .reply_markup(KeyboardMarkup::new(vec![
            vec![KeyboardButton::new(next)],
            vec![KeyboardButton::new(MENU)],
        ]))
        .await?;

    dialogue.update(State::Assess { session }).await?;
    Ok(())
}

async fn send_summary(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    let summary = session.summary();
    let mut text = format!(
        "<b>Quiz complete!</b>\n\n✅ Correct: {}\n❌ Incorrect: {}\n⏭ Skipped: {}\n\n\
        <b>Final score: {:.2}</b>",
        summary.correct, summary.incorrect, summary.skipped, summary.raw_score
    );
    if summary.raw_score < 0.0 {
        text.push_str(&format!(" (counted as {:.2})", summary.display_score()));
    }
    text.push_str("\n<i>(+1 Correct) | (-0.33 Incorrect if &gt; 2 errors)</i>");

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(KeyboardMarkup::new(vec![vec![
            KeyboardButton::new(TAKE_NEW_QUIZ),
            KeyboardButton::new(MENU),
        ]]))
        .await?;
    Ok(())
}

async fn assess_finished(
    quiz_helper: Arc<dyn QuestionProvider>,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(TAKE_NEW_QUIZ) => begin_quiz(quiz_helper, &bot, &dialogue, &msg).await,
        Some(MENU) => show_menu(&bot, &dialogue, &msg).await,
        _ => {
            bot.send_message(msg.chat.id, "Please pick one of the options")
                .await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fallback_questions;

    #[test]
    fn test_option_labels() {
        assert_eq!(option_label(0, "O(N)"), "A. O(N)");
        assert_eq!(option_label(3, "O(1)"), "D. O(1)");
    }

    #[tokio::test]
    async fn test_engine_is_kept_per_chat() {
        let visualizers = Visualizers {
            engines: Arc::new(Mutex::new(HashMap::new())),
            sequence: vec![2, 1],
            step_delay: std::time::Duration::from_millis(1),
        };

        let engine = visualizers.engine_for(ChatId(1));
        let _stream = engine.start().unwrap();
        assert_eq!(visualizers.engine_for(ChatId(1)).state(), RunState::Running);
        assert_eq!(visualizers.engine_for(ChatId(2)).state(), RunState::Idle);

        visualizers.engine_for(ChatId(1)).reset();
        assert_eq!(engine.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_leaving_the_visualizer_drops_the_engine() {
        let visualizers = Visualizers {
            engines: Arc::new(Mutex::new(HashMap::new())),
            sequence: vec![3, 1, 2],
            step_delay: std::time::Duration::from_millis(1),
        };

        let engine = visualizers.engine_for(ChatId(1));
        let _stream = engine.start().unwrap();
        visualizers.engine_for(ChatId(2));

        visualizers.release(ChatId(1));
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(visualizers.engines.lock().unwrap().len(), 1);
        assert!(!visualizers.engines.lock().unwrap().contains_key(&ChatId(1)));

        // Releasing twice or an unknown chat is harmless
        visualizers.release(ChatId(1));
        visualizers.release(ChatId(3));
        assert_eq!(visualizers.engine_for(ChatId(1)).state(), RunState::Idle);
    }

    #[test]
    fn test_feedback_echoes_the_picked_option() {
        let mut session = QuizSession::new(fallback_questions());
        let question = session.current_question().cloned().unwrap();
        let feedback = session.answer(0).cloned().unwrap();

        let reply = feedback_reply(&question, &feedback);
        assert!(reply.starts_with("Your answer: A. O(N)\n❌ Incorrect."));
        assert!(reply.contains("<i>Bubble sort runs in O(N^2) time"));
    }

    #[test]
    fn test_skipped_feedback_has_no_answer_line() {
        let mut session = QuizSession::new(fallback_questions());
        let question = session.current_question().cloned().unwrap();
        let feedback = session.skip().cloned().unwrap();

        let reply = feedback_reply(&question, &feedback);
        assert!(reply.starts_with("⏭ Skipped."));
        assert!(!reply.contains("Your answer"));
    }
}
