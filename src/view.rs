//! Data-only projections handed to the rendering layer.

use crate::game_result::GameResult;
use crate::stats::StatisticService;

pub const RESULTS_TITLE: &str = "Этот раунд окончен!";
pub const RESULTS_BUTTON: &str = "Сыграть ещё раз";
pub const ERROR_TITLE: &str = "Ошибка";
pub const ERROR_BUTTON: &str = "Попробовать еще раз";

const BEST_DATE_FORMAT: &str = "%d.%m.%y %H:%M";

#[derive(Debug, Clone, PartialEq)]
pub struct QuizStepViewModel {
    pub image: Vec<u8>,
    pub caption: String,
    pub question: String,
    pub question_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizResultsViewModel {
    pub title: String,
    pub text: String,
    pub button_text: String,
}

impl QuizResultsViewModel {
    pub fn new(
        correct: usize,
        questions_amount: usize,
        games_count: u32,
        best_game: &GameResult,
        accuracy: f64,
    ) -> Self {
        let text = format!(
            "Ваш результат: {correct}/{questions_amount}\n{}",
            statistics_lines(games_count, best_game, accuracy)
        );
        Self {
            title: RESULTS_TITLE.to_string(),
            text,
            button_text: RESULTS_BUTTON.to_string(),
        }
    }
}

fn statistics_lines(games_count: u32, best_game: &GameResult, accuracy: f64) -> String {
    format!(
        "Количество сыгранных квизов:{games_count}\n\
         Рекорд:{}/{}({})\n\
         Средняя точность:{accuracy:.2}%",
        best_game.correct(),
        best_game.total(),
        best_game.date().format(BEST_DATE_FORMAT),
    )
}

/// Historical statistics without a current round, as printed by `--stats`
pub fn statistics_summary<S: StatisticService + ?Sized>(statistics: &S) -> String {
    statistics_lines(
        statistics.games_count(),
        &statistics.best_game(),
        statistics.total_accuracy(),
    )
}

/// What acknowledging an alert leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    PlayAgain,
    Retry,
}

/// A decision presented to the user with exactly one acknowledgement button
#[derive(Debug, Clone, PartialEq)]
pub struct AlertModel {
    pub title: String,
    pub message: String,
    pub button_text: String,
    pub action: AlertAction,
}

impl AlertModel {
    pub fn load_error(message: impl Into<String>) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            message: message.into(),
            button_text: ERROR_BUTTON.to_string(),
            action: AlertAction::Retry,
        }
    }
}

impl From<QuizResultsViewModel> for AlertModel {
    fn from(results: QuizResultsViewModel) -> Self {
        Self {
            title: results.title,
            message: results.text,
            button_text: results.button_text,
            action: AlertAction::PlayAgain,
        }
    }
}
