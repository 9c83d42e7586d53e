use chrono::Local;
use log::{debug, warn};
use std::time::Duration;

use crate::content::QuizQuestion;
use crate::game_result::GameResult;
use crate::stats::StatisticService;
use crate::view::{AlertModel, QuizResultsViewModel, QuizStepViewModel};

pub const DEFAULT_QUESTIONS_AMOUNT: usize = 10;
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingQuestion,
    QuestionPresented,
    Evaluating,
    SessionComplete,
}

/// Identifies the question slot a content request was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionTicket {
    generation: u64,
    question_index: usize,
}

impl QuestionTicket {
    pub fn new(generation: u64, question_index: usize) -> Self {
        Self {
            generation,
            question_index,
        }
    }
}

/// A delayed `advance` waiting for its feedback interval to pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    generation: u64,
    question_index: usize,
    delay: Duration,
}

impl ScheduledAdvance {
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub advance: ScheduledAdvance,
}

/// Where the session went after a scheduled advance fired
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    RequestNextQuestion(QuestionTicket),
    Completed(QuizResultsViewModel),
}

/// Progression and scoring of quiz rounds.
///
/// Every start or reset bumps the generation. Tickets and scheduled advances
/// carry the generation and question index they were issued for, and are
/// ignored once either has moved on.
#[derive(Debug)]
pub struct QuizSession<S: StatisticService> {
    questions_amount: usize,
    current_question_index: usize,
    correct_answers: usize,
    current_question: Option<QuizQuestion>,
    phase: SessionPhase,
    generation: u64,
    feedback_delay: Duration,
    statistics: S,
}

impl<S: StatisticService> QuizSession<S> {
    pub fn new(questions_amount: usize, statistics: S) -> Self {
        let mut session = Self {
            questions_amount: questions_amount.max(1),
            current_question_index: 0,
            correct_answers: 0,
            current_question: None,
            phase: SessionPhase::AwaitingQuestion,
            generation: 0,
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            statistics,
        };
        session.start(questions_amount);
        session
    }

    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }

    /// Begins a fresh round of `questions_amount` questions
    pub fn start(&mut self, questions_amount: usize) -> QuestionTicket {
        self.questions_amount = questions_amount.max(1);
        self.reset_for_new_game()
    }

    pub fn reset_for_new_game(&mut self) -> QuestionTicket {
        self.generation += 1;
        self.current_question_index = 0;
        self.correct_answers = 0;
        self.current_question = None;
        self.phase = SessionPhase::AwaitingQuestion;
        debug!("session reset, generation {}", self.generation);
        self.question_ticket()
    }

    /// Ticket for the question slot currently being waited on
    pub fn question_ticket(&self) -> QuestionTicket {
        QuestionTicket::new(self.generation, self.current_question_index)
    }

    fn is_current(&self, generation: u64, question_index: usize) -> bool {
        generation == self.generation && question_index == self.current_question_index
    }

    /// Accepts a delivered question. Returns the step to show, or `None` when
    /// nothing arrived, the ticket is stale or no question is being awaited.
    pub fn receive_question(
        &mut self,
        ticket: QuestionTicket,
        question: Option<QuizQuestion>,
    ) -> Option<QuizStepViewModel> {
        if !self.is_current(ticket.generation, ticket.question_index)
            || self.phase != SessionPhase::AwaitingQuestion
        {
            debug!("ignoring stale question for {ticket:?}");
            return None;
        }
        let question = question?;
        let step = self.convert(&question);
        self.current_question = Some(question);
        self.phase = SessionPhase::QuestionPresented;
        Some(step)
    }

    /// Turns a content failure into the retry alert, unless it belongs to an earlier round
    pub fn load_failed(&self, ticket: QuestionTicket, message: &str) -> Option<AlertModel> {
        if ticket.generation != self.generation {
            debug!("ignoring stale load failure for {ticket:?}");
            return None;
        }
        Some(AlertModel::load_error(message))
    }

    /// Scores the answer to the active question. No-op while no question is active.
    pub fn submit_answer(&mut self, user_assertion: bool) -> Option<AnswerFeedback> {
        if self.phase != SessionPhase::QuestionPresented {
            return None;
        }
        let question = self.current_question.as_ref()?;
        let is_correct = question.correct_answer == user_assertion;
        if is_correct {
            self.correct_answers += 1;
        }
        self.phase = SessionPhase::Evaluating;

        Some(AnswerFeedback {
            is_correct,
            advance: ScheduledAdvance {
                generation: self.generation,
                question_index: self.current_question_index,
                delay: self.feedback_delay,
            },
        })
    }

    pub fn is_last_question(&self) -> bool {
        self.current_question_index == self.questions_amount - 1
    }

    /// Runs a scheduled advance: either requests the next question or finishes the round.
    pub fn advance(&mut self, token: ScheduledAdvance) -> Option<Transition> {
        if !self.is_current(token.generation, token.question_index)
            || self.phase != SessionPhase::Evaluating
        {
            debug!("discarding stale advance {token:?}");
            return None;
        }

        if self.is_last_question() {
            self.phase = SessionPhase::SessionComplete;
            return Some(Transition::Completed(self.finish_game()));
        }

        self.current_question_index += 1;
        self.current_question = None;
        self.phase = SessionPhase::AwaitingQuestion;
        Some(Transition::RequestNextQuestion(self.question_ticket()))
    }

    fn finish_game(&mut self) -> QuizResultsViewModel {
        let result = GameResult::new(
            count_u32(self.correct_answers),
            count_u32(self.questions_amount),
            Local::now(),
        );
        if let Err(e) = self.statistics.store(&result) {
            warn!("statistics were not saved: {e}");
        }

        QuizResultsViewModel::new(
            self.correct_answers,
            self.questions_amount,
            self.statistics.games_count(),
            &self.statistics.best_game(),
            self.statistics.total_accuracy(),
        )
    }

    /// The single action of both alerts: start over and ask for a question
    pub fn acknowledge(&mut self) -> QuestionTicket {
        self.reset_for_new_game()
    }

    pub fn question_number_label(&self) -> String {
        format!(
            "{}/{}",
            self.current_question_index + 1,
            self.questions_amount
        )
    }

    pub fn convert(&self, question: &QuizQuestion) -> QuizStepViewModel {
        QuizStepViewModel {
            image: question.image.clone(),
            caption: question.caption.clone(),
            question: question.text.clone(),
            question_number: self.question_number_label(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn questions_amount(&self) -> usize {
        self.questions_amount
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn correct_answers(&self) -> usize {
        self.correct_answers
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.current_question.as_ref()
    }

    pub fn statistics(&self) -> &S {
        &self.statistics
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatisticStore;
    use crate::storage::{MemoryStorage, StatsError};
    use assert_matches::assert_matches;

    fn question(correct_answer: bool) -> QuizQuestion {
        QuizQuestion {
            image: Vec::new(),
            caption: "Inception".to_string(),
            text: "Рейтинг этого фильма больше чем 7?".to_string(),
            correct_answer,
        }
    }

    fn session(amount: usize) -> QuizSession<StatisticStore<MemoryStorage>> {
        QuizSession::new(amount, StatisticStore::new(MemoryStorage::new()))
    }

    /// Records every stored result; optionally fails the write
    #[derive(Default)]
    struct SpyStatistics {
        stored: Vec<GameResult>,
        fail: bool,
    }

    impl StatisticService for SpyStatistics {
        fn store(&mut self, result: &GameResult) -> Result<(), StatsError> {
            if self.fail {
                return Err(StatsError::Unavailable("offline".to_string()));
            }
            self.stored.push(result.clone());
            Ok(())
        }

        fn best_game(&self) -> GameResult {
            self.stored
                .iter()
                .fold(GameResult::placeholder(), |best, r| {
                    if r.is_better(&best) {
                        r.clone()
                    } else {
                        best
                    }
                })
        }

        fn total_accuracy(&self) -> f64 {
            0.0
        }

        fn games_count(&self) -> u32 {
            self.stored.len() as u32
        }
    }

    /// Presents a question, answers it and fires the advance
    fn play<S: StatisticService>(
        session: &mut QuizSession<S>,
        flag: bool,
        answer: bool,
    ) -> Option<Transition> {
        let ticket = session.question_ticket();
        session.receive_question(ticket, Some(question(flag)))?;
        let feedback = session.submit_answer(answer)?;
        session.advance(feedback.advance)
    }

    #[test]
    fn starts_awaiting_first_question() {
        let s = session(10);
        assert_eq!(s.phase(), SessionPhase::AwaitingQuestion);
        assert_eq!(s.current_question_index(), 0);
        assert_eq!(s.correct_answers(), 0);
        assert!(s.current_question().is_none());
        assert_eq!(s.question_number_label(), "1/10");
    }

    #[test]
    fn counts_matching_answers() {
        let mut s = session(10);
        let answers = [
            (true, true),
            (true, false),
            (false, false),
            (false, true),
            (true, true),
        ];
        for (flag, answer) in answers {
            play(&mut s, flag, answer);
        }
        assert_eq!(s.correct_answers(), 3);
        assert_eq!(s.current_question_index(), 5);
        assert_eq!(s.question_number_label(), "6/10");
    }

    #[test]
    fn feedback_reports_correctness() {
        let mut s = session(10);
        let ticket = s.question_ticket();
        let step = s.receive_question(ticket, Some(question(false))).unwrap();
        assert_eq!(step.question_number, "1/10");
        assert_eq!(s.phase(), SessionPhase::QuestionPresented);

        let feedback = s.submit_answer(true).unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.advance.delay(), DEFAULT_FEEDBACK_DELAY);
        assert_eq!(s.phase(), SessionPhase::Evaluating);
    }

    #[test]
    fn answer_without_question_is_ignored() {
        let mut s = session(10);
        assert!(s.submit_answer(true).is_none());
        assert_eq!(s.correct_answers(), 0);
        assert_eq!(s.phase(), SessionPhase::AwaitingQuestion);
    }

    #[test]
    fn second_answer_to_same_question_is_ignored() {
        let mut s = session(10);
        let ticket = s.question_ticket();
        s.receive_question(ticket, Some(question(true)));
        assert!(s.submit_answer(true).is_some());
        assert!(s.submit_answer(true).is_none());
        assert_eq!(s.correct_answers(), 1);
    }

    #[test]
    fn empty_delivery_changes_nothing() {
        let mut s = session(10);
        let ticket = s.question_ticket();
        assert!(s.receive_question(ticket, None).is_none());
        assert_eq!(s.phase(), SessionPhase::AwaitingQuestion);
        assert_eq!(s.question_ticket(), ticket);
        assert!(s.current_question().is_none());
    }

    #[test]
    fn last_question_predicate() {
        let mut s = session(3);
        assert!(!s.is_last_question());
        play(&mut s, true, true);
        assert!(!s.is_last_question());
        play(&mut s, true, true);
        assert!(s.is_last_question());
        assert_eq!(s.current_question_index(), 2);
    }

    #[test]
    fn advancing_mid_round_requests_next_question() {
        let mut s = session(10);
        let transition = play(&mut s, true, true).unwrap();
        assert_matches!(transition, Transition::RequestNextQuestion(t) if t == s.question_ticket());
        assert!(s.current_question().is_none());
        assert_eq!(s.phase(), SessionPhase::AwaitingQuestion);
    }

    #[test]
    fn last_advance_completes_without_request() {
        let mut s = QuizSession::new(2, SpyStatistics::default());
        play(&mut s, true, true);
        let transition = play(&mut s, false, true).unwrap();

        assert_matches!(transition, Transition::Completed(ref vm) if vm.text.contains("Ваш результат: 1/2"));
        assert_eq!(s.phase(), SessionPhase::SessionComplete);
        assert_eq!(s.statistics().stored.len(), 1);
        assert_eq!(s.current_question_index(), 1);
    }

    #[test]
    fn perfect_round_stores_once() {
        let mut s = QuizSession::new(10, SpyStatistics::default());
        let mut last = None;
        for _ in 0..10 {
            last = play(&mut s, true, true);
        }

        let stored = &s.statistics().stored;
        assert_eq!(stored.len(), 1);
        assert_eq!((stored[0].correct(), stored[0].total()), (10, 10));
        assert_matches!(last, Some(Transition::Completed(vm)) if vm.text.contains("10/10"));
    }

    #[test]
    fn completed_session_ignores_further_input() {
        let mut s = QuizSession::new(1, SpyStatistics::default());
        let ticket = s.question_ticket();
        s.receive_question(ticket, Some(question(true)));
        let feedback = s.submit_answer(true).unwrap();
        assert!(s.advance(feedback.advance).is_some());

        assert!(s.advance(feedback.advance).is_none());
        assert!(s.submit_answer(true).is_none());
        assert!(s.receive_question(ticket, Some(question(true))).is_none());
        assert_eq!(s.statistics().stored.len(), 1);
    }

    #[test]
    fn reset_clears_progress() {
        let mut s = session(10);
        play(&mut s, true, true);
        play(&mut s, true, true);
        let ticket = s.question_ticket();
        s.receive_question(ticket, Some(question(true)));

        let fresh = s.reset_for_new_game();
        assert_eq!(s.current_question_index(), 0);
        assert_eq!(s.correct_answers(), 0);
        assert!(s.current_question().is_none());
        assert_eq!(s.phase(), SessionPhase::AwaitingQuestion);
        assert_ne!(fresh, ticket);
    }

    #[test]
    fn pending_advance_is_discarded_after_reset() {
        let mut s = session(10);
        let ticket = s.question_ticket();
        s.receive_question(ticket, Some(question(true)));
        let feedback = s.submit_answer(true).unwrap();

        s.reset_for_new_game();
        assert!(s.advance(feedback.advance).is_none());
        assert_eq!(s.current_question_index(), 0);
        assert_eq!(s.correct_answers(), 0);
    }

    #[test]
    fn late_question_from_previous_round_is_ignored() {
        let mut s = session(10);
        let old = s.question_ticket();
        s.reset_for_new_game();
        assert!(s.receive_question(old, Some(question(true))).is_none());
        assert_eq!(s.phase(), SessionPhase::AwaitingQuestion);

        let current = s.question_ticket();
        assert!(s.receive_question(current, Some(question(true))).is_some());
    }

    #[test]
    fn load_failure_alert_only_for_current_round() {
        let mut s = session(10);
        let old = s.question_ticket();
        let alert = s.load_failed(old, "timeout").unwrap();
        assert_eq!(alert.title, "Ошибка");
        assert_eq!(alert.message, "timeout");

        s.acknowledge();
        assert!(s.load_failed(old, "timeout").is_none());
    }

    #[test]
    fn persistence_failure_still_completes() {
        let spy = SpyStatistics {
            fail: true,
            ..Default::default()
        };
        let mut s = QuizSession::new(1, spy);
        let transition = play(&mut s, true, true).unwrap();
        assert_matches!(transition, Transition::Completed(vm) if vm.text.contains("Ваш результат: 1/1"));
        assert_eq!(s.correct_answers(), 1);
    }

    #[test]
    fn statistics_accumulate_across_rounds() {
        let mut s = session(2);
        play(&mut s, true, true);
        play(&mut s, true, true);
        s.acknowledge();
        play(&mut s, true, false);
        let transition = play(&mut s, true, true).unwrap();

        assert_eq!(s.statistics().games_count(), 2);
        assert_eq!(s.statistics().total_accuracy(), 75.0);
        assert_matches!(transition, Transition::Completed(vm) if vm.text.contains("Количество сыгранных квизов:2"));
    }

    #[test]
    fn feedback_delay_is_configurable() {
        let mut s = session(10).with_feedback_delay(Duration::from_millis(5));
        let ticket = s.question_ticket();
        s.receive_question(ticket, Some(question(true)));
        let feedback = s.submit_answer(false).unwrap();
        assert_eq!(feedback.advance.delay(), Duration::from_millis(5));
    }
}
