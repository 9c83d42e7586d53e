use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use crate::content::{QuestionSource, SourceEvent};
use crate::runtime::{AdvanceScheduler, QuizEvent};
use crate::session::{QuestionTicket, QuizSession, ScheduledAdvance, Transition};
use crate::stats::StatisticService;
use crate::view::{AlertAction, AlertModel, QuizStepViewModel};

/// What the screen shows right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Loading,
    Question,
    Alert,
}

/// Terminal host: owns the session and wires it to the question source,
/// the advance scheduler and the alert dialog.
pub struct App {
    session: QuizSession<Box<dyn StatisticService>>,
    source: Box<dyn QuestionSource>,
    scheduler: Box<dyn AdvanceScheduler>,
    pub step: Option<QuizStepViewModel>,
    /// Border colour of the poster after an answer, `None` while undecided
    pub feedback: Option<bool>,
    pub alert: Option<AlertModel>,
    pub buttons_enabled: bool,
    pub spinner_frame: usize,
    data_loaded: bool,
}

impl App {
    pub fn new(
        session: QuizSession<Box<dyn StatisticService>>,
        source: Box<dyn QuestionSource>,
        scheduler: Box<dyn AdvanceScheduler>,
    ) -> Self {
        Self {
            session,
            source,
            scheduler,
            step: None,
            feedback: None,
            alert: None,
            buttons_enabled: false,
            spinner_frame: 0,
            data_loaded: false,
        }
    }

    pub fn session(&self) -> &QuizSession<Box<dyn StatisticService>> {
        &self.session
    }

    pub fn state(&self) -> AppState {
        if self.alert.is_some() {
            AppState::Alert
        } else if self.step.is_some() {
            AppState::Question
        } else {
            AppState::Loading
        }
    }

    /// Kicks off catalogue loading; the first question is requested once it lands
    pub fn start(&mut self) {
        let ticket = self.session.question_ticket();
        self.source.load_data(ticket);
    }

    /// Returns true when the app should exit
    pub fn handle_event(&mut self, event: QuizEvent) -> bool {
        match event {
            QuizEvent::Key(key) => return self.on_key(key),
            QuizEvent::Resize => {}
            QuizEvent::Tick => self.on_tick(),
            QuizEvent::Source(ev) => self.on_source_event(ev),
            QuizEvent::AdvanceDue(token) => self.on_advance_due(token),
        }
        false
    }

    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Enter if self.alert.is_some() => self.acknowledge_alert(),
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Right => self.answer(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Left => self.answer(false),
            _ => {}
        }
        false
    }

    pub fn on_tick(&mut self) {
        if self.state() == AppState::Loading {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
    }

    pub fn on_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::DataLoaded(ticket) => {
                self.data_loaded = true;
                if ticket == self.session.question_ticket() {
                    self.source.request_next_question(ticket);
                }
            }
            SourceEvent::QuestionReady { ticket, question } => {
                if let Some(step) = self.session.receive_question(ticket, question) {
                    self.step = Some(step);
                    self.feedback = None;
                    self.buttons_enabled = true;
                }
            }
            SourceEvent::LoadFailed { ticket, message } => {
                if let Some(alert) = self.session.load_failed(ticket, &message) {
                    self.buttons_enabled = false;
                    self.alert = Some(alert);
                }
            }
        }
    }

    pub fn answer(&mut self, user_assertion: bool) {
        if !self.buttons_enabled || self.alert.is_some() {
            return;
        }
        if let Some(feedback) = self.session.submit_answer(user_assertion) {
            self.feedback = Some(feedback.is_correct);
            self.buttons_enabled = false;
            self.scheduler.schedule(feedback.advance);
        }
    }

    pub fn on_advance_due(&mut self, token: ScheduledAdvance) {
        match self.session.advance(token) {
            Some(Transition::RequestNextQuestion(ticket)) => {
                self.feedback = None;
                self.source.request_next_question(ticket);
            }
            Some(Transition::Completed(results)) => {
                self.alert = Some(AlertModel::from(results));
            }
            None => {}
        }
    }

    pub fn acknowledge_alert(&mut self) {
        let Some(alert) = self.alert.take() else {
            return;
        };
        debug!("alert acknowledged: {:?}", alert.action);
        let ticket = self.session.acknowledge();
        self.step = None;
        self.feedback = None;
        self.buttons_enabled = false;
        self.request(ticket, alert.action);
    }

    fn request(&mut self, ticket: QuestionTicket, action: AlertAction) {
        if action == AlertAction::Retry && !self.data_loaded {
            self.source.load_data(ticket);
        } else {
            self.source.request_next_question(ticket);
        }
    }
}
