pub mod alert;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::app::App;
use crate::view::QuizStepViewModel;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const POSTER_HEIGHT: u16 = 7;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match &self.step {
            Some(step) => render_step(self, step, area, buf),
            None => render_loading(self.spinner_frame, area, buf),
        }

        if let Some(model) = &self.alert {
            alert::AlertPopup::new(model).render(area, buf);
        }
    }
}

fn render_loading(frame: usize, area: Rect, buf: &mut Buffer) {
    let spinner = SPINNER[frame % SPINNER.len()];
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Line::from(vec![
        Span::styled(spinner, Style::default().fg(Color::Yellow)),
        Span::raw(" Загрузка..."),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
}

fn render_step(app: &App, step: &QuizStepViewModel, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(POSTER_HEIGHT),
            Constraint::Length(1),
            Constraint::Min(2),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);
    Paragraph::new(Span::styled("Вопрос:", dim_style)).render(header[0], buf);
    Paragraph::new(Span::styled(step.question_number.as_str(), bold_style))
        .alignment(Alignment::Right)
        .render(header[1], buf);

    let border_style = match app.feedback {
        Some(true) => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        Some(false) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        None => dim_style,
    };
    let poster_note = if step.image.is_empty() {
        "постер недоступен".to_string()
    } else {
        format!("постер: {} КБ", step.image.len().div_ceil(1024))
    };
    Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(step.caption.as_str(), bold_style)),
        Line::from(Span::styled(poster_note, dim_style)),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    )
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(step.question.as_str(), bold_style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    let button_style = if app.buttons_enabled {
        bold_style
    } else {
        dim_style
    };
    Paragraph::new(Line::from(vec![
        Span::styled("(n) Нет", button_style),
        Span::raw("      "),
        Span::styled("Да (y)", button_style),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}

#[cfg(test)]
mod tests {
    use crate::app::App;
    use crate::content::{QuestionSource, QuizQuestion, SourceEvent};
    use crate::runtime::AdvanceScheduler;
    use crate::session::{QuestionTicket, QuizSession, ScheduledAdvance};
    use crate::stats::{StatisticService, StatisticStore};
    use crate::storage::MemoryStorage;
    use crate::view::AlertModel;
    use ratatui::{backend::TestBackend, Terminal};

    struct NullSource;

    impl QuestionSource for NullSource {
        fn load_data(&mut self, _ticket: QuestionTicket) {}
        fn request_next_question(&mut self, _ticket: QuestionTicket) {}
    }

    struct NullScheduler;

    impl AdvanceScheduler for NullScheduler {
        fn schedule(&mut self, _advance: ScheduledAdvance) {}
    }

    fn app() -> App {
        let stats: Box<dyn StatisticService> = Box::new(StatisticStore::new(MemoryStorage::new()));
        App::new(
            QuizSession::new(10, stats),
            Box::new(NullSource),
            Box::new(NullScheduler),
        )
    }

    fn draw(app: &App) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| f.render_widget(app, f.area())).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn renders_loading_screen() {
        let content = draw(&app());
        assert!(content.contains("Загрузка"));
    }

    #[test]
    fn renders_question_step() {
        let mut app = app();
        let ticket = app.session().question_ticket();
        app.on_source_event(SourceEvent::QuestionReady {
            ticket,
            question: Some(QuizQuestion {
                image: vec![0; 2048],
                caption: "Tenet".to_string(),
                text: "Рейтинг этого фильма больше чем 7?".to_string(),
                correct_answer: true,
            }),
        });

        let content = draw(&app);
        assert!(content.contains("1/10"));
        assert!(content.contains("Tenet"));
        assert!(content.contains("Рейтинг"));
        assert!(content.contains("2 КБ"));
    }

    #[test]
    fn renders_alert_over_screen() {
        let mut app = app();
        app.alert = Some(AlertModel::load_error("catalogue missing"));
        let content = draw(&app);
        assert!(content.contains("Ошибка"));
        assert!(content.contains("catalogue missing"));
        assert!(content.contains("Попробовать еще раз"));
    }
}
