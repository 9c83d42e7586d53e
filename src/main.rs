use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::warn;
use movie_quiz::{
    config::{Config, ConfigStore, FileConfigStore},
    content::{BundledMovies, FileMoviesLoader, QuestionSource, ThreadedQuestionSource},
    runtime::{ChannelEventSource, FixedTicker, QuizEvent, QuizEventSource, Runner, ThreadScheduler, Ticker},
    storage::{MemoryStorage, SqliteStorage},
    view::statistics_summary,
    App, QuizSession, StatisticService, StatisticStore,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc::Sender,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// movie trivia in the terminal: guess whether a film's rating beats the threshold
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A movie trivia quiz: each round asks whether a film's rating is above a threshold. Best game, games played and overall accuracy are kept across runs."
)]
pub struct Cli {
    /// number of questions per round
    #[clap(short = 'q', long = "questions")]
    questions_amount: Option<usize>,

    /// JSON movie catalogue to draw questions from instead of the bundled one
    #[clap(short = 'm', long = "movies")]
    movies_file: Option<PathBuf>,

    /// milliseconds the answer feedback stays on screen
    #[clap(long)]
    delay_ms: Option<u64>,

    /// statistics database location
    #[clap(long)]
    stats_db: Option<PathBuf>,

    /// print the saved statistics and exit
    #[clap(long)]
    stats: bool,

    /// store the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Flags win over the stored configuration
    fn apply(&self, config: Config) -> Config {
        Config {
            questions_amount: self.questions_amount.unwrap_or(config.questions_amount),
            feedback_delay_ms: self.delay_ms.unwrap_or(config.feedback_delay_ms),
            movies_file: self.movies_file.clone().or(config.movies_file),
            stats_db: self.stats_db.clone().or(config.stats_db),
        }
    }
}

fn open_statistics(config: &Config) -> Box<dyn StatisticService> {
    let storage = match &config.stats_db {
        Some(path) => SqliteStorage::open(path),
        None => SqliteStorage::open_default(),
    };
    match storage {
        Ok(storage) => Box::new(StatisticStore::new(storage)),
        Err(e) => {
            warn!("statistics database unavailable, this run will not be saved: {e}");
            Box::new(StatisticStore::new(MemoryStorage::new()))
        }
    }
}

fn build_app(config: &Config, statistics: Box<dyn StatisticService>, tx: Sender<QuizEvent>) -> App {
    let source_tx = tx.clone();
    let deliver = move |ev| {
        let _ = source_tx.send(QuizEvent::Source(ev));
    };
    let source: Box<dyn QuestionSource> = match &config.movies_file {
        Some(path) => Box::new(ThreadedQuestionSource::new(FileMoviesLoader::new(path), deliver)),
        None => Box::new(ThreadedQuestionSource::new(BundledMovies, deliver)),
    };

    let session = QuizSession::new(config.questions_amount, statistics)
        .with_feedback_delay(Duration::from_millis(config.feedback_delay_ms));

    App::new(session, source, Box::new(ThreadScheduler::new(tx)))
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
    }

    let statistics = open_statistics(&config);
    if cli.stats {
        println!("{}", statistics_summary(statistics.as_ref()));
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let events = ChannelEventSource::with_terminal_input();
    let mut app = build_app(&config, statistics, events.sender());
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: QuizEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    app.start();
    terminal.draw(|f| ui(app, f))?;

    loop {
        if app.handle_event(runner.step()) {
            break;
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
