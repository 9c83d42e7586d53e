// Library surface for headless/integration tests and reuse.
// The binary only parses flags and owns the terminal.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod content;
pub mod game_result;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod view;

pub use app::{App, AppState};
pub use game_result::GameResult;
pub use session::QuizSession;
pub use stats::{StatisticService, StatisticStore};
