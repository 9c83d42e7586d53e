use std::time::Duration;

use movie_quiz::{
    content::{BundledMovies, ThreadedQuestionSource},
    runtime::{ChannelEventSource, FixedTicker, QuizEvent, Runner, ThreadScheduler},
    storage::SqliteStorage,
    App, AppState, QuizSession, StatisticService, StatisticStore,
};
use tempfile::tempdir;

// Headless run of the whole app without a TTY: real worker-thread question
// source, real delayed advances, SQLite statistics on a temp file.
fn headless_app(db: &std::path::Path, questions: usize, events: &ChannelEventSource) -> App {
    let stats: Box<dyn StatisticService> =
        Box::new(StatisticStore::new(SqliteStorage::open(db).unwrap()));
    let session = QuizSession::new(questions, stats).with_feedback_delay(Duration::from_millis(1));

    let tx = events.sender();
    let source = ThreadedQuestionSource::new(BundledMovies, move |ev| {
        let _ = tx.send(QuizEvent::Source(ev));
    });
    App::new(
        session,
        Box::new(source),
        Box::new(ThreadScheduler::new(events.sender())),
    )
}

/// Pumps events, answering each question with `pick(flag)`, until the results alert shows up
fn play_round(app: &mut App, runner: &Runner<ChannelEventSource, FixedTicker>, pick: fn(bool) -> bool) {
    for _ in 0..2000u32 {
        let event = runner.step();
        app.handle_event(event);

        if app.state() == AppState::Alert {
            return;
        }
        if app.buttons_enabled {
            let flag = app
                .session()
                .current_question()
                .map(|q| q.correct_answer)
                .expect("buttons are only enabled with an active question");
            app.answer(pick(flag));
        }
    }
    panic!("round did not finish");
}

#[test]
fn headless_perfect_round_records_statistics() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("stats.db");

    let events = ChannelEventSource::new();
    let mut app = headless_app(&db, 10, &events);
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(5)));

    app.start();
    play_round(&mut app, &runner, |flag| flag);

    let alert = app.alert.clone().expect("results alert");
    assert_eq!(alert.title, "Этот раунд окончен!");
    assert!(alert.message.contains("Ваш результат: 10/10"));
    assert!(alert.message.contains("Количество сыгранных квизов:1"));
    assert!(alert.message.contains("Средняя точность:100.00%"));
    assert_eq!(app.session().statistics().games_count(), 1);
}

#[test]
fn headless_play_again_accumulates() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("stats.db");

    let events = ChannelEventSource::new();
    let mut app = headless_app(&db, 4, &events);
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(5)));

    app.start();
    play_round(&mut app, &runner, |flag| flag);
    app.acknowledge_alert();
    assert_eq!(app.session().current_question_index(), 0);
    assert_eq!(app.session().correct_answers(), 0);

    play_round(&mut app, &runner, |flag| !flag);
    let alert = app.alert.clone().expect("results alert");
    assert!(alert.message.contains("Ваш результат: 0/4"));
    assert!(alert.message.contains("Количество сыгранных квизов:2"));
    assert!(alert.message.contains("Рекорд:4/4"));
    assert!(alert.message.contains("Средняя точность:50.00%"));
}
