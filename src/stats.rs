use chrono::Local;
use log::warn;

use crate::game_result::GameResult;
use crate::storage::{KeyValueStorage, KeyValueTxn, StatKey, StatsError};

/// Cross-session statistics bookkeeping
pub trait StatisticService {
    /// Record a finished game. Failures leave the stored statistics unchanged.
    fn store(&mut self, result: &GameResult) -> Result<(), StatsError>;
    fn best_game(&self) -> GameResult;
    /// Percentage of correct answers over every stored game, 0.0 before the first game
    fn total_accuracy(&self) -> f64;
    fn games_count(&self) -> u32;
}

impl<T: StatisticService + ?Sized> StatisticService for Box<T> {
    fn store(&mut self, result: &GameResult) -> Result<(), StatsError> {
        (**self).store(result)
    }

    fn best_game(&self) -> GameResult {
        (**self).best_game()
    }

    fn total_accuracy(&self) -> f64 {
        (**self).total_accuracy()
    }

    fn games_count(&self) -> u32 {
        (**self).games_count()
    }
}

/// Statistics kept in a key-value storage
#[derive(Debug)]
pub struct StatisticStore<K: KeyValueStorage> {
    storage: K,
}

impl<K: KeyValueStorage> StatisticStore<K> {
    pub fn new(storage: K) -> Self {
        Self { storage }
    }

    fn read_count(&self, key: StatKey) -> u32 {
        match self.storage.integer(key) {
            Ok(v) => to_count(v),
            Err(e) => {
                warn!("failed to read {key}: {e}");
                0
            }
        }
    }

    fn try_best_game(&self) -> Result<GameResult, StatsError> {
        let correct = to_count(self.storage.integer(StatKey::BestGameCorrect)?);
        let total = to_count(self.storage.integer(StatKey::BestGameTotal)?);
        let date = self
            .storage
            .timestamp(StatKey::BestGameDate)?
            .unwrap_or_else(Local::now);
        Ok(GameResult::new(correct, total, date))
    }
}

fn to_count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl<K: KeyValueStorage> StatisticService for StatisticStore<K> {
    fn store(&mut self, result: &GameResult) -> Result<(), StatsError> {
        self.storage.transact(&mut |txn| {
            let total_correct = txn.integer(StatKey::TotalCorrectAnswers)?;
            let total_questions = txn.integer(StatKey::TotalQuestions)?;
            let games = txn.integer(StatKey::GamesCount)?;

            txn.set_integer(
                StatKey::TotalCorrectAnswers,
                total_correct + i64::from(result.correct()),
            )?;
            txn.set_integer(
                StatKey::TotalQuestions,
                total_questions + i64::from(result.total()),
            )?;
            txn.set_integer(StatKey::GamesCount, games + 1)?;

            let best = GameResult::new(
                to_count(txn.integer(StatKey::BestGameCorrect)?),
                to_count(txn.integer(StatKey::BestGameTotal)?),
                txn.timestamp(StatKey::BestGameDate)?
                    .unwrap_or_else(Local::now),
            );
            if result.is_better(&best) {
                txn.set_integer(StatKey::BestGameCorrect, i64::from(result.correct()))?;
                txn.set_integer(StatKey::BestGameTotal, i64::from(result.total()))?;
                txn.set_timestamp(StatKey::BestGameDate, result.date())?;
            }
            Ok(())
        })
    }

    fn best_game(&self) -> GameResult {
        self.try_best_game().unwrap_or_else(|e| {
            warn!("failed to read best game: {e}");
            GameResult::placeholder()
        })
    }

    fn total_accuracy(&self) -> f64 {
        let correct = self.read_count(StatKey::TotalCorrectAnswers);
        let questions = self.read_count(StatKey::TotalQuestions);
        if questions == 0 {
            0.0
        } else {
            (correct as f64 / questions as f64) * 100.0
        }
    }

    fn games_count(&self) -> u32 {
        self.read_count(StatKey::GamesCount)
    }
}
