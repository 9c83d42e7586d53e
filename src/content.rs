use include_dir::{include_dir, Dir};
use log::{debug, warn};
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

use crate::session::QuestionTicket;

static DATA_DIR: Dir = include_dir!("src/data");
const BUNDLED_CATALOGUE: &str = "movies.json";

/// Thresholds the rating assertion is drawn from
const MIN_THRESHOLD: u8 = 5;
const MAX_THRESHOLD: u8 = 8;

/// One quiz question: a poster and a yes/no assertion about the movie rating
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub image: Vec<u8>,
    pub caption: String,
    pub text: String,
    pub correct_answer: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Movie {
    pub title: String,
    pub rating: f32,
    #[serde(default)]
    pub poster: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed movie catalogue: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bundled catalogue `{0}` is missing")]
    MissingBundle(&'static str),
    #[error("movie catalogue is empty")]
    Empty,
    #[error("question source is unavailable")]
    Unavailable,
}

/// Provider of the movie catalogue
pub trait MoviesLoader: Send + 'static {
    fn load_movies(&self) -> Result<Vec<Movie>, LoadError>;
}

/// Catalogue compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledMovies;

impl MoviesLoader for BundledMovies {
    fn load_movies(&self) -> Result<Vec<Movie>, LoadError> {
        let file = DATA_DIR
            .get_file(BUNDLED_CATALOGUE)
            .ok_or(LoadError::MissingBundle(BUNDLED_CATALOGUE))?;
        let json = file
            .contents_utf8()
            .ok_or(LoadError::MissingBundle(BUNDLED_CATALOGUE))?;
        parse_movies(json)
    }
}

/// Catalogue read from a JSON file; relative poster paths resolve against the file's directory
#[derive(Debug, Clone)]
pub struct FileMoviesLoader {
    path: PathBuf,
}

impl FileMoviesLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MoviesLoader for FileMoviesLoader {
    fn load_movies(&self) -> Result<Vec<Movie>, LoadError> {
        let json = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let base = self.path.parent().unwrap_or_else(|| Path::new(""));
        let movies = parse_movies(&json)?
            .into_iter()
            .map(|mut movie| {
                movie.poster = movie.poster.map(|p| base.join(p));
                movie
            })
            .collect();
        Ok(movies)
    }
}

fn parse_movies(json: &str) -> Result<Vec<Movie>, LoadError> {
    let movies: Vec<Movie> = serde_json::from_str(json)?;
    if movies.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(movies)
}

/// Turns a loaded catalogue into random rating questions
#[derive(Debug)]
pub struct QuestionFactory<L: MoviesLoader> {
    loader: L,
    movies: Vec<Movie>,
}

impl<L: MoviesLoader> QuestionFactory<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            movies: Vec::new(),
        }
    }

    pub fn load_data(&mut self) -> Result<(), LoadError> {
        self.movies = self.loader.load_movies()?;
        debug!("loaded {} movies", self.movies.len());
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        !self.movies.is_empty()
    }

    /// `None` until a catalogue has been loaded
    pub fn next_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<QuizQuestion> {
        if self.movies.is_empty() {
            return None;
        }
        let movie = &self.movies[rng.gen_range(0..self.movies.len())];
        let threshold = rng.gen_range(MIN_THRESHOLD..=MAX_THRESHOLD);
        Some(question_for(movie, threshold))
    }
}

pub fn question_for(movie: &Movie, threshold: u8) -> QuizQuestion {
    QuizQuestion {
        image: load_poster(movie),
        caption: movie.title.clone(),
        text: format!("Рейтинг этого фильма больше чем {threshold}?"),
        correct_answer: movie.rating > f32::from(threshold),
    }
}

fn load_poster(movie: &Movie) -> Vec<u8> {
    let Some(path) = &movie.poster else {
        return Vec::new();
    };
    fs::read(path).unwrap_or_else(|e| {
        warn!("failed to load poster {}: {e}", path.display());
        Vec::new()
    })
}

/// Results posted back by a question source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    DataLoaded(QuestionTicket),
    QuestionReady {
        ticket: QuestionTicket,
        question: Option<QuizQuestion>,
    },
    LoadFailed {
        ticket: QuestionTicket,
        message: String,
    },
}

/// Asynchronous question provider. Both calls return immediately; the outcome
/// arrives later as a [`SourceEvent`] carrying the same ticket.
pub trait QuestionSource {
    fn load_data(&mut self, ticket: QuestionTicket);
    fn request_next_question(&mut self, ticket: QuestionTicket);
}

type Deliver = Arc<dyn Fn(SourceEvent) + Send + Sync>;

/// Runs catalogue loading and question generation on worker threads
pub struct ThreadedQuestionSource<L: MoviesLoader> {
    factory: Arc<Mutex<QuestionFactory<L>>>,
    deliver: Deliver,
}

impl<L: MoviesLoader> ThreadedQuestionSource<L> {
    pub fn new(loader: L, deliver: impl Fn(SourceEvent) + Send + Sync + 'static) -> Self {
        Self {
            factory: Arc::new(Mutex::new(QuestionFactory::new(loader))),
            deliver: Arc::new(deliver),
        }
    }
}

impl<L: MoviesLoader> QuestionSource for ThreadedQuestionSource<L> {
    fn load_data(&mut self, ticket: QuestionTicket) {
        let factory = Arc::clone(&self.factory);
        let deliver = Arc::clone(&self.deliver);
        thread::spawn(move || {
            let loaded = match factory.lock() {
                Ok(mut factory) => factory.load_data(),
                Err(_) => Err(LoadError::Unavailable),
            };
            match loaded {
                Ok(()) => deliver(SourceEvent::DataLoaded(ticket)),
                Err(e) => deliver(SourceEvent::LoadFailed {
                    ticket,
                    message: e.to_string(),
                }),
            }
        });
    }

    fn request_next_question(&mut self, ticket: QuestionTicket) {
        let factory = Arc::clone(&self.factory);
        let deliver = Arc::clone(&self.deliver);
        thread::spawn(move || {
            let event = match factory.lock() {
                Ok(factory) => SourceEvent::QuestionReady {
                    ticket,
                    question: factory.next_question(&mut rand::thread_rng()),
                },
                Err(_) => SourceEvent::LoadFailed {
                    ticket,
                    message: LoadError::Unavailable.to_string(),
                },
            };
            deliver(event);
        });
    }
}
