#![forbid(unsafe_code)]

pub mod attempt_service;
pub mod config;
pub mod error;
pub mod generation;
pub mod sessions;
pub mod subject_service;

pub use quiz_core::Clock;
pub use sessions as session;

pub use attempt_service::AttemptRecorder;
pub use config::QuizConfig;
pub use error::{ConfigError, GenerationError, QuizLoopError, SessionError};
pub use generation::{GenerationGate, QuestionGenerator};
pub use subject_service::SubjectService;

pub use sessions::{
    AdvanceTicket, AutoAdvanceTimer, BatchPlanner, BatchSize, QuizCommand, QuizLoopService,
    QuizSession, QuizState, ResultSummary, Shuffler, Transition,
};
