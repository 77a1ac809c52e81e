pub mod plan;
mod progress;
mod service;
pub mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{
    BatchPlanner, BatchSize, BatchSplit, DEFAULT_BATCH_SIZE, IdentityShuffler, RandomShuffler,
    SeededShuffler, Shuffler, next_batch,
};
pub use progress::SessionProgress;
pub use service::{
    Advance, AdvanceTicket, GradedAnswer, NextStep, QuizSession, QuizTarget, SessionKind,
    Submission,
};
pub use timer::{AutoAdvanceTimer, ScheduledAdvance};
pub use view::{Feedback, ResultSummary};
pub use workflow::{QuizCommand, QuizLoopService, QuizState, Transition};
