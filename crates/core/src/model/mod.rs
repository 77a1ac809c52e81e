mod attempt;
mod ids;
mod language;
mod question;
mod subject;

pub use attempt::{AttemptError, QuizAttempt};
pub use ids::{ParseIdError, SubjectId};
pub use language::{Language, ParseLanguageError};
pub use question::{OptionMark, Question, QuestionError, Selection};
pub use subject::{Subject, SubjectError};
