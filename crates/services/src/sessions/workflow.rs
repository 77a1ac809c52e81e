use std::sync::Arc;

use quiz_core::model::{Question, Selection, Subject, SubjectId};
use quiz_core::progress::{ProgressSeries, aggregate};
use storage::SubjectStore;

use super::plan::BatchPlanner;
use super::service::{Advance, AdvanceTicket, NextStep, QuizSession, QuizTarget};
use super::view::ResultSummary;
use crate::Clock;
use crate::attempt_service::AttemptRecorder;
use crate::config::QuizConfig;
use crate::error::{GenerationError, QuizLoopError, SessionError};
use crate::generation::{GenerationGate, QuestionGenerator, validate_source_text};
use crate::subject_service::SubjectService;

/// In-flight key for generation from freshly pasted text.
const AD_HOC_KEY: &str = "ad-hoc";

/// Screen-level state of the quiz flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    SubjectSelection,
    ContentIntake,
    Generating,
    InProgress,
    Results,
}

impl QuizState {
    fn name(self) -> &'static str {
        match self {
            QuizState::SubjectSelection => "selecting a subject",
            QuizState::ContentIntake => "entering content",
            QuizState::Generating => "generating",
            QuizState::InProgress => "a quiz is in progress",
            QuizState::Results => "showing results",
        }
    }
}

/// Every learner action the flow understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand {
    SelectSubject(SubjectId),
    BeginIntake,
    CreateSubject(String),
    DeleteSubject(SubjectId),
    SubmitAnswer(Selection),
    Advance,
    AutoAdvance(AdvanceTicket),
    Restart,
    Review,
    NextBatch,
    SaveSubject(String),
    StartOver,
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: QuizState,
    /// Set after a correct answer; hand it to an `AutoAdvanceTimer`.
    pub auto_advance: Option<AdvanceTicket>,
    /// Set when `SaveSubject` created a subject.
    pub saved_subject: Option<SubjectId>,
}

impl Transition {
    fn to(state: QuizState) -> Self {
        Self {
            state,
            auto_advance: None,
            saved_subject: None,
        }
    }
}

/// Drives the quiz flow: subject selection, generation, quiz runs and results.
///
/// Holds the authoritative in-memory subject list; every mutation is saved
/// wholesale through the `SubjectStore` and never fails the command.
pub struct QuizLoopService {
    config: QuizConfig,
    clock: Clock,
    planner: BatchPlanner,
    generation: GenerationGate,
    subject_service: SubjectService,
    recorder: AttemptRecorder,
    subjects: Vec<Subject>,
    state: QuizState,
    session: Option<QuizSession>,
    pending_text: Option<String>,
}

impl QuizLoopService {
    /// Load saved subjects and start at subject selection.
    pub async fn load(
        config: QuizConfig,
        clock: Clock,
        store: SubjectStore,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        let subject_service = SubjectService::new(store.clone());
        let subjects = subject_service.list().await;
        Self {
            planner: BatchPlanner::new(config.batch_size),
            config,
            clock,
            generation: GenerationGate::new(generator),
            subject_service,
            recorder: AttemptRecorder::new(store),
            subjects,
            state: QuizState::SubjectSelection,
            session: None,
            pending_text: None,
        }
    }

    #[must_use]
    pub fn with_planner(mut self, planner: BatchPlanner) -> Self {
        self.planner = planner;
        self
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    #[must_use]
    pub fn subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id() == id)
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// True while an unsaved ad-hoc quiz can be stored as a subject.
    #[must_use]
    pub fn can_save_subject(&self) -> bool {
        self.pending_text.is_some() && self.session.is_some()
    }

    #[must_use]
    pub fn results(&self) -> Option<ResultSummary> {
        self.session.as_ref().and_then(QuizSession::summary)
    }

    /// Progress chart data for a subject.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::UnknownSubject` if no subject has that id.
    pub fn subject_progress(&self, id: &SubjectId) -> Result<ProgressSeries, QuizLoopError> {
        let subject = self
            .subject(id)
            .ok_or_else(|| QuizLoopError::UnknownSubject(id.clone()))?;
        Ok(aggregate(subject.history()))
    }

    /// Apply a command.
    ///
    /// # Errors
    ///
    /// Returns the error of the corresponding operation.
    pub async fn dispatch(&mut self, command: QuizCommand) -> Result<Transition, QuizLoopError> {
        match command {
            QuizCommand::SelectSubject(id) => self.select_subject(&id).await,
            QuizCommand::BeginIntake => Ok(self.begin_intake()),
            QuizCommand::CreateSubject(text) => self.create_subject(&text).await,
            QuizCommand::DeleteSubject(id) => Ok(self.delete_subject(&id).await),
            QuizCommand::SubmitAnswer(selection) => self.submit_answer(selection),
            QuizCommand::Advance => self.advance().await,
            QuizCommand::AutoAdvance(ticket) => self.auto_advance(ticket).await,
            QuizCommand::Restart => self.restart(),
            QuizCommand::Review => self.review(),
            QuizCommand::NextBatch => self.next_batch(),
            QuizCommand::SaveSubject(name) => self.save_subject(&name).await,
            QuizCommand::StartOver => Ok(self.start_over()),
        }
    }

    //
    // ─── SUBJECTS AND GENERATION ──────────────────────────────────────────────
    //

    /// Start a quiz for a saved subject, generating questions only when none are cached.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::UnknownSubject` for a missing id and
    /// `QuizLoopError::Generation` when generation fails; the flow then returns
    /// to subject selection.
    pub async fn select_subject(&mut self, id: &SubjectId) -> Result<Transition, QuizLoopError> {
        let subject = self
            .subject(id)
            .cloned()
            .ok_or_else(|| QuizLoopError::UnknownSubject(id.clone()))?;
        self.session = None;
        self.pending_text = None;

        let questions = if let Some(cached) = subject.cached_questions() {
            cached.to_vec()
        } else {
            let questions = self.generate(id.as_str(), subject.content()).await?;
            self.subjects = self
                .subject_service
                .cache_questions(&self.subjects, id, &questions)
                .await;
            questions
        };

        self.begin_session(QuizTarget::Subject(id.clone()), questions)
    }

    pub fn begin_intake(&mut self) -> Transition {
        self.session = None;
        self.pending_text = None;
        self.state = QuizState::ContentIntake;
        Transition::to(self.state)
    }

    /// Generate a quiz from freshly pasted text and start it unsaved.
    ///
    /// Any previous quiz is discarded first, even when the text is rejected.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::TextTooShort` (staying in content intake) or
    /// `QuizLoopError::Generation` (returning to subject selection).
    pub async fn create_subject(&mut self, text: &str) -> Result<Transition, QuizLoopError> {
        self.begin_intake();
        validate_source_text(text, self.config.min_text_chars).map_err(|err| match err {
            GenerationError::TextTooShort { min, actual } => {
                QuizLoopError::TextTooShort { min, actual }
            }
            other => other.into(),
        })?;

        let questions = self.generate(AD_HOC_KEY, text).await?;
        self.pending_text = Some(text.to_string());
        self.begin_session(QuizTarget::AdHoc, questions)
    }

    /// Remove a saved subject. An active session keeps running.
    pub async fn delete_subject(&mut self, id: &SubjectId) -> Transition {
        self.subjects = self.subject_service.delete(&self.subjects, id).await;
        Transition::to(self.state)
    }

    /// Save the current unsaved quiz as a subject; later batches record attempts.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::NothingToSave` without an unsaved quiz and
    /// `QuizLoopError::Subject` for a blank name.
    pub async fn save_subject(&mut self, name: &str) -> Result<Transition, QuizLoopError> {
        let (Some(text), Some(session)) = (self.pending_text.as_ref(), self.session.as_mut())
        else {
            return Err(QuizLoopError::NothingToSave);
        };

        let questions = session.lineage_master().to_vec();
        let (subjects, id) = self
            .subject_service
            .create(&self.subjects, name, text, questions)
            .await?;
        session.retarget(id.clone());
        self.subjects = subjects;
        self.pending_text = None;

        let mut transition = Transition::to(self.state);
        transition.saved_subject = Some(id);
        Ok(transition)
    }

    pub fn start_over(&mut self) -> Transition {
        self.session = None;
        self.pending_text = None;
        self.state = QuizState::SubjectSelection;
        Transition::to(self.state)
    }

    async fn generate(&mut self, key: &str, text: &str) -> Result<Vec<Question>, QuizLoopError> {
        self.state = QuizState::Generating;
        match self
            .generation
            .generate(key, text, self.config.language)
            .await
        {
            Ok(questions) if !questions.is_empty() => Ok(questions),
            Ok(_) => {
                self.state = QuizState::SubjectSelection;
                Err(GenerationError::EmptyResult.into())
            }
            Err(err) => {
                self.state = QuizState::SubjectSelection;
                self.pending_text = None;
                Err(err.into())
            }
        }
    }

    fn begin_session(
        &mut self,
        target: QuizTarget,
        questions: Vec<Question>,
    ) -> Result<Transition, QuizLoopError> {
        match QuizSession::start(target, questions, &mut self.planner) {
            Ok(session) => {
                self.session = Some(session);
                self.state = QuizState::InProgress;
                Ok(Transition::to(self.state))
            }
            Err(err) => {
                self.state = QuizState::SubjectSelection;
                Err(err.into())
            }
        }
    }

    //
    // ─── QUIZ RUN ─────────────────────────────────────────────────────────────
    //

    /// Grade the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::InvalidState` outside a quiz and
    /// `QuizLoopError::Session` for rejected submissions.
    pub fn submit_answer(&mut self, selection: Selection) -> Result<Transition, QuizLoopError> {
        let session = self.active_session(QuizState::InProgress)?;
        let submission = session.submit_answer(selection)?;

        let mut transition = Transition::to(self.state);
        if let NextStep::AutoAdvance(ticket) = submission.next {
            transition.auto_advance = Some(ticket);
        }
        Ok(transition)
    }

    /// Move past the graded question, recording an attempt when a subject batch finishes.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::InvalidState` outside a quiz and
    /// `QuizLoopError::Session` if the question is not graded yet.
    pub async fn advance(&mut self) -> Result<Transition, QuizLoopError> {
        let now = self.clock.now();
        let advance = self.active_session(QuizState::InProgress)?.advance(now)?;
        self.apply_advance(advance).await
    }

    /// Apply a fired auto-advance; stale tickets leave the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::Session` if advancing fails.
    pub async fn auto_advance(&mut self, ticket: AdvanceTicket) -> Result<Transition, QuizLoopError> {
        let now = self.clock.now();
        let advance = match (self.state, self.session.as_mut()) {
            (QuizState::InProgress, Some(session)) => session.advance_if_current(ticket, now)?,
            _ => None,
        };
        match advance {
            Some(advance) => self.apply_advance(advance).await,
            None => Ok(Transition::to(self.state)),
        }
    }

    async fn apply_advance(&mut self, advance: Advance) -> Result<Transition, QuizLoopError> {
        if let Advance::Completed { attempt } = advance {
            if let Some((id, attempt)) = attempt {
                self.subjects = self.recorder.record(&self.subjects, &id, attempt).await;
            }
            self.state = QuizState::Results;
        }
        Ok(Transition::to(self.state))
    }

    /// Re-split the full master list.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::InvalidState` unless results are shown.
    pub fn restart(&mut self) -> Result<Transition, QuizLoopError> {
        self.replace_session(QuizSession::restart)
    }

    /// Quiz again on the questions missed in the last run.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::InvalidState` unless results are shown and
    /// `SessionError::NoMistakes` when nothing was missed.
    pub fn review(&mut self) -> Result<Transition, QuizLoopError> {
        self.replace_session(QuizSession::review)
    }

    /// Continue with the next unseen slice of the master list.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::InvalidState` unless results are shown and
    /// `SessionError::NoNextBatch` when the master list is exhausted.
    pub fn next_batch(&mut self) -> Result<Transition, QuizLoopError> {
        self.replace_session(QuizSession::next_batch)
    }

    fn replace_session(
        &mut self,
        build: impl FnOnce(&QuizSession, &mut BatchPlanner) -> Result<QuizSession, SessionError>,
    ) -> Result<Transition, QuizLoopError> {
        if self.state != QuizState::Results {
            return Err(QuizLoopError::InvalidState {
                state: self.state.name(),
            });
        }
        let current = self.session.as_ref().ok_or(QuizLoopError::InvalidState {
            state: self.state.name(),
        })?;
        let next = build(current, &mut self.planner)?;
        self.session = Some(next);
        self.state = QuizState::InProgress;
        Ok(Transition::to(self.state))
    }

    fn active_session(&mut self, expected: QuizState) -> Result<&mut QuizSession, QuizLoopError> {
        let state = self.state;
        match self.session.as_mut() {
            Some(session) if state == expected => Ok(session),
            _ => Err(QuizLoopError::InvalidState { state: state.name() }),
        }
    }
}

impl std::fmt::Debug for QuizLoopService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizLoopService")
            .field("state", &self.state)
            .field("subjects_len", &self.subjects.len())
            .field("session", &self.session)
            .field("unsaved", &self.pending_text.is_some())
            .finish_non_exhaustive()
    }
}
