use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use quiz_core::model::{Question, QuizAttempt, Selection, SubjectId};

use super::plan::BatchPlanner;
use super::progress::SessionProgress;
use super::view::ResultSummary;
use crate::error::SessionError;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

//
// ─── LINEAGE ───────────────────────────────────────────────────────────────────
//

/// Who owns the master list a session was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizTarget {
    /// A saved subject; completed batches are recorded in its history.
    Subject(SubjectId),
    /// Freshly pasted text that has not been saved.
    AdHoc,
}

/// Whether the run is a batch of the master list or a review of missed questions.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionKind {
    Batch,
    Review { missed: Vec<Question> },
}

#[derive(Debug, Clone, PartialEq)]
struct Lineage {
    target: QuizTarget,
    master: Vec<Question>,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Identifies the question an automatic advance was scheduled for.
///
/// Firing a ticket against a different session or question is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceTicket {
    session_id: u64,
    question_index: usize,
}

/// What the learner has to do after a graded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Correct: the session moves on by itself once the ticket fires.
    AutoAdvance(AdvanceTicket),
    /// Incorrect: the learner reads the explanation and acknowledges.
    AwaitAcknowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub correct: bool,
    pub next: NextStep,
}

/// The graded answer for the question on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub selection: Selection,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next,
    /// The batch is finished. `attempt` is set only for subject-backed batches.
    Completed {
        attempt: Option<(SubjectId, QuizAttempt)>,
    },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz run over a shuffled, bounded batch.
///
/// Invariant once complete: `score + wrong_list().len() == active_batch().len()`.
pub struct QuizSession {
    id: u64,
    lineage: Lineage,
    kind: SessionKind,
    remaining: Vec<Question>,
    batch: Vec<Question>,
    current: usize,
    score: u32,
    wrong: Vec<Question>,
    graded: Option<GradedAnswer>,
    complete: bool,
}

impl QuizSession {
    /// Starts the first batch of a master list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `master` has no questions.
    pub fn start(
        target: QuizTarget,
        master: Vec<Question>,
        planner: &mut BatchPlanner,
    ) -> Result<Self, SessionError> {
        let pool = master.clone();
        Self::start_from_pool(Lineage { target, master }, pool, planner)
    }

    fn start_from_pool(
        lineage: Lineage,
        pool: Vec<Question>,
        planner: &mut BatchPlanner,
    ) -> Result<Self, SessionError> {
        if pool.is_empty() {
            return Err(SessionError::Empty);
        }
        let split = planner.plan(pool);
        Ok(Self::fresh(lineage, SessionKind::Batch, split.batch, split.remainder))
    }

    fn fresh(
        lineage: Lineage,
        kind: SessionKind,
        batch: Vec<Question>,
        remaining: Vec<Question>,
    ) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            lineage,
            kind,
            remaining,
            batch,
            current: 0,
            score: 0,
            wrong: Vec::new(),
            graded: None,
            complete: false,
        }
    }

    /// Starts a session over the questions this lineage has not drawn yet.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` before completion and
    /// `SessionError::NoNextBatch` when the remaining queue is empty.
    pub fn next_batch(&self, planner: &mut BatchPlanner) -> Result<Self, SessionError> {
        if !self.complete {
            return Err(SessionError::NotFinished);
        }
        if self.remaining.is_empty() {
            return Err(SessionError::NoNextBatch);
        }
        Self::start_from_pool(self.lineage.clone(), self.remaining.clone(), planner)
    }

    /// Re-splits the full master list, discarding progress through it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the master list is empty.
    pub fn restart(&self, planner: &mut BatchPlanner) -> Result<Self, SessionError> {
        Self::start_from_pool(self.lineage.clone(), self.lineage.master.clone(), planner)
    }

    /// Starts a review run over exactly the questions missed in this run.
    ///
    /// The remaining queue is carried over untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` before completion and
    /// `SessionError::NoMistakes` when nothing was missed.
    pub fn review(&self, planner: &mut BatchPlanner) -> Result<Self, SessionError> {
        if !self.complete {
            return Err(SessionError::NotFinished);
        }
        if self.wrong.is_empty() {
            return Err(SessionError::NoMistakes);
        }
        let batch = planner.shuffled(&self.wrong);
        Ok(Self::fresh(
            self.lineage.clone(),
            SessionKind::Review {
                missed: self.wrong.clone(),
            },
            batch,
            self.remaining.clone(),
        ))
    }

    /// Grades the selection against the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the last question,
    /// `SessionError::NoSelection` for an empty selection and
    /// `SessionError::AlreadyAnswered` if this question was graded already.
    pub fn submit_answer(&mut self, selection: Selection) -> Result<Submission, SessionError> {
        if self.complete {
            return Err(SessionError::Completed);
        }
        if selection.is_empty() {
            return Err(SessionError::NoSelection);
        }
        if self.graded.is_some() {
            return Err(SessionError::AlreadyAnswered);
        }
        let question = self.batch.get(self.current).ok_or(SessionError::Completed)?;

        let correct = question.grade(&selection);
        let next = if correct {
            self.score += 1;
            NextStep::AutoAdvance(AdvanceTicket {
                session_id: self.id,
                question_index: self.current,
            })
        } else {
            self.wrong.push(question.clone());
            NextStep::AwaitAcknowledge
        };
        self.graded = Some(GradedAnswer { selection, correct });

        Ok(Submission { correct, next })
    }

    /// Moves to the next question, or completes the session after the last one.
    ///
    /// `now` dates the attempt produced for subject-backed batches.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if already complete and
    /// `SessionError::NotAnswered` if the current question has not been graded.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        if self.complete {
            return Err(SessionError::Completed);
        }
        if self.graded.is_none() {
            return Err(SessionError::NotAnswered);
        }

        if self.current + 1 < self.batch.len() {
            self.current += 1;
            self.graded = None;
            return Ok(Advance::Next);
        }

        self.complete = true;
        let attempt = match (&self.lineage.target, &self.kind) {
            (QuizTarget::Subject(id), SessionKind::Batch) => {
                let total = u32::try_from(self.batch.len()).unwrap_or(u32::MAX);
                Some((id.clone(), QuizAttempt::new(now, self.score, total)?))
            }
            _ => None,
        };
        log::info!(
            "session {} complete: {}/{}",
            self.id,
            self.score,
            self.batch.len()
        );
        Ok(Advance::Completed { attempt })
    }

    /// Advances only if `ticket` still refers to the question on screen.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`QuizSession::advance`].
    pub fn advance_if_current(
        &mut self,
        ticket: AdvanceTicket,
        now: DateTime<Utc>,
    ) -> Result<Option<Advance>, SessionError> {
        if !self.is_current(ticket) {
            log::debug!("ignoring stale auto-advance {ticket:?} for session {}", self.id);
            return Ok(None);
        }
        self.advance(now).map(Some)
    }

    /// True while `ticket` points at the graded question on screen.
    #[must_use]
    pub fn is_current(&self, ticket: AdvanceTicket) -> bool {
        ticket.session_id == self.id
            && ticket.question_index == self.current
            && !self.complete
            && self.graded.is_some()
    }

    /// Ties this lineage to a saved subject so later batches record attempts.
    pub fn retarget(&mut self, id: SubjectId) {
        self.lineage.target = QuizTarget::Subject(id);
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn target(&self) -> &QuizTarget {
        &self.lineage.target
    }

    #[must_use]
    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    #[must_use]
    pub fn is_review(&self) -> bool {
        matches!(self.kind, SessionKind::Review { .. })
    }

    /// The list this run was drawn from: the full master list, or the missed
    /// questions for a review.
    #[must_use]
    pub fn master_list(&self) -> &[Question] {
        match &self.kind {
            SessionKind::Batch => &self.lineage.master,
            SessionKind::Review { missed } => missed,
        }
    }

    /// Full master list of the lineage, regardless of kind.
    #[must_use]
    pub fn lineage_master(&self) -> &[Question] {
        &self.lineage.master
    }

    #[must_use]
    pub fn remaining_queue(&self) -> &[Question] {
        &self.remaining
    }

    #[must_use]
    pub fn active_batch(&self) -> &[Question] {
        &self.batch
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.complete {
            None
        } else {
            self.batch.get(self.current)
        }
    }

    #[must_use]
    pub fn graded_answer(&self) -> Option<&GradedAnswer> {
        self.graded.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn wrong_list(&self) -> &[Question] {
        &self.wrong
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = if self.complete {
            self.batch.len()
        } else {
            self.current + usize::from(self.graded.is_some())
        };
        SessionProgress {
            question_number: (self.current + 1).min(self.batch.len()),
            total: self.batch.len(),
            score: self.score,
            answered,
            remaining: self.batch.len() - answered,
            is_complete: self.complete,
        }
    }

    /// Results projection; `None` until the session is complete.
    #[must_use]
    pub fn summary(&self) -> Option<ResultSummary> {
        if !self.complete {
            return None;
        }
        let total = u32::try_from(self.batch.len()).unwrap_or(u32::MAX);
        Some(ResultSummary::new(
            self.score,
            total,
            !self.wrong.is_empty(),
            !self.remaining.is_empty(),
        ))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("target", &self.lineage.target)
            .field("review", &self.is_review())
            .field("batch_len", &self.batch.len())
            .field("remaining_len", &self.remaining.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("wrong_len", &self.wrong.len())
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::plan::tests::numbered;
    use crate::sessions::plan::{BatchSize, IdentityShuffler};
    use quiz_core::time::fixed_now;

    fn planner(size: usize) -> BatchPlanner {
        BatchPlanner::new(BatchSize::new(size).unwrap()).with_shuffler(Box::new(IdentityShuffler))
    }

    fn right(q: &Question) -> Selection {
        q.answer().iter().cloned().collect()
    }

    fn wrong(q: &Question) -> Selection {
        q.options()
            .iter()
            .filter(|o| !q.answer().contains(*o))
            .cloned()
            .collect()
    }

    /// Answers every question, missing those whose index is in `miss`.
    fn play(session: &mut QuizSession, miss: &[usize]) -> Advance {
        loop {
            let idx = session.current_index();
            let q = session.current_question().unwrap().clone();
            let selection = if miss.contains(&idx) { wrong(&q) } else { right(&q) };
            session.submit_answer(selection).unwrap();
            match session.advance(fixed_now()).unwrap() {
                Advance::Next => {}
                done @ Advance::Completed { .. } => return done,
            }
        }
    }

    fn subject_id() -> SubjectId {
        "subject-1".parse().unwrap()
    }

    #[test]
    fn empty_master_list_is_rejected() {
        let err = QuizSession::start(QuizTarget::AdHoc, Vec::new(), &mut planner(20)).unwrap_err();
        assert_eq!(err, SessionError::Empty);
    }

    #[test]
    fn start_takes_first_batch_and_keeps_remainder() {
        let session = QuizSession::start(QuizTarget::AdHoc, numbered(45), &mut planner(20)).unwrap();
        assert_eq!(session.active_batch().len(), 20);
        assert_eq!(session.remaining_queue().len(), 25);
        assert_eq!(session.master_list().len(), 45);
        assert_eq!(session.score(), 0);
        assert!(session.wrong_list().is_empty());
    }

    #[test]
    fn correct_answer_scores_and_schedules_auto_advance() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(2), &mut planner(20)).unwrap();
        let q = session.current_question().unwrap().clone();

        let submission = session.submit_answer(right(&q)).unwrap();

        assert!(submission.correct);
        let NextStep::AutoAdvance(ticket) = submission.next else {
            panic!("expected auto advance");
        };
        assert!(session.is_current(ticket));
        assert_eq!(session.score(), 1);
        assert!(session.wrong_list().is_empty());
    }

    #[test]
    fn wrong_answer_waits_for_acknowledgement() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(2), &mut planner(20)).unwrap();
        let q = session.current_question().unwrap().clone();

        let submission = session.submit_answer(wrong(&q)).unwrap();

        assert!(!submission.correct);
        assert_eq!(submission.next, NextStep::AwaitAcknowledge);
        assert_eq!(session.wrong_list(), &[q]);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn questions_are_graded_once() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(2), &mut planner(20)).unwrap();
        let q = session.current_question().unwrap().clone();
        session.submit_answer(wrong(&q)).unwrap();

        let err = session.submit_answer(right(&q)).unwrap_err();

        assert_eq!(err, SessionError::AlreadyAnswered);
        assert_eq!(session.score(), 0);
        assert_eq!(session.wrong_list().len(), 1);
        assert!(!session.graded_answer().unwrap().correct);
    }

    #[test]
    fn empty_selection_and_early_advance_are_rejected() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(2), &mut planner(20)).unwrap();
        assert_eq!(
            session.submit_answer(Selection::new()).unwrap_err(),
            SessionError::NoSelection
        );
        assert_eq!(
            session.advance(fixed_now()).unwrap_err(),
            SessionError::NotAnswered
        );
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn completion_produces_attempt_for_subject_batches() {
        let target = QuizTarget::Subject(subject_id());
        let mut session = QuizSession::start(target, numbered(4), &mut planner(20)).unwrap();

        let done = play(&mut session, &[1, 3]);

        let expected = QuizAttempt::new(fixed_now(), 2, 4).unwrap();
        assert_eq!(
            done,
            Advance::Completed {
                attempt: Some((subject_id(), expected))
            }
        );
        assert!(session.is_complete());
        assert_eq!(
            session.score() as usize + session.wrong_list().len(),
            session.active_batch().len()
        );
        assert!(session.current_question().is_none());
        assert_eq!(
            session.submit_answer(["x"].into_iter().collect()).unwrap_err(),
            SessionError::Completed
        );
    }

    #[test]
    fn ad_hoc_sessions_produce_no_attempt() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(2), &mut planner(20)).unwrap();
        assert_eq!(play(&mut session, &[]), Advance::Completed { attempt: None });
    }

    #[test]
    fn wrong_list_never_contains_correct_answers() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(6), &mut planner(20)).unwrap();
        play(&mut session, &[0, 2, 5]);
        let missed: Vec<_> = session.wrong_list().iter().map(Question::text).collect();
        assert_eq!(missed, vec!["Q0", "Q2", "Q5"]);
    }

    #[test]
    fn review_runs_exactly_the_missed_questions() {
        let target = QuizTarget::Subject(subject_id());
        let mut session = QuizSession::start(target, numbered(5), &mut planner(3)).unwrap();
        play(&mut session, &[0, 2]);

        let mut review = session.review(&mut planner(3)).unwrap();

        assert!(review.is_review());
        assert_eq!(review.master_list(), session.wrong_list());
        assert_eq!(review.active_batch(), session.wrong_list());
        assert_eq!(review.remaining_queue(), session.remaining_queue());
        assert_eq!(play(&mut review, &[]), Advance::Completed { attempt: None });
    }

    #[test]
    fn review_requires_a_finished_run_with_mistakes() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(2), &mut planner(20)).unwrap();
        assert_eq!(
            session.review(&mut planner(20)).unwrap_err(),
            SessionError::NotFinished
        );
        play(&mut session, &[]);
        assert_eq!(
            session.review(&mut planner(20)).unwrap_err(),
            SessionError::NoMistakes
        );
    }

    #[test]
    fn next_batch_consumes_the_remainder() {
        let mut planner = planner(20);
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(45), &mut planner).unwrap();
        let mut sizes = vec![session.active_batch().len()];

        loop {
            play(&mut session, &[]);
            match session.next_batch(&mut planner) {
                Ok(next) => {
                    sizes.push(next.active_batch().len());
                    session = next;
                }
                Err(err) => {
                    assert_eq!(err, SessionError::NoNextBatch);
                    break;
                }
            }
        }

        assert_eq!(sizes, vec![20, 20, 5]);
    }

    #[test]
    fn review_then_next_batch_continues_lineage() {
        let mut planner = planner(2);
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(5), &mut planner).unwrap();
        play(&mut session, &[0]);
        let mut review = session.review(&mut planner).unwrap();
        play(&mut review, &[]);

        let next = review.next_batch(&mut planner).unwrap();
        let texts: Vec<_> = next.active_batch().iter().map(Question::text).collect();
        assert_eq!(texts, vec!["Q2", "Q3"]);
        assert!(!next.is_review());
        assert_eq!(next.master_list().len(), 5);

        let restarted = review.restart(&mut planner).unwrap();
        assert_eq!(restarted.active_batch()[0].text(), "Q0");
        assert_eq!(restarted.remaining_queue().len(), 3);
    }

    #[test]
    fn stale_tickets_are_ignored() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(3), &mut planner(20)).unwrap();
        let q = session.current_question().unwrap().clone();
        let NextStep::AutoAdvance(ticket) = session.submit_answer(right(&q)).unwrap().next else {
            panic!("expected auto advance");
        };

        session.advance(fixed_now()).unwrap();
        assert_eq!(session.current_index(), 1);

        assert_eq!(session.advance_if_current(ticket, fixed_now()).unwrap(), None);
        assert_eq!(session.current_index(), 1);

        let other = QuizSession::start(QuizTarget::AdHoc, numbered(3), &mut planner(20)).unwrap();
        assert!(!other.is_current(ticket));
    }

    #[test]
    fn current_ticket_advances() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(3), &mut planner(20)).unwrap();
        let q = session.current_question().unwrap().clone();
        let NextStep::AutoAdvance(ticket) = session.submit_answer(right(&q)).unwrap().next else {
            panic!("expected auto advance");
        };

        assert_eq!(
            session.advance_if_current(ticket, fixed_now()).unwrap(),
            Some(Advance::Next)
        );
    }

    #[test]
    fn retargeted_ad_hoc_lineage_records_attempts() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(1), &mut planner(20)).unwrap();
        session.retarget(subject_id());
        let Advance::Completed { attempt } = play(&mut session, &[]) else {
            panic!("expected completion");
        };
        assert_eq!(attempt.unwrap().0, subject_id());
    }

    #[test]
    fn progress_and_summary_track_the_run() {
        let mut session = QuizSession::start(QuizTarget::AdHoc, numbered(3), &mut planner(2)).unwrap();
        assert_eq!(session.progress().question_number, 1);
        assert_eq!(session.progress().total, 2);
        assert!(session.summary().is_none());

        play(&mut session, &[1]);

        let progress = session.progress();
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.remaining, 0);
        let summary = session.summary().unwrap();
        assert_eq!(summary.score, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.percentage, 50);
        assert!(summary.has_wrong_answers);
        assert!(summary.has_next_batch);
    }
}
