//! Delayed, cancelable auto-advance after a correct answer.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::service::AdvanceTicket;

/// Delay before moving past a correctly answered question.
pub const DEFAULT_AUTO_ADVANCE: Duration = Duration::from_millis(2500);

/// Schedules auto-advance tickets on the tokio runtime.
#[derive(Debug, Clone, Copy)]
pub struct AutoAdvanceTimer {
    delay: Duration,
}

impl Default for AutoAdvanceTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_ADVANCE)
    }
}

impl AutoAdvanceTimer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Starts the countdown for `ticket`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn schedule(&self, ticket: AdvanceTicket) -> ScheduledAdvance {
        let (tx, rx) = oneshot::channel();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ticket);
        });
        ScheduledAdvance { rx, handle }
    }
}

/// A pending auto-advance. Dropping it cancels the countdown.
#[derive(Debug)]
pub struct ScheduledAdvance {
    rx: oneshot::Receiver<AdvanceTicket>,
    handle: JoinHandle<()>,
}

impl ScheduledAdvance {
    /// Waits for the delay to elapse. Returns `None` if the countdown was cancelled.
    pub async fn fired(&mut self) -> Option<AdvanceTicket> {
        (&mut self.rx).await.ok()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledAdvance {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::plan::tests::numbered;
    use crate::sessions::plan::{BatchPlanner, BatchSize, IdentityShuffler};
    use crate::sessions::service::{NextStep, QuizSession, QuizTarget};
    use quiz_core::time::fixed_now;

    fn ticket_for_first_question(session: &mut QuizSession) -> AdvanceTicket {
        let q = session.current_question().unwrap().clone();
        let selection = q.answer().iter().cloned().collect();
        match session.submit_answer(selection).unwrap().next {
            NextStep::AutoAdvance(ticket) => ticket,
            NextStep::AwaitAcknowledge => panic!("expected auto advance"),
        }
    }

    fn session() -> QuizSession {
        let mut planner = BatchPlanner::new(BatchSize::new(5).unwrap())
            .with_shuffler(Box::new(IdentityShuffler));
        QuizSession::start(QuizTarget::AdHoc, numbered(3), &mut planner).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_delay() {
        let mut session = session();
        let ticket = ticket_for_first_question(&mut session);
        let timer = AutoAdvanceTimer::default();

        let mut scheduled = timer.schedule(ticket);
        let fired = scheduled.fired().await.unwrap();

        assert_eq!(fired, ticket);
        session.advance_if_current(fired, fixed_now()).unwrap();
        assert_eq!(session.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_early() {
        let mut session = session();
        let ticket = ticket_for_first_question(&mut session);
        let mut scheduled = AutoAdvanceTimer::new(Duration::from_secs(10)).schedule(ticket);

        let early = tokio::time::timeout(Duration::from_secs(5), scheduled.fired()).await;
        assert!(early.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_countdown_never_fires() {
        let mut session = session();
        let ticket = ticket_for_first_question(&mut session);
        let mut scheduled = AutoAdvanceTimer::default().schedule(ticket);

        scheduled.cancel();

        assert_eq!(scheduled.fired().await, None);
        assert_eq!(session.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_firing_after_manual_advance_is_a_no_op() {
        let mut session = session();
        let ticket = ticket_for_first_question(&mut session);
        let mut scheduled = AutoAdvanceTimer::default().schedule(ticket);

        session.advance(fixed_now()).unwrap();
        let fired = scheduled.fired().await.unwrap();

        assert_eq!(session.advance_if_current(fired, fixed_now()).unwrap(), None);
        assert_eq!(session.current_index(), 1);
    }
}
