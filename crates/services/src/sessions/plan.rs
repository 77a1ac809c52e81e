use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::num::NonZeroUsize;

use quiz_core::model::Question;

/// Questions per batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Upper bound on the number of questions in one quiz run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    /// Returns `None` for zero.
    #[must_use]
    pub fn new(size: usize) -> Option<Self> {
        NonZeroUsize::new(size).map(Self)
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Result of splitting a pool into the next batch and what is left over.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSplit {
    pub batch: Vec<Question>,
    pub remainder: Vec<Question>,
}

/// Takes the first `size` questions of `pool` as the batch; the rest stay in order.
#[must_use]
pub fn next_batch(mut pool: Vec<Question>, size: BatchSize) -> BatchSplit {
    let remainder = if pool.len() > size.get() {
        pool.split_off(size.get())
    } else {
        Vec::new()
    };
    BatchSplit {
        batch: pool,
        remainder,
    }
}

/// Source of question order for a new batch or review set.
pub trait Shuffler: Send {
    fn shuffle(&mut self, questions: &mut [Question]);
}

/// Shuffles with the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShuffler;

impl Shuffler for RandomShuffler {
    fn shuffle(&mut self, questions: &mut [Question]) {
        questions.shuffle(&mut rand::rng());
    }
}

/// Reproducible shuffling from a fixed seed.
#[derive(Debug, Clone)]
pub struct SeededShuffler(StdRng);

impl SeededShuffler {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Shuffler for SeededShuffler {
    fn shuffle(&mut self, questions: &mut [Question]) {
        questions.shuffle(&mut self.0);
    }
}

/// Leaves questions in their given order.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityShuffler;

impl Shuffler for IdentityShuffler {
    fn shuffle(&mut self, _questions: &mut [Question]) {}
}

/// Splits pools into batches and shuffles each batch before it is presented.
pub struct BatchPlanner {
    size: BatchSize,
    shuffler: Box<dyn Shuffler>,
}

impl BatchPlanner {
    #[must_use]
    pub fn new(size: BatchSize) -> Self {
        Self {
            size,
            shuffler: Box::new(RandomShuffler),
        }
    }

    #[must_use]
    pub fn with_shuffler(mut self, shuffler: Box<dyn Shuffler>) -> Self {
        self.shuffler = shuffler;
        self
    }

    /// Splits `pool` and returns the shuffled batch with the untouched remainder.
    pub fn plan(&mut self, pool: Vec<Question>) -> BatchSplit {
        let mut split = next_batch(pool, self.size);
        self.shuffler.shuffle(&mut split.batch);
        split
    }

    /// Shuffled copy of `questions`, used for review sets.
    pub fn shuffled(&mut self, questions: &[Question]) -> Vec<Question> {
        let mut questions = questions.to_vec();
        self.shuffler.shuffle(&mut questions);
        questions
    }
}

impl std::fmt::Debug for BatchPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPlanner")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
