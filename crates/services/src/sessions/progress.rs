/// Position within the active batch, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// One-based number of the question on screen.
    pub question_number: usize,
    pub total: usize,
    pub score: u32,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}
