/// Result of advancing the animator by one timer tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingStep {
    /// One more character is visible
    Revealed,
    /// Every character was already visible; carries the full text
    Finished(String),
    /// The animator was stopped or has already finished
    Idle,
}

/// Reveals a fixed string one character per tick.
///
/// The animator only tracks how much of the text is visible. Driving it on a
/// timer is the controller's job.
#[derive(Debug, Clone)]
pub struct TypingAnimator {
    full_text: String,
    revealed: usize,     // chars
    revealed_end: usize, // byte offset of the visible prefix
    active: bool,
}

impl TypingAnimator {
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            revealed: 0,
            revealed_end: 0,
            active: true,
        }
    }

    pub fn tick(&mut self) -> TypingStep {
        if !self.active {
            return TypingStep::Idle;
        }

        match self.full_text[self.revealed_end..].chars().next() {
            Some(c) => {
                self.revealed += 1;
                self.revealed_end += c.len_utf8();
                TypingStep::Revealed
            }
            None => {
                self.active = false;
                TypingStep::Finished(self.full_text.clone())
            }
        }
    }

    /// Halt without clearing, returning what has been revealed so far
    pub fn stop(&mut self) -> String {
        self.active = false;
        self.partial().to_string()
    }

    pub fn partial(&self) -> &str {
        &self.full_text[..self.revealed_end]
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn revealed_chars(&self) -> usize {
        self.revealed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
