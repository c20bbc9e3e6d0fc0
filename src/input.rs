//! Draft text being composed before it is sent

/// Draft input, fed by typed text and speech transcripts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    draft: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_empty(&self) -> bool {
        self.draft.trim().is_empty()
    }

    /// Append typed text to the draft
    pub fn push_text(&mut self, text: &str) {
        self.merge(text);
    }

    /// Merge a speech recognition result into the draft.
    ///
    /// Recognizers report alternatives best-first; only the first one is
    /// consumed. Returns whether the draft changed.
    pub fn append_transcript<I>(&mut self, alternatives: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        match alternatives.into_iter().next() {
            Some(best) => {
                let before = self.draft.len();
                self.merge(best.as_ref());
                self.draft.len() != before
            }
            None => false,
        }
    }

    /// Take the trimmed draft, leaving the buffer empty
    pub fn take(&mut self) -> String {
        let text = self.draft.trim().to_string();
        self.draft.clear();
        text
    }

    fn merge(&mut self, addition: &str) {
        let merged = format!("{} {}", self.draft, addition);
        self.draft = merged.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_transcript_appends_first_alternative_only() {
        let mut input = InputBuffer::new();
        input.push_text("Explain");

        assert!(input.append_transcript(["borrow checking", "borrowed checking"]));
        assert_eq!(input.draft(), "Explain borrow checking");
    }

    #[test]
    fn test_transcript_into_empty_draft_has_no_leading_space() {
        let mut input = InputBuffer::new();
        input.append_transcript(vec!["hello world".to_string()]);
        assert_eq!(input.draft(), "hello world");
    }

    #[test]
    fn test_empty_transcript_leaves_draft_unchanged() {
        let mut input = InputBuffer::new();
        input.push_text("keep");
        assert!(!input.append_transcript(Vec::<String>::new()));
        assert_eq!(input.draft(), "keep");
    }

    #[test]
    fn test_transcript_alternatives_are_consumed_lazily() {
        let pulled = Cell::new(0);
        let alternatives = ["first", "second", "third"].into_iter().inspect(|_| {
            pulled.set(pulled.get() + 1);
        });

        let mut input = InputBuffer::new();
        input.append_transcript(alternatives);

        assert_eq!(pulled.get(), 1);
        assert_eq!(input.draft(), "first");
    }

    #[test]
    fn test_take_returns_trimmed_and_clears() {
        let mut input = InputBuffer::new();
        input.push_text("  spaced out  ");
        assert!(!input.is_empty());
        assert_eq!(input.take(), "spaced out");
        assert!(input.is_empty());
        assert_eq!(input.take(), "");
    }
}
