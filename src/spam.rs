use std::collections::HashMap;

use crate::platform::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    Duplicate,
}

/// Remembers the last message each user sent so immediate repeats can be
/// removed. Entries live for the whole process.
#[derive(Debug, Default)]
pub struct SpamGuard {
    last_messages: HashMap<UserId, String>,
}

impl SpamGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `text` with the user's previous message. A duplicate leaves the
    /// stored text untouched; anything else replaces it. Empty text never
    /// counts as a repeat.
    pub fn observe(&mut self, user: UserId, text: &str) -> Verdict {
        match self.last_messages.get(&user) {
            Some(last) if !last.is_empty() && last == text => Verdict::Duplicate,
            _ => {
                self.last_messages.insert(user, text.to_string());
                Verdict::New
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_is_duplicate() {
        let mut guard = SpamGuard::new();
        assert_eq!(guard.observe(7, "hello"), Verdict::New);
        assert_eq!(guard.observe(7, "hello"), Verdict::Duplicate);
        assert_eq!(guard.observe(7, "hello"), Verdict::Duplicate);
    }

    #[test]
    fn test_only_previous_message_is_remembered() {
        let mut guard = SpamGuard::new();
        assert_eq!(guard.observe(7, "a"), Verdict::New);
        assert_eq!(guard.observe(7, "b"), Verdict::New);
        assert_eq!(guard.observe(7, "a"), Verdict::New);
    }

    #[test]
    fn test_users_are_tracked_separately() {
        let mut guard = SpamGuard::new();
        assert_eq!(guard.observe(1, "gm"), Verdict::New);
        assert_eq!(guard.observe(2, "gm"), Verdict::New);
        assert_eq!(guard.observe(1, "gm"), Verdict::Duplicate);
    }

    #[test]
    fn test_empty_messages_never_duplicate() {
        let mut guard = SpamGuard::new();
        assert_eq!(guard.observe(1, ""), Verdict::New);
        assert_eq!(guard.observe(1, ""), Verdict::New);
    }
}
