use crate::platform::{ChannelId, UserId};

/// Malformed command arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("`{value}` is not a valid {what}")]
    Invalid { what: &'static str, value: String },
}

/// Splits the text after a command name. Words are whitespace-separated;
/// `rest` hands back whatever is left, verbatim apart from outer whitespace.
pub struct Args<'a> {
    remaining: &'a str,
}

impl<'a> Args<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            remaining: text.trim(),
        }
    }

    pub fn word(&mut self) -> Option<&'a str> {
        if self.remaining.is_empty() {
            return None;
        }
        let end = self
            .remaining
            .find(char::is_whitespace)
            .unwrap_or(self.remaining.len());
        let (word, rest) = self.remaining.split_at(end);
        self.remaining = rest.trim_start();
        Some(word)
    }

    pub fn rest(&mut self) -> Option<&'a str> {
        let rest = std::mem::take(&mut self.remaining).trim();
        (!rest.is_empty()).then_some(rest)
    }

    pub fn required(&mut self, what: &'static str) -> Result<&'a str, ArgError> {
        self.word().ok_or(ArgError::Missing(what))
    }

    pub fn required_rest(&mut self, what: &'static str) -> Result<&'a str, ArgError> {
        self.rest().ok_or(ArgError::Missing(what))
    }

    /// A user given as a mention (`<@id>`, `<@!id>`) or a raw id
    pub fn user(&mut self) -> Result<UserId, ArgError> {
        let word = self.required("user")?;
        parse_user(word).ok_or_else(|| ArgError::Invalid {
            what: "user",
            value: word.to_string(),
        })
    }

    /// A channel given as a mention (`<#id>`) or a raw id
    pub fn channel(&mut self) -> Result<ChannelId, ArgError> {
        let word = self.required("channel id")?;
        let id = word
            .strip_prefix("<#")
            .and_then(|w| w.strip_suffix('>'))
            .unwrap_or(word);
        id.parse().map_err(|_| ArgError::Invalid {
            what: "channel id",
            value: word.to_string(),
        })
    }
}

pub fn parse_user(word: &str) -> Option<UserId> {
    let id = match word.strip_prefix("<@").and_then(|w| w.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => word,
    };
    id.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_keeps_spaces() {
        let mut args = Args::new("  42   hello   there  world ");
        assert_eq!(args.word(), Some("42"));
        assert_eq!(args.rest(), Some("hello   there  world"));
        assert_eq!(args.rest(), None);
    }

    #[test]
    fn test_missing_arguments() {
        let mut args = Args::new("   ");
        assert_eq!(args.required("amount"), Err(ArgError::Missing("amount")));
        assert_eq!(
            args.required_rest("message"),
            Err(ArgError::Missing("message"))
        );
    }

    #[test]
    fn test_user_forms() {
        assert_eq!(parse_user("<@123>"), Some(123));
        assert_eq!(parse_user("<@!456>"), Some(456));
        assert_eq!(parse_user("789"), Some(789));
        assert_eq!(parse_user("@someone"), None);
        assert_eq!(parse_user("<#123>"), None);
    }

    #[test]
    fn test_channel_forms() {
        assert_eq!(Args::new("<#55> hi").channel(), Ok(55));
        assert_eq!(Args::new("55").channel(), Ok(55));
        assert_eq!(
            Args::new("general").channel(),
            Err(ArgError::Invalid {
                what: "channel id",
                value: "general".to_string()
            })
        );
    }
}
