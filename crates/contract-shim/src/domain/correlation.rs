//! # Correlation Keys
//!
//! A request and its reply are matched on the `(channel_id, tx_id)` pair of
//! their envelopes. The pair is kept structured so that no choice of channel
//! and transaction ids can alias another pair.

use shared_types::{short_tx_id, Message};
use std::fmt;

/// Identifies one logical transaction on the stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey {
    /// Channel id.
    pub channel_id: String,
    /// Transaction id.
    pub tx_id: String,
}

impl CorrelationKey {
    /// Build a key from its parts.
    pub fn new(channel_id: impl Into<String>, tx_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            tx_id: tx_id.into(),
        }
    }

    /// The key a message is correlated under.
    #[must_use]
    pub fn of(msg: &Message) -> Self {
        Self::new(msg.channel_id.clone(), msg.tx_id.clone())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.channel_id, short_tx_id(&self.tx_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_point_does_not_alias() {
        // Naive concatenation would map both of these to "abc".
        let a = CorrelationKey::new("ab", "c");
        let b = CorrelationKey::new("a", "bc");
        assert_ne!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_shortens_tx() {
        let key = CorrelationKey::new("ch", "0123456789abcdef");
        assert_eq!(key.to_string(), "[ch]01234567");
    }
}
