use std::collections::BTreeSet;

/// The set of channels the client wants to receive
///
/// This is the single source of truth for interest. Transport-level
/// subscribe/unsubscribe messages are derived from it and replayed from
/// [`snapshot`](Self::snapshot) after every successful connection.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    channels: BTreeSet<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `channels` into the registry
    ///
    /// Returns the channels that were not already present.
    pub fn add<I, S>(&mut self, channels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        channels
            .into_iter()
            .map(Into::into)
            .filter(|channel| self.channels.insert(channel.clone()))
            .collect()
    }

    /// Remove `channels` from the registry; non-members are ignored
    ///
    /// Returns the channels that were actually removed.
    pub fn remove<I, S>(&mut self, channels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        channels
            .into_iter()
            .map(Into::into)
            .filter(|channel| self.channels.remove(channel))
            .collect()
    }

    /// Current full set, sorted
    pub fn snapshot(&self) -> Vec<String> {
        self.channels.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
