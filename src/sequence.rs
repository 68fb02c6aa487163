use std::collections::HashMap;

/// Orders responses per target key by the time their request was issued.
///
/// A ticket is taken when a request goes out; the response may only be
/// applied if no response to a later request for the same key has been
/// applied already.
#[derive(Debug, Default, Clone)]
pub struct Sequencer {
    next: u64,
    applied: HashMap<String, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Apply,
    /// Carries the ticket already applied for this key.
    Stale(u64),
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Record `ticket` as applied for `key` when it is the newest seen.
    pub fn admit(&mut self, key: &str, ticket: u64) -> Admission {
        match self.applied.get(key) {
            Some(&last) if last > ticket => Admission::Stale(last),
            _ => {
                self.applied.insert(key.to_string(), ticket);
                Admission::Apply
            }
        }
    }

    pub fn last_applied(&self, key: &str) -> Option<u64> {
        self.applied.get(key).copied()
    }
}
