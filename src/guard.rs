//! Request tokens that keep late responses from touching the wrong view.
//!
//! Every request is tagged with a serial number and the target it was issued
//! for. When the response comes back, [`RequestTracker::complete`] tells the
//! caller whether that request is still the newest one for its target. The
//! session additionally compares the target against whatever the user is
//! looking at before it applies anything to visible state.

use std::collections::HashMap;

/// What a request was issued on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestTarget {
    /// A conversation that does not have a server id yet.
    NewConversation,
    Conversation(String),
    ConversationList,
    Deletion(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    serial: u64,
    target: RequestTarget,
}

impl RequestToken {
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn target(&self) -> &RequestTarget {
        &self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Newest request for its target.
    Latest,
    /// A newer request for the same target was issued afterwards.
    Superseded,
    /// The target was retired while the request was in flight.
    Retired,
}

#[derive(Debug, Default)]
pub struct RequestTracker {
    next_serial: u64,
    latest: HashMap<RequestTarget, u64>,
    in_flight: HashMap<u64, RequestTarget>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, target: RequestTarget) -> RequestToken {
        self.next_serial += 1;
        let serial = self.next_serial;
        self.latest.insert(target.clone(), serial);
        self.in_flight.insert(serial, target.clone());
        RequestToken { serial, target }
    }

    /// Record that the request behind `token` finished.
    pub fn complete(&mut self, token: &RequestToken) -> Freshness {
        self.in_flight.remove(&token.serial);
        let freshness = match self.latest.get(&token.target) {
            Some(&serial) if serial == token.serial => Freshness::Latest,
            Some(_) => Freshness::Superseded,
            None => Freshness::Retired,
        };
        // Older requests for the target still need the entry to report
        // Superseded, so it only goes once the target is idle.
        if !self.is_pending(&token.target) {
            self.latest.remove(&token.target);
        }
        freshness
    }

    /// Forget every outstanding request for `target`. Their responses will
    /// complete as [`Freshness::Retired`].
    pub fn retire(&mut self, target: &RequestTarget) {
        self.latest.remove(target);
        self.in_flight.retain(|_, pending| pending != target);
    }

    /// Whether a request for `target` is still outstanding.
    pub fn is_pending(&self, target: &RequestTarget) -> bool {
        self.in_flight.values().any(|pending| pending == target)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(id: &str) -> RequestTarget {
        RequestTarget::Conversation(id.to_string())
    }

    #[test]
    fn serials_increase_monotonically() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue(conversation("a"));
        let second = tracker.issue(conversation("b"));
        assert!(second.serial() > first.serial());
    }

    #[test]
    fn latest_request_completes_fresh() {
        let mut tracker = RequestTracker::new();
        let token = tracker.issue(conversation("a"));
        assert!(tracker.is_pending(&conversation("a")));
        assert_eq!(tracker.complete(&token), Freshness::Latest);
        assert!(!tracker.is_pending(&conversation("a")));
    }

    #[test]
    fn newer_request_supersedes_older() {
        let mut tracker = RequestTracker::new();
        let old = tracker.issue(conversation("a"));
        let new = tracker.issue(conversation("a"));
        assert_eq!(tracker.complete(&old), Freshness::Superseded);
        assert!(tracker.is_pending(&conversation("a")));
        assert_eq!(tracker.complete(&new), Freshness::Latest);
    }

    #[test]
    fn retired_targets_stop_showing_as_pending() {
        let mut tracker = RequestTracker::new();
        let token = tracker.issue(RequestTarget::NewConversation);
        tracker.retire(&RequestTarget::NewConversation);
        assert!(!tracker.is_pending(&RequestTarget::NewConversation));
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.complete(&token), Freshness::Retired);
    }

    #[test]
    fn idle_targets_are_forgotten() {
        let mut tracker = RequestTracker::new();
        for id in ["a", "b", "c"] {
            let token = tracker.issue(conversation(id));
            assert_eq!(tracker.complete(&token), Freshness::Latest);
        }
        assert!(tracker.latest.is_empty());
    }

    #[test]
    fn older_request_finishing_last_is_still_superseded() {
        let mut tracker = RequestTracker::new();
        let old = tracker.issue(conversation("a"));
        let new = tracker.issue(conversation("a"));
        assert_eq!(tracker.complete(&new), Freshness::Latest);
        assert_eq!(tracker.complete(&old), Freshness::Superseded);
        assert!(tracker.latest.is_empty());
    }

    #[test]
    fn targets_are_tracked_independently() {
        let mut tracker = RequestTracker::new();
        let a = tracker.issue(conversation("a"));
        let _b = tracker.issue(conversation("b"));
        tracker.retire(&conversation("b"));
        assert_eq!(tracker.complete(&a), Freshness::Latest);
    }
}
