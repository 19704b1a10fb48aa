//! In-memory leader elector for tests
//!
//! No cross-process coordination; leadership is whatever the test says it
//! is.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::leader::LeaderElector;

/// Leader elector with a fixed, externally controlled answer
#[derive(Debug, Default)]
pub struct StaticLeaderElector {
    leader: AtomicBool,
}

impl StaticLeaderElector {
    pub fn new(leader: bool) -> Self {
        Self {
            leader: AtomicBool::new(leader),
        }
    }

    /// Flips leadership, simulating lease acquisition or loss
    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }
}

impl LeaderElector for StaticLeaderElector {
    fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_elector_flips() {
        let elector = StaticLeaderElector::new(false);
        assert!(!elector.is_leader());

        elector.set_leader(true);
        assert!(elector.is_leader());

        elector.set_leader(false);
        assert!(!elector.is_leader());
    }
}
