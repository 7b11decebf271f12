// Group Signaller Port
// Abstraction over OS signal delivery to a whole process group

use std::fmt;
use std::io;

/// Signal sent to a process group when a deadline expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSignal {
    /// Graceful stop (SIGTERM)
    Terminate,
    /// Unconditional kill (SIGKILL)
    Kill,
}

impl fmt::Display for GroupSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSignal::Terminate => write!(f, "SIGTERM"),
            GroupSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Delivers signals to every member of a process group.
///
/// Implementations:
/// - NixGroupSignaller: `kill(-pgid, sig)` on POSIX targets
/// - mocks::ScriptedSignaller: scripted failures for escalation tests
pub trait GroupSignaller: Send + Sync {
    /// Send `signal` to the group led by `pgid`
    ///
    /// # Errors
    /// The OS error from the send. A successful return only means the
    /// signal was dispatched, not that the group has exited.
    fn signal_group(&self, pgid: i32, signal: GroupSignal) -> io::Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Signaller whose sends succeed or fail per signal, recording every call
    #[derive(Clone, Default)]
    pub struct ScriptedSignaller {
        fail_terminate: bool,
        fail_kill: bool,
        calls: Arc<Mutex<Vec<(i32, GroupSignal)>>>,
    }

    impl ScriptedSignaller {
        /// Every send succeeds
        pub fn delivering() -> Self {
            Self::default()
        }

        /// SIGTERM fails, SIGKILL succeeds
        pub fn failing_terminate() -> Self {
            Self {
                fail_terminate: true,
                ..Self::default()
            }
        }

        /// Both sends fail
        pub fn failing_all() -> Self {
            Self {
                fail_terminate: true,
                fail_kill: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<(i32, GroupSignal)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GroupSignaller for ScriptedSignaller {
        fn signal_group(&self, pgid: i32, signal: GroupSignal) -> io::Result<()> {
            self.calls.lock().unwrap().push((pgid, signal));

            let fail = match signal {
                GroupSignal::Terminate => self.fail_terminate,
                GroupSignal::Kill => self.fail_kill,
            };
            if fail {
                Err(io::Error::new(io::ErrorKind::NotFound, "No such process"))
            } else {
                Ok(())
            }
        }
    }
}
