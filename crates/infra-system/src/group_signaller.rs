// Process group signalling via nix (POSIX)
// reason: kill(2) with a negated pid reaches every member of the group

use std::io;

use grace_core::port::{GroupSignal, GroupSignaller};

/// Signals a whole process group with `kill(-pgid, sig)`
#[derive(Debug, Clone, Copy, Default)]
pub struct NixGroupSignaller;

/// pgid 0 would hit our own group and 1 is init
fn check_pgid(pgid: i32) -> io::Result<()> {
    if pgid <= 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to signal process group {}", pgid),
        ));
    }
    Ok(())
}

impl GroupSignaller for NixGroupSignaller {
    fn signal_group(&self, pgid: i32, signal: GroupSignal) -> io::Result<()> {
        check_pgid(pgid)?;

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let sig = match signal {
                GroupSignal::Terminate => Signal::SIGTERM,
                GroupSignal::Kill => Signal::SIGKILL,
            };
            kill(Pid::from_raw(-pgid), sig).map_err(io::Error::from)
        }

        #[cfg(not(unix))]
        {
            // TODO: kill the process tree through a job object on Windows
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot send {} to a process group on this platform", signal),
            ))
        }
    }
}

/// Check whether any member of a process group still exists.
///
/// Zombies count as members until they are reaped.
pub fn group_alive(pgid: i32) -> bool {
    if check_pgid(pgid).is_err() {
        return false;
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // Signal 0 checks existence without delivering anything
        kill(Pid::from_raw(-pgid), None::<Signal>).is_ok()
    }

    #[cfg(not(unix))]
    {
        false
    }
}
