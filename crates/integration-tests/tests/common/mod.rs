//! Shared helpers for process-level tests

#![allow(dead_code)]

use std::time::{Duration, Instant};

/// Generous deadline for commands expected to finish on their own
pub const GENEROUS: Duration = Duration::from_secs(20);

/// True while `pid` exists and is not a zombie
pub fn process_running(pid: i32) -> bool {
    #[cfg(target_os = "linux")]
    {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            // State is the first field after the parenthesised command name
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid), None::<Signal>).is_ok()
    }
}

/// Poll `cond` every 50ms until it holds or `limit` passes
pub async fn eventually(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

/// Read a pid written by a child shell (`echo $! > file`)
pub async fn read_pid_file(path: &std::path::Path) -> i32 {
    let mut text = String::new();
    let found = eventually(Duration::from_secs(5), || {
        text = std::fs::read_to_string(path).unwrap_or_default();
        text.trim().parse::<i32>().is_ok()
    })
    .await;
    assert!(found, "pid file {} never written", path.display());
    text.trim().parse().unwrap()
}
