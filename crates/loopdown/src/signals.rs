//! OS signal translation
//!
//! SIGINT, SIGTERM and SIGHUP all become a [`Shutdown`] trigger. Nothing
//! below the binary installs signal handlers.

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, warn};

use loopdown_system::Shutdown;

/// Spawn the listener task; it runs for the life of the process
pub fn listen(shutdown: Shutdown) {
    tokio::spawn(async move {
        let (mut interrupt, mut terminate, mut hangup) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(i), Ok(t), Ok(h)) => (i, t, h),
            _ => {
                warn!("Could not install signal handlers; interruption will not clean up");
                return;
            }
        };

        loop {
            let received = tokio::select! {
                _ = interrupt.recv() => Signal::SIGINT,
                _ = terminate.recv() => Signal::SIGTERM,
                _ = hangup.recv() => Signal::SIGHUP,
            };

            if shutdown.is_triggered() {
                debug!("Ignoring {} while shutting down", received);
                continue;
            }
            warn!("Received {}, stopping", received);
            shutdown.trigger(received as i32);
        }
    });
}

/// Exit status for a run interrupted by `signal`
pub fn exit_status(signal: i32) -> u8 {
    u8::try_from(128 + signal).unwrap_or(u8::MAX)
}
