//! Restart boundary around one boot of the device program.
//!
//! A boot acquires every handle, starts the controller and runs it. It only
//! ever comes back with a [`Fault`]; what happens then is decided here from
//! the `[device]` configuration.

use crate::config::{DeviceConfig, RestartMode};
use crate::controller::Fault;
use log::{error, info, warn};
use std::convert::Infallible;
use std::thread;
use std::time::{Duration, Instant};

/// Exit code asking the service manager for a fresh process (`EX_TEMPFAIL`).
pub const RESTART_EXIT_CODE: u8 = 75;

/// Run `boot` until the restart policy gives up, then return the last fault.
///
/// With [`RestartMode::Process`] the first fault is returned right away.
/// With [`RestartMode::Reinitialize`] the program is booted again after
/// `restart_delay_ms`, at most `max_reinitializations` consecutive times.
/// A boot that ran for at least `healthy_after` before failing ends the
/// streak, so the count starts over.
pub fn supervise<B>(device: &DeviceConfig, healthy_after: Duration, mut boot: B) -> Fault
where
    B: FnMut() -> Result<Infallible, Fault>,
{
    let delay = Duration::from_millis(device.restart_delay_ms);
    let mut reinitializations = 0u32;

    loop {
        let booted_at = Instant::now();
        let fault = match boot() {
            Ok(never) => match never {},
            Err(fault) => fault,
        };
        let uptime = booted_at.elapsed();
        error!("device program stopped after {:?}: {}", uptime, fault);
        if uptime >= healthy_after {
            reinitializations = 0;
        }

        match device.restart {
            RestartMode::Process => return fault,
            RestartMode::Reinitialize if reinitializations >= device.max_reinitializations => {
                warn!(
                    "still failing after {} reinitializations, escalating to a process restart",
                    reinitializations
                );
                return fault;
            }
            RestartMode::Reinitialize => {
                reinitializations += 1;
                info!(
                    "reinitializing in {}ms ({}/{})",
                    device.restart_delay_ms, reinitializations, device.max_reinitializations
                );
                thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nightscout::FetchError;

    fn device(restart: RestartMode, max_reinitializations: u32) -> DeviceConfig {
        DeviceConfig {
            restart,
            restart_delay_ms: 0,
            max_reinitializations,
        }
    }

    #[test]
    fn test_process_policy_returns_first_fault() {
        let mut boots = 0;
        let fault = supervise(&device(RestartMode::Process, 5), Duration::MAX, || {
            boots += 1;
            Err(Fault::Fetch(FetchError::Status(500)))
        });

        assert_eq!(boots, 1);
        assert!(matches!(fault, Fault::Fetch(FetchError::Status(500))));
    }

    #[test]
    fn test_reinitialize_policy_boots_until_limit() {
        let mut boots = 0u16;
        let fault = supervise(&device(RestartMode::Reinitialize, 2), Duration::MAX, || {
            boots += 1;
            Err(Fault::Fetch(FetchError::Status(500 + boots)))
        });

        // first boot plus two reinitializations
        assert_eq!(boots, 3);
        assert!(matches!(fault, Fault::Fetch(FetchError::Status(503))));
    }

    #[test]
    fn test_zero_reinitializations_behaves_like_process() {
        let mut boots = 0;
        supervise(&device(RestartMode::Reinitialize, 0), Duration::MAX, || {
            boots += 1;
            Err(Fault::ClockNotSet)
        });
        assert_eq!(boots, 1);
    }

    #[test]
    fn test_healthy_boot_restarts_the_count() {
        let mut boots = 0;
        let fault = supervise(
            &device(RestartMode::Reinitialize, 2),
            Duration::from_millis(20),
            || {
                boots += 1;
                // boots 2 and 4 run long enough to count as healthy
                if boots == 2 || boots == 4 {
                    thread::sleep(Duration::from_millis(40));
                }
                Err(Fault::ClockNotSet)
            },
        );

        // 1 fails fast, 2 healthy resets, 3 fast, 4 healthy resets, 5 and 6 fast
        assert_eq!(boots, 6);
        assert!(matches!(fault, Fault::ClockNotSet));
    }

    #[test]
    fn test_fast_faults_still_escalate() {
        let mut boots = 0;
        supervise(
            &device(RestartMode::Reinitialize, 2),
            Duration::from_secs(60),
            || {
                boots += 1;
                Err(Fault::ClockNotSet)
            },
        );
        assert_eq!(boots, 3);
    }
}
