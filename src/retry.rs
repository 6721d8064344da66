//! Bounded retry with a fixed delay between attempts.

use crate::error::Result;
use std::time::Duration;

/// Run `operation` up to `attempts` times, sleeping `delay` between failures.
///
/// Intermediate failures are logged; the error of the last attempt is returned.
/// `attempts` of zero is treated as one.
pub fn retry_with_delay<F, T>(
    mut operation: F,
    attempts: u32,
    delay: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(result) => {
                if attempt > 1 {
                    log::info!("{} succeeded after {} attempt(s)", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if attempt >= attempts => {
                log::error!("{} failed after {} attempt(s)", operation_name, attempt);
                return Err(e);
            }
            Err(e) => {
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:.1}s",
                    operation_name,
                    attempt,
                    attempts,
                    e,
                    delay.as_secs_f64()
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
