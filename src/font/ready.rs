//! Best-effort font readiness wait.
//!
//! An optimistic load probe runs first; if it loads anything the wait is
//! over. Otherwise (nothing loaded, probe error, or probe never settling) the
//! waiter polls the synchronous availability check every interval until it
//! succeeds or the elapsed polling time reaches the timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::font::book::FontProvider;
use crate::font::spec::FontSpec;
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a readiness wait completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The probe loaded this many resources; polling never started.
    Loaded(usize),
    /// The availability check passed on this polling tick (1-based).
    Polled { ticks: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("readiness wait timed out after {elapsed:?}")]
pub struct WaitTimeout {
    pub elapsed: Duration,
}

/// Probe once, then poll `check` every `interval` until it passes or
/// `timeout` worth of polling has elapsed.
///
/// Probe failures are not reported; they only move the wait on to polling.
pub async fn wait_until_ready<P, C>(
    probe: P,
    mut check: C,
    interval: Duration,
    timeout: Duration,
) -> std::result::Result<Readiness, WaitTimeout>
where
    P: Future<Output = Result<usize>>,
    C: FnMut() -> bool,
{
    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(count)) if count > 0 => return Ok(Readiness::Loaded(count)),
        Ok(Ok(_)) => log::debug!("load probe returned nothing, polling"),
        Ok(Err(e)) => log::debug!("load probe failed, polling: {e}"),
        Err(_) => log::debug!("load probe did not settle within {timeout:?}, polling"),
    }

    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut elapsed = Duration::ZERO;
    let mut ticks = 0u32;
    loop {
        ticker.tick().await;
        ticks += 1;
        if check() {
            return Ok(Readiness::Polled { ticks });
        }
        elapsed += interval;
        if elapsed >= timeout {
            return Err(WaitTimeout { elapsed });
        }
    }
}

/// Wait until `spec` is usable for drawing, with the default poll interval.
/// `timeout` defaults to 15 seconds.
pub async fn wait_for_font(
    fonts: &dyn FontProvider,
    spec: &FontSpec,
    timeout: Option<Duration>,
) -> Result<Readiness> {
    wait_for_font_polling(fonts, spec, DEFAULT_POLL_INTERVAL, timeout.unwrap_or(DEFAULT_TIMEOUT)).await
}

pub async fn wait_for_font_polling(
    fonts: &dyn FontProvider,
    spec: &FontSpec,
    interval: Duration,
    timeout: Duration,
) -> Result<Readiness> {
    let readiness = wait_until_ready(fonts.load(spec), || fonts.check(spec), interval, timeout)
        .await
        .map_err(|_| Error::FontTimeout {
            spec: spec.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?;
    log::debug!("font {spec} ready: {readiness:?}");
    Ok(readiness)
}
