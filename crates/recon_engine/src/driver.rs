use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::network::NetworkTap;
use crate::DriverError;

/// Interval between presence checks while waiting for an element.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Capabilities the crawl needs from a browser session.
///
/// One driver holds one session; calls are issued strictly one at a time.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError>;

    async fn is_present(&mut self, selector: &str) -> Result<bool, DriverError>;

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError>;

    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Serialized DOM of the loaded page.
    async fn content(&mut self) -> Result<String, DriverError>;

    /// Full-page image, PNG encoded.
    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError>;

    /// Route network events to `tap` until replaced; `None` detaches.
    fn attach_network_tap(&mut self, tap: Option<NetworkTap>);
}

/// First selector in priority order that currently matches an element.
///
/// Each presence check is bounded by `call_limit`.
pub async fn first_present<'s, D>(
    driver: &mut D,
    selectors: &[&'s str],
    call_limit: Duration,
) -> Result<Option<&'s str>, DriverError>
where
    D: BrowserDriver + ?Sized,
{
    for selector in selectors {
        if with_timeout(call_limit, driver.is_present(selector)).await? {
            return Ok(Some(*selector));
        }
    }
    Ok(None)
}

/// Polls until any of `selectors` is present or `limit` elapses.
///
/// A round of checks still running at the deadline counts as not found.
pub async fn wait_for_any<'s, D>(
    driver: &mut D,
    selectors: &[&'s str],
    limit: Duration,
    poll: Duration,
    call_limit: Duration,
) -> Result<Option<&'s str>, DriverError>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Instant::now() + limit;
    loop {
        let round = first_present(driver, selectors, call_limit);
        match tokio::time::timeout_at(deadline, round).await {
            Ok(found) => {
                if let Some(selector) = found? {
                    return Ok(Some(selector));
                }
            }
            Err(_) => return Ok(None),
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

/// Bounds a driver call; an elapsed limit becomes `DriverError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout),
    }
}
