//! Drives one connector through every page of a cell.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connector::Connector;
use crate::error::AppError;
use crate::models::ResultCell;
use crate::observer::HarvestObserver;
use crate::state::RequestLedger;

/// Pagination driver for one backend.
///
/// Before every network call it checks for cancellation, enforces the daily
/// budget and waits out the pacing delay. Every call is counted once in the
/// ledger, whatever the response turns out to be.
pub struct Pager<'a, C: Connector> {
    connector: &'a C,
    observer: &'a dyn HarvestObserver,
    cancel: &'a CancellationToken,
    started: Instant,
}

impl<'a, C: Connector> Pager<'a, C> {
    pub fn new(
        connector: &'a C,
        observer: &'a dyn HarvestObserver,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            connector,
            observer,
            cancel,
            started: Instant::now(),
        }
    }

    /// Fetches every page for one (bias name, keyword) cell.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cancelled` if the token fires before or between
    /// requests, and any transport error the connector reports.
    pub async fn run_cell(
        &self,
        ledger: &mut RequestLedger,
        name: &str,
        keyword: &str,
    ) -> Result<ResultCell, AppError> {
        let backend = self.connector.backend();
        let query = self.connector.query(name, keyword);
        let mut cursor = Some(self.connector.first_cursor(&query));
        let mut records = Vec::new();
        let mut pages = 0u32;

        while let Some(position) = cursor.take() {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            self.enforce_budget(ledger).await?;
            self.wait(self.connector.pacing().delay).await?;

            let url = self.connector.request_url(&query, &position)?;
            let count = ledger.record(backend.label(), &url);
            self.observer.log(
                backend,
                &format!(
                    "{} API request {} made at {:.2} seconds.",
                    backend.label(),
                    count,
                    self.started.elapsed().as_secs_f64()
                ),
            );

            let page = self.connector.fetch(&url, position).await?;
            pages += 1;
            records.extend(page.records);
            self.observer.progress(backend, ledger.request_counter);
            cursor = page.next;
        }

        debug!(
            backend = backend.slug(),
            name,
            keyword,
            pages,
            records = records.len(),
            "Cell exhausted"
        );
        Ok(records)
    }

    async fn enforce_budget(&self, ledger: &mut RequestLedger) -> Result<(), AppError> {
        let pacing = self.connector.pacing();
        let Some(budget) = pacing.daily_budget else {
            return Ok(());
        };
        if ledger.request_counter < budget {
            return Ok(());
        }

        let backend = self.connector.backend();
        warn!(backend = backend.slug(), budget, "Daily request budget reached");
        self.observer.log(
            backend,
            &format!(
                "{} API reached {} requests. Pausing for {}.",
                backend.label(),
                budget,
                describe(pacing.cooldown)
            ),
        );
        self.observer.budget_paused(backend, budget, pacing.cooldown);
        self.wait(pacing.cooldown).await?;
        ledger.reset_counter();
        Ok(())
    }

    async fn wait(&self, duration: Duration) -> Result<(), AppError> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

fn describe(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{} hours", secs / 3600)
    } else if secs >= 1 {
        format!("{} seconds", secs)
    } else {
        format!("{} ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_cooldown() {
        assert_eq!(describe(Duration::from_secs(86_400)), "24 hours");
        assert_eq!(describe(Duration::from_secs(90)), "90 seconds");
        assert_eq!(describe(Duration::from_millis(5)), "5 ms");
    }
}
