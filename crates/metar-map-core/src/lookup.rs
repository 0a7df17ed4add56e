use crate::batch::{plan_batches, RequestTemplate};
use crate::fetch::{FetchError, Fetcher};
use crate::records::{parse_records, RecordError};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Records(#[from] RecordError),
}

#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub template: RequestTemplate,
    pub max_url_len: usize,
    /// Pause between consecutive batches.
    pub batch_pause: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupReport {
    pub batches: usize,
    pub failed_batches: usize,
    pub records: usize,
    pub matched: usize,
}

/// Fetches every batch for `identifiers` and hands each record to `apply`,
/// which returns whether the record matched a token.
///
/// A failed batch is logged and skipped; the remaining batches still run.
pub(crate) fn run_batches<F, A>(
    service: &str,
    fetcher: &F,
    settings: &LookupSettings,
    identifiers: &[String],
    mut apply: A,
) -> LookupReport
where
    F: Fetcher + ?Sized,
    A: FnMut(&Value) -> bool,
{
    let mut report = LookupReport::default();
    let batches = plan_batches(&settings.template, identifiers, settings.max_url_len);

    for (i, batch) in batches.iter().enumerate() {
        if i > 0 && !settings.batch_pause.is_zero() {
            std::thread::sleep(settings.batch_pause);
        }
        report.batches += 1;

        let records = match fetch_records(fetcher, &batch.url) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "{} batch failed; tokens stay unresolved this cycle — ids={} error={}",
                    service,
                    batch.identifiers.len(),
                    e
                );
                report.failed_batches += 1;
                continue;
            }
        };

        report.records += records.len();
        for record in &records {
            if apply(record) {
                report.matched += 1;
            }
        }
        debug!(
            "{} batch applied — ids={} records={} url_len={}",
            service,
            batch.identifiers.len(),
            records.len(),
            batch.url.len()
        );
    }

    report
}

fn fetch_records<F: Fetcher + ?Sized>(fetcher: &F, url: &str) -> Result<Vec<Value>, LookupError> {
    let body = fetcher.get(url)?;
    Ok(parse_records(&body)?)
}
