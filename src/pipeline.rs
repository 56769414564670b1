use tracing::{info, instrument};

use crate::config::Queries;
use crate::correlate::correlate;
use crate::error::Result;
use crate::export::ReportSink;
use crate::report::{extract, ReportRow, HEADERS};
use crate::search::SearchService;

/// Counts collected along the way, logged by the binary at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub validations: usize,
    pub requests: usize,
    pub correlated: usize,
    pub rows: usize,
    pub round_trips: usize,
}

/// Fetch both record sets concurrently, correlate validations against failed
/// requests, flatten every match and hand the report to `sink` once.
///
/// Any error aborts the run before the sink is touched.
#[instrument(skip_all)]
pub async fn run<S, K>(search: &S, queries: &Queries, sink: &mut K) -> Result<RunSummary>
where
    S: SearchService + ?Sized,
    K: ReportSink + ?Sized,
{
    let (requests, validations) = tokio::try_join!(
        search.search(&queries.requests),
        search.search(&queries.validations),
    )?;
    info!(
        requests = requests.len(),
        validations = validations.len(),
        "retrieved record sets"
    );

    let payloads = correlate(&validations, &requests);
    info!(correlated = payloads.len(), "correlated validations");

    let mut rows: Vec<ReportRow> = Vec::with_capacity(payloads.len());
    let mut round_trips = 0;
    for payload in &payloads {
        let report = extract(payload)?;
        if report.is_round_trip() {
            round_trips += 1;
        }
        rows.push(report.to_row());
    }

    sink.write_report(&HEADERS, &rows)?;

    Ok(RunSummary {
        validations: validations.len(),
        requests: requests.len(),
        correlated: payloads.len(),
        rows: rows.len(),
        round_trips,
    })
}
