use tracing::debug;

use crate::search::LogRecord;

/// Join `primary` against `secondary` by correlation key.
///
/// Every primary record is checked against `secondary` in order and the scan
/// stops at the first equal key. Matched primary payloads are returned in
/// primary order; unmatched primary records are dropped.
pub fn correlate(primary: &[LogRecord], secondary: &[LogRecord]) -> Vec<String> {
    let mut payloads = Vec::new();
    for record in primary {
        match secondary
            .iter()
            .position(|candidate| candidate.correlation_key == record.correlation_key)
        {
            Some(index) => {
                debug!(key = %record.correlation_key, index, "correlated record");
                payloads.push(record.payload.clone());
            }
            None => debug!(key = %record.correlation_key, "no matching request"),
        }
    }
    payloads
}
