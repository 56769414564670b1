//! CSV output for the reconciliation report.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

/// Destination for the finished report. Called once per run with the header
/// and every data row.
pub trait ReportSink {
    fn write_report(&mut self, header: &[&str], rows: &[Vec<String>]) -> Result<()>;
}

/// Writes comma-separated records to any `Write`. Rows keep their own length.
pub struct CsvWriter<W: Write> {
    inner: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_record<I, S>(&mut self, fields: I) -> std::io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.inner.write_all(b",")?;
            }
            self.inner.write_all(csv_field(field.as_ref()).as_bytes())?;
        }
        self.inner.write_all(b"\n")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ReportSink for CsvWriter<W> {
    fn write_report(&mut self, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        self.write_record(header)?;
        for row in rows {
            self.write_record(row)?;
        }
        self.flush()?;
        Ok(())
    }
}

/// Creates the output file on first write, so a failed run leaves nothing behind.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for CsvFileSink {
    fn write_report(&mut self, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = CsvWriter::new(BufWriter::new(file));
        writer.write_report(header, rows)?;
        writer
            .into_inner()
            .into_inner()
            .map_err(|err| err.into_error())?
            .sync_all()?;
        info!(path = %self.path.display(), rows = rows.len(), "report written");
        Ok(())
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn rows_keep_their_length() {
        let mut writer = CsvWriter::new(Vec::new());
        let rows = vec![
            vec!["1".to_string(), "2".to_string()],
            vec!["3".to_string(), "4".to_string(), "5".to_string()],
        ];
        writer.write_report(&["a", "b", "c"], &rows).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "a,b,c\n1,2\n3,4,5\n");
    }

    #[test]
    fn file_sink_writes_header_and_rows() {
        let td = tempdir().unwrap();
        let path = td.path().join("result.csv");
        let mut sink = CsvFileSink::new(&path);
        sink.write_report(&["Pais", "Niños"], &[vec!["AR".into(), "1".into()]])
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Pais,Niños\nAR,1\n");
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let td = tempdir().unwrap();
        let mut sink = CsvFileSink::new(td.path().join("missing").join("result.csv"));
        let err = sink.write_report(&["a"], &[]).unwrap_err();
        assert!(matches!(err, crate::error::ReconcileError::OutputWriteFailure(_)));
    }
}
