use crate::error::{LedgerError, Result};
use std::io::Read;

/// One line of an invocation script: an operation name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: String,
    pub args: Vec<String>,
}

/// Reads invocations from a headerless CSV source.
///
/// Each row holds the operation name followed by its arguments, so rows may
/// have different lengths. Lines starting with `#` are comments and blank
/// lines are skipped. Fields are trimmed; quote a field to keep a comma in it.
pub struct InvocationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InvocationReader<R> {
    /// Creates a new `InvocationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads invocations, one per row.
    pub fn invocations(self) -> Invocations<R> {
        Invocations {
            reader: self.reader,
            record: csv::StringRecord::new(),
        }
    }
}

/// Lazy iterator over script rows.
///
/// Each item carries the 1-based line the row started on, including for rows
/// that failed to parse, so comments and blank lines do not shift the count.
pub struct Invocations<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
}

impl<R: Read> Iterator for Invocations<R> {
    type Item = (u64, Result<Invocation>);

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self
                    .record
                    .position()
                    .map_or_else(|| self.reader.position().line(), |pos| pos.line());
                Some((line, parse_row(&self.record)))
            }
            Err(e) => {
                let line = e
                    .position()
                    .map_or_else(|| self.reader.position().line(), |pos| pos.line());
                Some((line, Err(e.into())))
            }
        }
    }
}

fn parse_row(row: &csv::StringRecord) -> Result<Invocation> {
    let mut fields = row.iter().map(str::to_string);
    let operation = fields
        .next()
        .filter(|op| !op.is_empty())
        .ok_or_else(|| LedgerError::invalid("missing operation name"))?;
    Ok(Invocation {
        operation,
        args: fields.collect(),
    })
}
