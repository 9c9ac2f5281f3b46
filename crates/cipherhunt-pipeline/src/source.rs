//! JSON Lines record source.

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use cipherhunt_core::{HuntError, Record};

/// Boxed line reader over a file or stdin.
pub type InputReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// What a record source read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSummary {
    /// Non-blank lines read.
    pub lines: u64,
    /// Lines parsed into records and forwarded.
    pub records: u64,
    /// Lines that were not valid records.
    pub malformed: u64,
}

/// Open `path` for reading, with `-` meaning stdin.
pub async fn open_input(path: &Path) -> Result<InputReader, HuntError> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| HuntError::Input { source })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Read JSON Lines records from `reader` and forward them to `tx`.
///
/// Blank lines are skipped. Lines that are not valid UTF-8 JSON records are
/// dropped as malformed. Only a failing read ends the stream with an error,
/// after every record before it has been forwarded. Stops early if the
/// receiving side goes away.
pub async fn read_jsonl<R>(mut reader: R, tx: mpsc::Sender<Record>) -> Result<SourceSummary, HuntError>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = SourceSummary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|source| HuntError::Input { source })?;
        if read == 0 {
            break;
        }

        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;

        let record: Record = match serde_json::from_slice(line) {
            Ok(record) => record,
            Err(e) => {
                summary.malformed += 1;
                tracing::debug!(target: "source", line = summary.lines, error = %e, "skipping malformed record");
                continue;
            }
        };

        if tx.send(record).await.is_err() {
            tracing::debug!(target: "source", "record consumer closed, stopping input");
            break;
        }
        summary.records += 1;
    }

    Ok(summary)
}

/// Spawn a task reading JSON Lines from `reader` into a bounded channel.
pub fn spawn_jsonl_reader<R>(
    reader: R,
    capacity: usize,
) -> (mpsc::Receiver<Record>, JoinHandle<Result<SourceSummary, HuntError>>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(read_jsonl(reader, tx));
    (rx, handle)
}
