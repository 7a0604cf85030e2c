//! Historical query reader
//!
//! A `QueryReader` is created per query and consumed once. Nothing happens
//! until the first `read_next`: that call flushes the writer's buffer so
//! recent writes are visible, then starts the backend query. A failed flush
//! is logged and the query still runs against what is stored. Every call
//! after that hands back the next chunk until the backend is exhausted.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use lumber_protocol::QueryParams;
use tracing::warn;

use super::backend::{ChunkStream, SeriesRow};
use super::writer::Shared;
use super::{QueryError, Reader, SeriesQuery};

enum State {
    Pending,
    Streaming(Box<dyn ChunkStream>),
    Done,
}

/// Lazy, forward-only reader over one query
pub struct QueryReader {
    shared: Arc<Shared>,
    params: QueryParams,
    state: State,
}

impl QueryReader {
    pub(crate) fn new(shared: Arc<Shared>, params: QueryParams) -> Self {
        Self {
            shared,
            params,
            state: State::Pending,
        }
    }

    async fn advance(&mut self) -> Result<Option<Bytes>, QueryError> {
        loop {
            match &mut self.state {
                State::Pending => {
                    let query = SeriesQuery::from_params(&self.params)?;
                    let stream = begin(Arc::clone(&self.shared), query).await?;
                    self.state = State::Streaming(stream);
                }
                State::Streaming(stream) => match stream.next_chunk().await? {
                    Some(rows) => {
                        let lines = render_lines(&rows);
                        // Chunks whose rows are all empty messages are skipped
                        if !lines.is_empty() {
                            return Ok(Some(lines));
                        }
                    }
                    None => {
                        self.state = State::Done;
                        return Ok(None);
                    }
                },
                State::Done => return Ok(None),
            }
        }
    }
}

#[async_trait]
impl Reader for QueryReader {
    async fn read_next(&mut self) -> Result<Option<Bytes>, QueryError> {
        let result = self.advance().await;
        if result.is_err() {
            self.state = State::Done;
        }
        result
    }
}

/// Flush pending writes, then start the backend query
///
/// Takes owned state so the returned future does not borrow the reader.
async fn begin(
    shared: Arc<Shared>,
    query: SeriesQuery,
) -> Result<Box<dyn ChunkStream>, QueryError> {
    if let Err(e) = shared.flush().await {
        warn!(
            measurement = %query.measurement,
            error = %e,
            "flush before query failed, reading stored history"
        );
    }
    shared.backend.query(&query).await
}

/// One message per line, newline-terminated; empty messages are dropped
fn render_lines(rows: &[SeriesRow]) -> Bytes {
    let mut buf = BytesMut::with_capacity(rows.iter().map(|r| r.message.len() + 1).sum());
    for row in rows {
        if row.message.is_empty() {
            continue;
        }
        buf.put_slice(row.message.as_bytes());
        if !row.message.ends_with('\n') {
            buf.put_u8(b'\n');
        }
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(message: &str) -> SeriesRow {
        SeriesRow {
            time_ns: 0,
            severity: "info".into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_render_lines() {
        let lines = render_lines(&[row("one"), row(""), row("two\n")]);
        assert_eq!(&lines[..], b"one\ntwo\n");
    }

    #[test]
    fn test_render_empty() {
        assert!(render_lines(&[row("")]).is_empty());
        assert!(render_lines(&[]).is_empty());
    }
}
