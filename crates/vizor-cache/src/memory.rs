//! In-process stream backend.
//!
//! Mirrors Redis stream semantics closely enough for tests and single-process
//! development: `<ms>-<seq>` ids, inclusive ranges, `-`/`+` bounds and
//! `maxlen` trimming. Ids are monotonic across all streams of one backend.

use crate::backend::{
    BackendKind, StreamBackend, StreamEntry, StreamFields, AUTO_ID, RANGE_END, RANGE_START,
};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Parsed `<ms>-<seq>` stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EntryId {
    ms: u64,
    seq: u64,
}

impl EntryId {
    const MIN: EntryId = EntryId { ms: 0, seq: 0 };
    const MAX: EntryId = EntryId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    /// Parses a range bound. A bare `<ms>` covers every sequence number of
    /// that millisecond, so it means `<ms>-0` as a start and `<ms>-MAX` as an end.
    fn parse_bound(s: &str, is_end: bool) -> CacheResult<Self> {
        match s {
            RANGE_START => Ok(Self::MIN),
            RANGE_END => Ok(Self::MAX),
            _ => match s.split_once('-') {
                Some(_) => s.parse(),
                None => {
                    let ms = s
                        .parse::<u64>()
                        .map_err(|_| CacheError::InvalidStreamId(s.to_string()))?;
                    Ok(Self {
                        ms,
                        seq: if is_end { u64::MAX } else { 0 },
                    })
                }
            },
        }
    }
}

impl FromStr for EntryId {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CacheError::InvalidStreamId(s.to_string());
        let (ms, seq) = s.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            ms: ms.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[derive(Debug, Default)]
struct Stream {
    entries: Vec<(EntryId, StreamFields)>,
}

impl Stream {
    fn last_id(&self) -> Option<EntryId> {
        self.entries.last().map(|(id, _)| *id)
    }
}

#[derive(Debug)]
struct State {
    streams: HashMap<String, Stream>,
    last_id: EntryId,
}

/// Stream backend held entirely in memory.
pub struct InMemoryStreamBackend {
    state: Mutex<State>,
}

impl InMemoryStreamBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                streams: HashMap::new(),
                last_id: EntryId::MIN,
            }),
        }
    }

    /// Number of entries currently held in `stream`.
    pub fn stream_len(&self, stream: &str) -> usize {
        self.state
            .lock()
            .streams
            .get(stream)
            .map_or(0, |s| s.entries.len())
    }

    /// Names of all streams that have received at least one entry, sorted.
    pub fn stream_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().streams.keys().cloned().collect();
        names.sort();
        names
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn next_id(last: EntryId) -> EntryId {
        let now = Self::now_ms();
        if now > last.ms {
            EntryId { ms: now, seq: 0 }
        } else {
            EntryId {
                ms: last.ms,
                seq: last.seq.saturating_add(1),
            }
        }
    }
}

impl Default for InMemoryStreamBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamBackend for InMemoryStreamBackend {
    async fn xadd(
        &self,
        stream: &str,
        fields: &StreamFields,
        id: &str,
        maxlen: Option<usize>,
    ) -> CacheResult<String> {
        let mut state = self.state.lock();

        let entry_id = if id == AUTO_ID {
            let stream_last = state
                .streams
                .get(stream)
                .and_then(Stream::last_id)
                .unwrap_or(EntryId::MIN);
            Self::next_id(state.last_id.max(stream_last))
        } else {
            let requested: EntryId = id.parse()?;
            let stream_last = state.streams.get(stream).and_then(Stream::last_id);
            if requested == EntryId::MIN || stream_last.is_some_and(|last| requested <= last) {
                return Err(CacheError::InvalidStreamId(format!(
                    "{} is equal or smaller than the stream's top item",
                    id
                )));
            }
            requested
        };

        state.last_id = state.last_id.max(entry_id);

        let entries = &mut state.streams.entry(stream.to_string()).or_default().entries;
        entries.push((entry_id, fields.clone()));
        if let Some(maxlen) = maxlen {
            if entries.len() > maxlen {
                let excess = entries.len() - maxlen;
                entries.drain(..excess);
            }
        }

        trace!(stream = %stream, id = %entry_id, "Appended stream entry");
        Ok(entry_id.to_string())
    }

    async fn xrange(
        &self,
        stream: &str,
        start: &str,
        end: &str,
        count: Option<usize>,
    ) -> CacheResult<Vec<StreamEntry>> {
        let start = EntryId::parse_bound(start, false)?;
        let end = EntryId::parse_bound(end, true)?;
        let limit = count.unwrap_or(usize::MAX);

        let state = self.state.lock();
        let Some(stream) = state.streams.get(stream) else {
            return Ok(Vec::new());
        };

        Ok(stream
            .entries
            .iter()
            .filter(|(id, _)| *id >= start && *id <= end)
            .take(limit)
            .map(|(id, fields)| StreamEntry::new(id.to_string(), fields.clone()))
            .collect())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}
