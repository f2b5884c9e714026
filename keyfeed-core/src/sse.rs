//! Server-sent events decoding.
//!
//! [`SseDecoder`] turns arbitrary byte chunks into complete frames. Lines may
//! end in LF, CRLF or a bare CR, and a chunk boundary may fall anywhere,
//! including between the CR and LF of one line terminator.

use std::time::Duration;

use keyfeed_types::EventId;

/// Event type used when a frame has no `event:` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// A dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, or [`DEFAULT_EVENT_TYPE`].
    pub event: String,
    /// All `data:` lines joined with `\n`.
    pub data: String,
    /// The last event id in effect when this event was dispatched.
    pub id: Option<EventId>,
}

/// Output of [`SseDecoder::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A complete event.
    Event(SseEvent),
    /// A `retry:` field: the server's preferred reconnect delay.
    Retry(Duration),
}

/// Incremental SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    after_cr: bool,
    data: String,
    has_data: bool,
    event_type: String,
    last_event_id: Option<EventId>,
}

impl SseDecoder {
    /// A decoder with no last event id.
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder that starts from a known last event id.
    pub fn with_last_event_id(id: Option<EventId>) -> Self {
        Self {
            last_event_id: id,
            ..Self::default()
        }
    }

    /// The last event id seen (persists across events).
    pub fn last_event_id(&self) -> Option<&EventId> {
        self.last_event_id.as_ref()
    }

    /// Feed a chunk and collect the frames it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        for &byte in chunk {
            match byte {
                b'\n' if self.after_cr => {
                    self.after_cr = false;
                }
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let line = std::mem::take(&mut self.line);
                    self.process_line(&line, &mut frames);
                }
                _ => {
                    self.after_cr = false;
                    self.line.push(byte);
                }
            }
        }
        frames
    }

    fn process_line(&mut self, raw: &[u8], frames: &mut Vec<SseFrame>) {
        if raw.is_empty() {
            self.dispatch(frames);
            return;
        }
        let line = String::from_utf8_lossy(raw);
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.as_ref(), ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event_type = value.to_string(),
            "id" if !value.contains('\0') => self.last_event_id = EventId::new(value),
            "retry" => {
                if let Ok(ms) = value.trim().parse::<u64>() {
                    frames.push(SseFrame::Retry(Duration::from_millis(ms)));
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, frames: &mut Vec<SseFrame>) {
        let event_type = std::mem::take(&mut self.event_type);
        if !self.has_data {
            return;
        }
        self.has_data = false;
        let data = std::mem::take(&mut self.data);
        frames.push(SseFrame::Event(SseEvent {
            event: if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
        }));
    }
}
