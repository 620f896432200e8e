//! Pending entries awaiting the next flush.

use std::mem;

use crate::entry::LogEntry;

/// Ordered buffer of entries; insertion order is call order.
///
/// Every detached batch is numbered; tickets start at zero and increase by
/// one per detach.
#[derive(Debug, Default)]
pub(crate) struct BatchBuffer {
    entries: Vec<LogEntry>,
    next_ticket: u64,
}

impl BatchBuffer {
    pub(crate) fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Take every buffered entry with its send ticket, leaving a fresh empty
    /// batch behind.
    pub(crate) fn detach(&mut self) -> (Vec<LogEntry>, u64) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        (mem::take(&mut self.entries), ticket)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LogEntryMetadata;

    fn entry(text: &str) -> LogEntry {
        LogEntry {
            text_payload: text.to_owned(),
            log: "log".into(),
            insert_id: text.to_owned(),
            metadata: LogEntryMetadata {
                project_id: "p".into(),
                service_name: "compute.googleapis.com",
                severity: "INFO",
                timestamp: "1970-01-01T00:00:00Z".into(),
                user_id: None,
                zone: "z".into(),
            },
        }
    }

    #[test]
    fn detach_preserves_order_and_empties_buffer() {
        let mut buffer = BatchBuffer::default();
        buffer.push(entry("a"));
        buffer.push(entry("b"));
        buffer.push(entry("c"));
        assert_eq!(buffer.len(), 3);

        let (batch, ticket) = buffer.detach();
        assert_eq!(ticket, 0);
        let texts: Vec<_> = batch.iter().map(|e| e.text_payload.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn detaching_empty_buffer_yields_empty_batch() {
        let mut buffer = BatchBuffer::default();
        assert!(buffer.detach().0.is_empty());
    }

    #[test]
    fn tickets_follow_detach_order() {
        let mut buffer = BatchBuffer::default();
        let tickets: Vec<_> = (0..3)
            .map(|i| {
                buffer.push(entry(&i.to_string()));
                buffer.detach().1
            })
            .collect();
        assert_eq!(tickets, [0, 1, 2]);
    }
}
