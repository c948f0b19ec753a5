//! Batched key emission: transitions in order, then one sync

use crate::device::{DeviceError, KeySink};
use crate::mapping::KeyEvent;

/// Forwards a tick's key events to a [`KeySink`]
///
/// Keeps running totals for the periodic statistics.
#[derive(Clone, Debug, Default)]
pub struct KeyEventEmitter {
    events: u64,
    syncs: u64,
}

impl KeyEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `events` followed by a single sync, or nothing at all when empty
    pub fn emit(&mut self, sink: &mut dyn KeySink, events: &[KeyEvent]) -> Result<(), DeviceError> {
        if events.is_empty() {
            return Ok(());
        }
        for event in events {
            sink.emit_key(event.code, event.pressed)?;
        }
        sink.emit_sync()?;

        self.events += events.len() as u64;
        self.syncs += 1;
        Ok(())
    }

    pub fn events_emitted(&self) -> u64 {
        self.events
    }

    pub fn syncs_emitted(&self) -> u64 {
        self.syncs
    }
}
