//! Lock-free command queue between the control thread and the audio thread
//!
//! The split mirrors a middleware event manager:
//! - `QueuedSink`: cloneable handle, implements `AudioSink` by pushing commands
//! - `SinkProcessor`: owned by the audio thread, drains commands into the real sink

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::path::Path;
use std::sync::Arc;

use rf_spatial::SourceTransform;

use crate::{
    AssetId, AudioSink, EventDef, EventError, EventId, EventResult, PlayingId, SinkCommand,
    SourceId,
};

/// Default command queue capacity
pub const COMMAND_QUEUE_CAPACITY: usize = 4096;

/// Create a queued front for `sink`
pub fn queued<S: AudioSink>(sink: S, capacity: usize) -> (QueuedSink, SinkProcessor<S>) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    let handle = QueuedSink {
        tx: Arc::new(Mutex::new(tx)),
    };
    let processor = SinkProcessor { rx, sink };
    (handle, processor)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE (control thread)
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe sink front. Commands take effect when the processor drains them.
#[derive(Clone)]
pub struct QueuedSink {
    tx: Arc<Mutex<Producer<SinkCommand>>>,
}

impl QueuedSink {
    fn push_command(&self, cmd: SinkCommand) -> EventResult<()> {
        let mut tx = self.tx.lock();
        tx.push(cmd).map_err(|_| {
            log::warn!("Sink command queue full, dropping command");
            EventError::QueueFull
        })
    }

    /// For commands with no result channel; a full queue was already logged
    fn post(&self, cmd: SinkCommand) {
        let _ = self.push_command(cmd);
    }

    /// Commands waiting to be drained
    pub fn pending(&self) -> usize {
        let tx = self.tx.lock();
        tx.buffer().capacity() - tx.slots()
    }
}

impl AudioSink for QueuedSink {
    fn register_asset(&mut self, asset: AssetId, path: &Path) -> EventResult<()> {
        self.push_command(SinkCommand::RegisterAsset {
            asset,
            path: path.to_path_buf(),
        })
    }

    fn unregister_asset(&mut self, asset: AssetId) {
        self.post(SinkCommand::UnregisterAsset { asset });
    }

    fn register_event(&mut self, event: EventId, def: EventDef) -> EventResult<()> {
        self.push_command(SinkCommand::RegisterEvent { event, def })
    }

    fn unregister_event(&mut self, event: EventId) {
        self.post(SinkCommand::UnregisterEvent { event });
    }

    fn create_source(&mut self, source: SourceId) -> EventResult<()> {
        self.push_command(SinkCommand::CreateSource { source })
    }

    fn destroy_source(&mut self, source: SourceId) {
        self.post(SinkCommand::DestroySource { source });
    }

    fn start(
        &mut self,
        playing_id: PlayingId,
        event: EventId,
        source: SourceId,
        seek_secs: Option<f64>,
    ) -> EventResult<()> {
        self.push_command(SinkCommand::Start {
            playing_id,
            event,
            source,
            seek_secs,
        })
    }

    fn pause(&mut self, playing_id: PlayingId) {
        self.post(SinkCommand::Pause { playing_id });
    }

    fn resume(&mut self, playing_id: PlayingId) {
        self.post(SinkCommand::Resume { playing_id });
    }

    fn stop(&mut self, playing_id: PlayingId) {
        self.post(SinkCommand::Stop { playing_id });
    }

    fn pause_all(&mut self) {
        self.post(SinkCommand::PauseAll);
    }

    fn resume_all(&mut self) {
        self.post(SinkCommand::ResumeAll);
    }

    fn stop_all(&mut self) {
        self.post(SinkCommand::StopAll);
    }

    fn set_source_gain(&mut self, source: SourceId, gain: f32) {
        self.post(SinkCommand::SetGain { source, gain });
    }

    fn set_source_transform(&mut self, source: SourceId, transform: SourceTransform) {
        self.post(SinkCommand::SetTransform { source, transform });
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESSOR (audio thread)
// ═══════════════════════════════════════════════════════════════════════════════

/// Audio-thread side of the queue
pub struct SinkProcessor<S: AudioSink> {
    rx: Consumer<SinkCommand>,
    sink: S,
}

impl<S: AudioSink> SinkProcessor<S> {
    /// Drain every pending command into the sink. Returns how many were applied.
    pub fn process(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(cmd) = self.rx.pop() {
            if let Err(e) = self.sink.apply(cmd) {
                log::error!("Sink command failed: {e}");
            }
            applied += 1;
        }
        applied
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}
