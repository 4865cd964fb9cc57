use std::sync::Mutex;

use heatlink_core::{CallType, CanonicalSourceId, NewsItem};

/// One recorded `Emit` call (§6.4).
#[derive(Debug, Clone)]
pub struct EmitCall {
    pub source_id: CanonicalSourceId,
    pub items: Vec<NewsItem>,
    pub call_type: CallType,
}

/// Records every `Emit` invocation it's given, for assertion in
/// engine-level tests.
///
/// This crate can't depend on `heatlink-engine` (which is what defines the
/// `DownstreamEmitter` trait this exists to satisfy) without an
/// unnecessary cyclic dependency, so `RecordingEmitter` is a plain
/// recorder: engine-crate tests wrap it in a one-line `DownstreamEmitter`
/// impl that just calls [`RecordingEmitter::record`].
#[derive(Default)]
pub struct RecordingEmitter {
    calls: Mutex<Vec<EmitCall>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, source_id: &CanonicalSourceId, items: &[NewsItem], call_type: CallType) {
        self.calls.lock().unwrap().push(EmitCall {
            source_id: source_id.clone(),
            items: items.to_vec(),
            call_type,
        });
    }

    pub fn calls(&self) -> Vec<EmitCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_call_in_order() {
        let emitter = RecordingEmitter::new();
        let sid = CanonicalSourceId::canonicalize("demo");
        emitter.record(&sid, &[], CallType::Internal);
        emitter.record(&sid, &[], CallType::External);
        assert_eq!(emitter.call_count(), 2);
        assert_eq!(emitter.calls()[1].call_type, CallType::External);
    }
}
