use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::event::HookEvent;
use crate::sink::HookSink;

const CHANNEL_DEPTH: usize = 256;

/// Fans `HookEvent`s out to every registered sink over a bounded channel
/// (§4.10, §9 "bounded queue"). A sink's own failure is logged and never
/// propagated back to the run that emitted the event.
pub struct HookDispatcher {
    tx: mpsc::Sender<HookEvent>,
}

impl HookDispatcher {
    pub fn spawn(sinks: Vec<Arc<dyn HookSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<HookEvent>(CHANNEL_DEPTH);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    if let Err(err) = sink.handle(&event).await {
                        warn!(event = event.name(), error = %err, "hook sink failed, continuing");
                    }
                }
            }
        });
        Self { tx }
    }

    /// Emits an event. Never blocks the caller past the channel's own
    /// backpressure, and a dropped receiver (dispatcher gone) is silently
    /// ignored — per §4.10, a hook surface problem must never fail a run.
    pub async fn emit(&self, event: HookEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("hook dispatcher channel closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl HookSink for CountingSink {
        async fn handle(&self, _event: &HookEvent) -> Result<(), crate::sink::HookSinkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn emits_to_every_registered_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = HookDispatcher::spawn(vec![
            Arc::new(CountingSink(count.clone())),
            Arc::new(CountingSink(count.clone())),
        ]);
        dispatcher
            .emit(HookEvent::RunStarted {
                run_id: "r1".to_string(),
                at: chrono::Utc::now(),
                system: "crm".to_string(),
                entity: "accounts".to_string(),
            })
            .await;
        // Give the spawned task a chance to drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
