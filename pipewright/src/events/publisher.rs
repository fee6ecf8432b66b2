//! Serialized publication of lifecycle events.

use super::{EventSink, PipelineEvent};
use crate::core::Link;
use crate::utils::sanitize;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Publishes events to a sink, one at a time.
///
/// Cloning is cheap; all clones share the sink, the write gate and the
/// list of concealed secrets.
#[derive(Clone)]
pub struct EventPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    sink: Arc<dyn EventSink>,
    gate: Mutex<()>,
    secrets: RwLock<Vec<String>>,
}

impl EventPublisher {
    /// Creates a publisher over the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                sink,
                gate: Mutex::new(()),
                secrets: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Publishes one event.
    pub fn publish(&self, event: PipelineEvent) {
        let _guard = self.inner.gate.lock();
        self.inner.sink.emit(&event);
    }

    /// Publishes a batch without letting other events interleave.
    pub fn publish_all(&self, events: impl IntoIterator<Item = PipelineEvent>) {
        let _guard = self.inner.gate.lock();
        for event in events {
            self.inner.sink.emit(&event);
        }
    }

    /// Publishes a display-name update.
    pub fn rename(&self, display_name: impl Into<String>) {
        self.publish(PipelineEvent::rename(display_name));
    }

    /// Publishes a links update.
    pub fn links(&self, links: Vec<Link>) {
        self.publish(PipelineEvent::links(links));
    }

    /// Registers a secret to be masked in later messages.
    pub fn conceal(&self, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        let mut secrets = self.inner.secrets.write();
        if !secrets.contains(&secret) {
            secrets.push(secret);
        }
    }

    /// Masks registered secrets and strips ANSI escapes.
    #[must_use]
    pub fn sanitize(&self, message: &str) -> String {
        sanitize(message, &self.inner.secrets.read())
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("secrets", &self.inner.secrets.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;

    #[test]
    fn test_publish_in_order() {
        let sink = Arc::new(CollectingEventSink::new());
        let publisher = EventPublisher::new(sink.clone());
        publisher.publish(PipelineEvent::start("A", None, None));
        publisher.publish_all(vec![
            PipelineEvent::end("A", None, None),
            PipelineEvent::start("B", None, None),
        ]);
        let kinds: Vec<_> = sink.events().iter().map(PipelineEvent::kind).collect();
        assert_eq!(kinds, ["StartStageEvent", "EndStageEvent", "StartStageEvent"]);
    }

    #[test]
    fn test_conceal_shared_between_clones() {
        let publisher = EventPublisher::new(Arc::new(CollectingEventSink::new()));
        let clone = publisher.clone();
        clone.conceal("hunter2");
        clone.conceal("");
        assert_eq!(publisher.sanitize("pw=hunter2"), "pw=******");
        assert_eq!(publisher.sanitize("plain"), "plain");
    }
}
