//! Delivery of one invalidation to many sinks.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use warden_acl::{Invalidation, InvalidationSink};

/// Forwards every invalidation to all registered sinks, in registration
/// order.
#[derive(Default)]
pub struct InvalidationFanout {
    sinks: RwLock<Vec<Arc<dyn InvalidationSink>>>,
}

impl InvalidationFanout {
    /// Create a fanout without sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub fn add_sink(&self, sink: Arc<dyn InvalidationSink>) {
        self.sinks.write().push(sink);
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    /// Whether no sink is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }
}

impl InvalidationSink for InvalidationFanout {
    fn invalidate(&self, event: &Invalidation) {
        let sinks = self.sinks.read();
        debug!(event = %event, sinks = sinks.len(), "Broadcasting invalidation");
        for sink in sinks.iter() {
            sink.invalidate(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use warden_core::id::UserId;

    #[derive(Default)]
    struct Count(Mutex<usize>);

    impl InvalidationSink for Count {
        fn invalidate(&self, _event: &Invalidation) {
            *self.0.lock() += 1;
        }
    }

    #[test]
    fn test_every_sink_receives_event() {
        let fanout = InvalidationFanout::new();
        let first = Arc::new(Count::default());
        let second = Arc::new(Count::default());
        fanout.add_sink(first.clone());
        fanout.add_sink(second.clone());

        fanout.invalidate(&Invalidation::User(UserId::from_raw(1)));
        fanout.invalidate(&Invalidation::All);

        assert_eq!(fanout.len(), 2);
        assert_eq!(*first.0.lock(), 2);
        assert_eq!(*second.0.lock(), 2);
    }
}
