//! Ready-made observers.

use crate::error::ObserverResult;
use crate::hooks::{CollectObserver, CollectStepObserver, EventKind, MinorObserver, Observer};
use log::{Level, log};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts events per kind. Subscribes to all three kinds for any payload.
#[derive(Debug, Default)]
pub struct EventCounter {
    counts: [AtomicU64; 3],
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&self, kind: EventKind) {
        self.counts[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.counts[kind.index()].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        EventKind::ALL.iter().map(|&kind| self.count(kind)).sum()
    }

    pub fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

impl<S> MinorObserver<S> for EventCounter {
    fn on_gc_minor(&self, _stats: &S) -> ObserverResult {
        self.record(EventKind::Minor);
        Ok(())
    }
}

impl<S> CollectStepObserver<S> for EventCounter {
    fn on_gc_collect_step(&self, _stats: &S) -> ObserverResult {
        self.record(EventKind::CollectStep);
        Ok(())
    }
}

impl<S> CollectObserver<S> for EventCounter {
    fn on_gc_collect(&self, _stats: &S) -> ObserverResult {
        self.record(EventKind::Collect);
        Ok(())
    }
}

impl<S: 'static> Observer<S> for EventCounter {
    fn as_minor(self: Arc<Self>) -> Option<Arc<dyn MinorObserver<S>>> {
        Some(self)
    }

    fn as_collect_step(self: Arc<Self>) -> Option<Arc<dyn CollectStepObserver<S>>> {
        Some(self)
    }

    fn as_collect(self: Arc<Self>) -> Option<Arc<dyn CollectObserver<S>>> {
        Some(self)
    }
}

/// Logs each event with its payload through the `log` facade.
#[derive(Debug, Clone)]
pub struct LogObserver {
    level: Level,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::with_level(Level::Debug)
    }

    pub fn with_level(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    fn emit(&self, kind: EventKind, stats: &dyn Debug) -> ObserverResult {
        log!(self.level, "{kind}: {stats:?}");
        Ok(())
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Debug> MinorObserver<S> for LogObserver {
    fn on_gc_minor(&self, stats: &S) -> ObserverResult {
        self.emit(EventKind::Minor, stats)
    }
}

impl<S: Debug> CollectStepObserver<S> for LogObserver {
    fn on_gc_collect_step(&self, stats: &S) -> ObserverResult {
        self.emit(EventKind::CollectStep, stats)
    }
}

impl<S: Debug> CollectObserver<S> for LogObserver {
    fn on_gc_collect(&self, stats: &S) -> ObserverResult {
        self.emit(EventKind::Collect, stats)
    }
}

impl<S: Debug + 'static> Observer<S> for LogObserver {
    fn as_minor(self: Arc<Self>) -> Option<Arc<dyn MinorObserver<S>>> {
        Some(self)
    }

    fn as_collect_step(self: Arc<Self>) -> Option<Arc<dyn CollectStepObserver<S>>> {
        Some(self)
    }

    fn as_collect(self: Arc<Self>) -> Option<Arc<dyn CollectObserver<S>>> {
        Some(self)
    }
}
