//! Capability descriptor for the GC hook events.
//!
//! A host runtime exposes exactly one hook slot per [`EventKind`]. Observers
//! opt into any subset of the three kinds by implementing the matching
//! per-kind trait and answering the [`Observer`] capability query for it.

use crate::HookResult;
use crate::error::ObserverResult;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Minor,
    CollectStep,
    Collect,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Minor, EventKind::CollectStep, EventKind::Collect];

    /// Name of the runtime hook slot for this kind.
    pub fn attr_name(self) -> &'static str {
        match self {
            EventKind::Minor => "on_gc_minor",
            EventKind::CollectStep => "on_gc_collect_step",
            EventKind::Collect => "on_gc_collect",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attr_name())
    }
}

/// Identity of a registered observer: the address of its `Arc` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId {
    addr: usize,
}

impl ObserverId {
    pub fn of<O: ?Sized>(observer: &Arc<O>) -> Self {
        Self {
            addr: Arc::as_ptr(observer) as *const () as usize,
        }
    }

    pub fn from_raw(addr: usize) -> Self {
        Self { addr }
    }

    pub fn as_usize(&self) -> usize {
        self.addr
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.addr)
    }
}

pub trait MinorObserver<S>: Send + Sync {
    fn on_gc_minor(&self, stats: &S) -> ObserverResult;
}

pub trait CollectStepObserver<S>: Send + Sync {
    fn on_gc_collect_step(&self, stats: &S) -> ObserverResult;
}

pub trait CollectObserver<S>: Send + Sync {
    fn on_gc_collect(&self, stats: &S) -> ObserverResult;
}

/// Capability query answered once per kind when an observer is added.
///
/// Each method defaults to `None`. An observer overrides the ones for the
/// kinds it implements, usually with `Some(self)`:
///
/// ```
/// use std::sync::Arc;
/// use gc_multihook::error::ObserverResult;
/// use gc_multihook::hooks::{MinorObserver, Observer};
///
/// struct Nursery;
///
/// impl MinorObserver<u64> for Nursery {
///     fn on_gc_minor(&self, _stats: &u64) -> ObserverResult {
///         Ok(())
///     }
/// }
///
/// impl Observer<u64> for Nursery {
///     fn as_minor(self: Arc<Self>) -> Option<Arc<dyn MinorObserver<u64>>> {
///         Some(self)
///     }
/// }
/// ```
pub trait Observer<S>: Send + Sync + 'static {
    fn as_minor(self: Arc<Self>) -> Option<Arc<dyn MinorObserver<S>>> {
        None
    }

    fn as_collect_step(self: Arc<Self>) -> Option<Arc<dyn CollectStepObserver<S>>> {
        None
    }

    fn as_collect(self: Arc<Self>) -> Option<Arc<dyn CollectObserver<S>>> {
        None
    }
}

/// The callable a runtime hook slot holds.
pub type HookFn<S> = Arc<dyn Fn(&S) -> HookResult<()> + Send + Sync>;

/// The host runtime's hook object: one slot per [`EventKind`], each empty or
/// holding a single [`HookFn`]. Writing a slot replaces its occupant.
pub trait HookSlots<S> {
    fn slot(&self, kind: EventKind) -> Option<HookFn<S>>;

    fn set_slot(&self, kind: EventKind, hook: Option<HookFn<S>>);

    fn is_installed(&self, kind: EventKind) -> bool {
        self.slot(kind).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyCollect;

    impl CollectObserver<()> for OnlyCollect {
        fn on_gc_collect(&self, _stats: &()) -> ObserverResult {
            Ok(())
        }
    }

    impl Observer<()> for OnlyCollect {
        fn as_collect(self: Arc<Self>) -> Option<Arc<dyn CollectObserver<()>>> {
            Some(self)
        }
    }

    #[test]
    fn test_attr_names() {
        assert_eq!(EventKind::Minor.attr_name(), "on_gc_minor");
        assert_eq!(EventKind::CollectStep.to_string(), "on_gc_collect_step");
        assert_eq!(EventKind::Collect.attr_name(), "on_gc_collect");
    }

    #[test]
    fn test_index_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(EventKind::from_index(3), None);
    }

    #[test]
    fn test_capability_defaults() {
        let observer = Arc::new(OnlyCollect);
        assert!(observer.clone().as_minor().is_none());
        assert!(observer.clone().as_collect_step().is_none());
        assert!(observer.as_collect().is_some());
    }

    #[test]
    fn test_observer_identity() {
        let a = Arc::new(OnlyCollect);
        let b = Arc::new(OnlyCollect);
        assert_eq!(ObserverId::of(&a), ObserverId::of(&a.clone()));
        assert_ne!(ObserverId::of(&a), ObserverId::of(&b));
    }
}
