use crate::HookResult;
use crate::hooks::{EventKind, HookFn, HookSlots};
use crate::stats::GcStats;
use log::trace;
use parking_lot::RwLock;
use std::fmt;

/// In-process hook table with the runtime's one-callback-per-event shape.
///
/// Each slot is read and cloned before the hook runs, so a hook may rewrite
/// the slots while it is being fired.
pub struct RuntimeHooks<S> {
    slots: [RwLock<Option<HookFn<S>>>; 3],
}

impl<S> RuntimeHooks<S> {
    pub fn new() -> Self {
        Self {
            slots: [RwLock::new(None), RwLock::new(None), RwLock::new(None)],
        }
    }

    /// Invokes the hook in `kind`'s slot. An empty slot is a no-op.
    pub fn fire(&self, kind: EventKind, stats: &S) -> HookResult<()> {
        let hook = self.slots[kind.index()].read().clone();
        match hook {
            Some(hook) => hook(stats),
            None => {
                trace!("no hook installed in {kind}");
                Ok(())
            }
        }
    }

    pub fn fire_minor(&self, stats: &S) -> HookResult<()> {
        self.fire(EventKind::Minor, stats)
    }

    pub fn fire_collect_step(&self, stats: &S) -> HookResult<()> {
        self.fire(EventKind::CollectStep, stats)
    }

    pub fn fire_collect(&self, stats: &S) -> HookResult<()> {
        self.fire(EventKind::Collect, stats)
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            *slot.write() = None;
        }
    }
}

impl<S> HookSlots<S> for RuntimeHooks<S> {
    fn slot(&self, kind: EventKind) -> Option<HookFn<S>> {
        self.slots[kind.index()].read().clone()
    }

    fn set_slot(&self, kind: EventKind, hook: Option<HookFn<S>>) {
        *self.slots[kind.index()].write() = hook;
    }
}

impl<S> Default for RuntimeHooks<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for RuntimeHooks<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHooks")
            .field("on_gc_minor", &self.is_installed(EventKind::Minor))
            .field("on_gc_collect_step", &self.is_installed(EventKind::CollectStep))
            .field("on_gc_collect", &self.is_installed(EventKind::Collect))
            .finish()
    }
}

/// Process-wide hook table fired by the native runtime through [`crate::ffi`].
pub mod global {
    use super::*;
    use std::sync::OnceLock;

    static HOOKS: OnceLock<RuntimeHooks<GcStats>> = OnceLock::new();

    pub fn hooks() -> &'static RuntimeHooks<GcStats> {
        HOOKS.get_or_init(RuntimeHooks::new)
    }

    /// Fires the slot matching the payload's kind.
    pub fn fire(stats: impl Into<GcStats>) -> HookResult<()> {
        let stats = stats.into();
        hooks().fire(stats.kind(), &stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_empty_slots_are_noops() {
        let hooks: RuntimeHooks<u32> = RuntimeHooks::new();
        for kind in EventKind::ALL {
            assert!(!hooks.is_installed(kind));
            assert!(hooks.fire(kind, &1).is_ok());
        }
    }

    #[test]
    fn test_set_slot_replaces_occupant() {
        let hooks: RuntimeHooks<u32> = RuntimeHooks::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        hooks.set_slot(
            EventKind::Collect,
            Some(Arc::new(move |stats: &u32| -> HookResult<()> {
                first.lock().push(("first", *stats));
                Ok(())
            })),
        );
        let second = Arc::clone(&seen);
        hooks.set_slot(
            EventKind::Collect,
            Some(Arc::new(move |stats: &u32| -> HookResult<()> {
                second.lock().push(("second", *stats));
                Ok(())
            })),
        );

        hooks.fire_collect(&7).unwrap();
        hooks.fire_minor(&8).unwrap();
        assert_eq!(*seen.lock(), vec![("second", 7)]);
    }

    #[test]
    fn test_fire_returns_hook_error() {
        let hooks: RuntimeHooks<u32> = RuntimeHooks::new();
        hooks.set_slot(
            EventKind::CollectStep,
            Some(Arc::new(|stats: &u32| -> HookResult<()> {
                Err(HookError::InvalidEventKind(*stats as i32))
            })),
        );

        assert!(matches!(
            hooks.fire_collect_step(&9),
            Err(HookError::InvalidEventKind(9))
        ));
    }

    #[test]
    fn test_clear() {
        let hooks: RuntimeHooks<u32> = RuntimeHooks::new();
        for kind in EventKind::ALL {
            hooks.set_slot(kind, Some(Arc::new(|_: &u32| -> HookResult<()> { Ok(()) })));
        }
        assert_eq!(
            format!("{hooks:?}"),
            "RuntimeHooks { on_gc_minor: true, on_gc_collect_step: true, on_gc_collect: true }"
        );

        hooks.clear();
        for kind in EventKind::ALL {
            assert!(hooks.slot(kind).is_none());
        }
    }
}
