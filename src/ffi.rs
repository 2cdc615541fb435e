//! C entry points through which a native runtime reports GC events.
//!
//! Each `gc_hooks_fire_*` function fires the matching slot of
//! [`runtime::global::hooks`](crate::runtime::global::hooks); install a
//! [`MultiHook`](crate::MultiHook) there to fan the events out.

use crate::HookResult;
use crate::error::HookError;
use crate::hooks::{EventKind, HookSlots};
use crate::runtime::global;
use crate::stats::{CollectStats, CollectStepStats, GcState, GcStats, MinorStats};
use log::error;
use std::ffi::c_int;
use std::panic::{self, AssertUnwindSafe};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookReturnCode {
    Success = 0,
    ErrorNullPointer = -1,
    ErrorInvalidKind = -2,
    ErrorCallbackFailed = -3,
    ErrorInvalidState = -4,
    ErrorInternal = -5,
}

impl From<HookResult<()>> for HookReturnCode {
    fn from(result: HookResult<()>) -> Self {
        match result {
            Ok(()) => HookReturnCode::Success,
            Err(e) => {
                error!("GC hook failed: {e}");
                match e {
                    HookError::InvalidEventKind(_) => HookReturnCode::ErrorInvalidKind,
                    HookError::CallbackFailed { .. }
                    | HookError::CallbackPanicked { .. }
                    | HookError::Dispatch(_) => HookReturnCode::ErrorCallbackFailed,
                    _ => HookReturnCode::ErrorInternal,
                }
            }
        }
    }
}

/// C layout of [`CollectStepStats`]; states are raw [`GcState`] values.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectStepRecord {
    pub count: u64,
    pub duration: u64,
    pub duration_min: u64,
    pub duration_max: u64,
    pub oldstate: u32,
    pub newstate: u32,
    pub major_is_done: c_int,
}

impl CollectStepRecord {
    pub fn to_stats(&self) -> Option<CollectStepStats> {
        Some(CollectStepStats {
            count: self.count,
            duration: self.duration,
            duration_min: self.duration_min,
            duration_max: self.duration_max,
            oldstate: GcState::from_raw(self.oldstate)?,
            newstate: GcState::from_raw(self.newstate)?,
            major_is_done: self.major_is_done != 0,
        })
    }
}

/// Fires the global slot for `stats` without letting a panic cross the C
/// boundary. Hooks installed by a `MultiHook` already catch their own
/// panics; this covers any other `HookFn` placed in a slot.
fn fire_guarded(stats: impl Into<GcStats>) -> HookReturnCode {
    let stats = stats.into();
    match panic::catch_unwind(AssertUnwindSafe(|| global::fire(stats))) {
        Ok(result) => result.into(),
        Err(_) => {
            error!("GC hook for {} panicked", stats.kind());
            HookReturnCode::ErrorCallbackFailed
        }
    }
}

fn kind_from_raw(kind: c_int) -> HookResult<EventKind> {
    usize::try_from(kind)
        .ok()
        .and_then(EventKind::from_index)
        .ok_or(HookError::InvalidEventKind(kind))
}

/// # Safety
///
/// `stats` must be null or point to a valid `MinorStats`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gc_hooks_fire_minor(stats: *const MinorStats) -> HookReturnCode {
    match unsafe { stats.as_ref() } {
        Some(stats) => fire_guarded(*stats),
        None => HookReturnCode::ErrorNullPointer,
    }
}

/// # Safety
///
/// `stats` must be null or point to a valid `CollectStepRecord`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gc_hooks_fire_collect_step(
    stats: *const CollectStepRecord,
) -> HookReturnCode {
    let Some(record) = (unsafe { stats.as_ref() }) else {
        return HookReturnCode::ErrorNullPointer;
    };

    match record.to_stats() {
        Some(stats) => fire_guarded(stats),
        None => HookReturnCode::ErrorInvalidState,
    }
}

/// # Safety
///
/// `stats` must be null or point to a valid `CollectStats`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gc_hooks_fire_collect(stats: *const CollectStats) -> HookReturnCode {
    match unsafe { stats.as_ref() } {
        Some(stats) => fire_guarded(*stats),
        None => HookReturnCode::ErrorNullPointer,
    }
}

/// Returns 1 if a hook is installed for `kind` (0 = minor, 1 = collect step,
/// 2 = collect), 0 if not, or `ErrorInvalidKind` for any other value.
#[unsafe(no_mangle)]
pub extern "C" fn gc_hooks_is_installed(kind: c_int) -> c_int {
    match kind_from_raw(kind) {
        Ok(kind) => c_int::from(global::hooks().is_installed(kind)),
        Err(_) => HookReturnCode::ErrorInvalidKind as c_int,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn gc_hooks_clear() -> HookReturnCode {
    global::hooks().clear();
    HookReturnCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MultiHook;
    use crate::error::ObserverResult;
    use crate::hooks::{CollectStepObserver, Observer};
    use crate::observers::EventCounter;
    use crate::stats::GcStats;
    use memoffset::offset_of;
    use parking_lot::Mutex;
    use std::sync::Arc;

    // The global slot table is shared by every test in this module.
    static GLOBAL: Mutex<()> = parking_lot::const_mutex(());

    #[test]
    fn test_record_layout() {
        assert_eq!(offset_of!(MinorStats, count), 0);
        assert_eq!(offset_of!(MinorStats, pinned_objects), 40);
        assert_eq!(offset_of!(CollectStats, rawmalloc_bytes_after), 48);
        assert_eq!(offset_of!(CollectStepRecord, oldstate), 32);
        assert_eq!(offset_of!(CollectStepRecord, major_is_done), 40);
    }

    #[test]
    fn test_fire_reaches_installed_multihook() {
        let _guard = GLOBAL.lock();
        let mh = Arc::new(MultiHook::<GcStats>::new());
        let counter = Arc::new(EventCounter::new());
        mh.add(&counter);
        mh.install(global::hooks());
        assert_eq!(gc_hooks_is_installed(0), 1);

        let minor = MinorStats {
            count: 1,
            duration: 120,
            duration_min: 120,
            duration_max: 120,
            total_memory_used: 1 << 20,
            pinned_objects: 0,
        };
        let step = CollectStepRecord {
            count: 1,
            oldstate: GcState::Marking as u32,
            newstate: GcState::Sweeping as u32,
            ..Default::default()
        };
        let collect = CollectStats::default();

        unsafe {
            assert_eq!(gc_hooks_fire_minor(&minor), HookReturnCode::Success);
            assert_eq!(gc_hooks_fire_collect_step(&step), HookReturnCode::Success);
            assert_eq!(gc_hooks_fire_collect(&collect), HookReturnCode::Success);
        }
        assert_eq!(counter.count(EventKind::Minor), 1);
        assert_eq!(counter.count(EventKind::CollectStep), 1);
        assert_eq!(counter.count(EventKind::Collect), 1);

        assert_eq!(gc_hooks_clear(), HookReturnCode::Success);
        assert_eq!(gc_hooks_is_installed(0), 0);
        unsafe {
            assert_eq!(gc_hooks_fire_minor(&minor), HookReturnCode::Success);
        }
        assert_eq!(counter.count(EventKind::Minor), 1);
    }

    #[test]
    fn test_null_and_invalid_inputs() {
        let _guard = GLOBAL.lock();
        unsafe {
            assert_eq!(
                gc_hooks_fire_minor(std::ptr::null()),
                HookReturnCode::ErrorNullPointer
            );
            assert_eq!(
                gc_hooks_fire_collect_step(std::ptr::null()),
                HookReturnCode::ErrorNullPointer
            );
            assert_eq!(
                gc_hooks_fire_collect(std::ptr::null()),
                HookReturnCode::ErrorNullPointer
            );

            let bad_state = CollectStepRecord {
                oldstate: 9,
                ..Default::default()
            };
            assert_eq!(
                gc_hooks_fire_collect_step(&bad_state),
                HookReturnCode::ErrorInvalidState
            );
        }
        assert_eq!(gc_hooks_is_installed(3), HookReturnCode::ErrorInvalidKind as c_int);
        assert_eq!(gc_hooks_is_installed(-1), HookReturnCode::ErrorInvalidKind as c_int);
    }

    struct RejectSteps;

    impl CollectStepObserver<GcStats> for RejectSteps {
        fn on_gc_collect_step(&self, stats: &GcStats) -> ObserverResult {
            Err(format!("unexpected step {stats:?}").into())
        }
    }

    impl Observer<GcStats> for RejectSteps {
        fn as_collect_step(self: Arc<Self>) -> Option<Arc<dyn CollectStepObserver<GcStats>>> {
            Some(self)
        }
    }

    #[test]
    fn test_callback_failure_code() {
        let _guard = GLOBAL.lock();
        let mh = Arc::new(MultiHook::<GcStats>::new());
        mh.add(&Arc::new(RejectSteps));
        mh.install(global::hooks());

        let step = CollectStepRecord::default();
        let code = unsafe { gc_hooks_fire_collect_step(&step) };
        assert_eq!(code, HookReturnCode::ErrorCallbackFailed);

        mh.uninstall(global::hooks());
    }

    #[test]
    fn test_panicking_slot_hook_maps_to_failure_code() {
        let _guard = GLOBAL.lock();
        global::hooks().set_slot(
            EventKind::Collect,
            Some(Arc::new(|_: &GcStats| -> HookResult<()> {
                panic!("foreign hook exploded");
            })),
        );

        let collect = CollectStats::default();
        let code = unsafe { gc_hooks_fire_collect(&collect) };
        assert_eq!(code, HookReturnCode::ErrorCallbackFailed);

        assert_eq!(gc_hooks_clear(), HookReturnCode::Success);
    }
}
