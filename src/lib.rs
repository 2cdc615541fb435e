//! GC hook multiplexer
//!
//! A garbage-collecting runtime exposes one callback slot per GC event
//! (minor collection, incremental collect step, full collection). This crate
//! lets any number of observers share those slots: observers register with a
//! [`MultiHook`], which is installed into the slots and fans every event out
//! to its observers in registration order.

pub mod error;
pub mod ffi;
pub mod hooks;
pub mod multihook;
pub mod observers;
pub mod runtime;
pub mod stats;

pub use error::{HookError, ObserverError, ObserverResult};
pub use hooks::{
    CollectObserver, CollectStepObserver, EventKind, HookFn, HookSlots, MinorObserver, Observer,
    ObserverId,
};
pub use multihook::{DispatchPolicy, MultiHook};
pub use runtime::RuntimeHooks;
pub use stats::{CollectStats, CollectStepStats, GcState, GcStats, MinorStats};

pub type HookResult<T> = Result<T, HookError>;
