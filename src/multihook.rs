//! Fan-out of the runtime's single-slot GC hooks to many observers.
//!
//! A [`MultiHook`] keeps one ordered callback list per [`EventKind`].
//! Installing it writes one dispatch closure per kind into the runtime's
//! [`HookSlots`]; each closure then calls every registered callback of its
//! kind in registration order.

use crate::HookResult;
use crate::error::{HookError, ObserverResult};
use crate::hooks::{EventKind, HookFn, HookSlots, Observer, ObserverId};
use log::{debug, trace, warn};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What a dispatch does when a callback fails or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// Stop at the first failure and return it. Later callbacks in the same
    /// dispatch are not invoked.
    #[default]
    FailFast,
    /// Invoke every callback, then return all failures as
    /// [`HookError::Dispatch`].
    Continue,
}

type Callback<S> = Arc<dyn Fn(&S) -> ObserverResult + Send + Sync>;

struct Entry<S> {
    observer: ObserverId,
    callback: Callback<S>,
}

struct Registration {
    id: ObserverId,
    // Kinds the observer answered for when it was added; removal uses these
    // so it always undoes exactly what `add` pushed.
    implements: [bool; 3],
    // Keeps the allocation alive so its address cannot be reused by another
    // observer while this one is registered.
    _observer: Arc<dyn Any + Send + Sync>,
}

struct CallbackLists<S> {
    registrations: Vec<Registration>,
    lists: [Vec<Entry<S>>; 3],
}

impl<S> CallbackLists<S> {
    fn new() -> Self {
        Self {
            registrations: Vec::new(),
            lists: [Vec::new(), Vec::new(), Vec::new()],
        }
    }
}

pub struct MultiHook<S> {
    callbacks: RwLock<CallbackLists<S>>,
    policy: DispatchPolicy,
}

impl<S: 'static> MultiHook<S> {
    pub fn new() -> Self {
        Self::with_policy(DispatchPolicy::default())
    }

    pub fn with_policy(policy: DispatchPolicy) -> Self {
        Self {
            callbacks: RwLock::new(CallbackLists::new()),
            policy,
        }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Registers `observer` for every event kind it implements.
    ///
    /// Never fails. An observer implementing no kind is still recorded, so a
    /// later [`remove`](Self::remove) succeeds. Adding the same observer
    /// twice appends its callbacks twice.
    pub fn add<O: Observer<S>>(&self, observer: &Arc<O>) {
        let id = ObserverId::of(observer);
        let hooks = capabilities::<S, O>(observer);
        let implements = [hooks[0].is_some(), hooks[1].is_some(), hooks[2].is_some()];

        let mut callbacks = self.callbacks.write();
        callbacks.registrations.push(Registration {
            id,
            implements,
            _observer: Arc::clone(observer) as Arc<dyn Any + Send + Sync>,
        });
        for (kind, hook) in EventKind::ALL.into_iter().zip(hooks) {
            if let Some(callback) = hook {
                callbacks.lists[kind.index()].push(Entry {
                    observer: id,
                    callback,
                });
            }
        }

        debug!(
            "added observer {id}, {} observer(s) registered",
            callbacks.registrations.len()
        );
    }

    /// Removes one registration of `observer`: the first occurrence in the
    /// registration order and the first callback of each kind it answered
    /// for when that registration was added. The observer is not queried
    /// again.
    ///
    /// Nothing is modified unless every lookup succeeds.
    pub fn remove<O: Observer<S>>(&self, observer: &Arc<O>) -> HookResult<()> {
        let id = ObserverId::of(observer);

        let mut callbacks = self.callbacks.write();
        let registration = callbacks
            .registrations
            .iter()
            .position(|r| r.id == id)
            .ok_or(HookError::ObserverNotFound(id))?;
        let implements = callbacks.registrations[registration].implements;

        let mut positions = [None; 3];
        for kind in EventKind::ALL {
            if !implements[kind.index()] {
                continue;
            }
            let position = callbacks.lists[kind.index()]
                .iter()
                .position(|entry| entry.observer == id)
                .ok_or(HookError::CallbackNotFound(kind))?;
            positions[kind.index()] = Some(position);
        }

        callbacks.registrations.remove(registration);
        for (list, position) in callbacks.lists.iter_mut().zip(positions) {
            if let Some(position) = position {
                list.remove(position);
            }
        }

        debug!("removed observer {id}");
        Ok(())
    }

    /// Observers whose callbacks are registered for `kind`, in call order.
    pub fn callbacks(&self, kind: EventKind) -> Vec<ObserverId> {
        self.callbacks.read().lists[kind.index()]
            .iter()
            .map(|entry| entry.observer)
            .collect()
    }

    pub fn minor_callbacks(&self) -> Vec<ObserverId> {
        self.callbacks(EventKind::Minor)
    }

    pub fn collect_step_callbacks(&self) -> Vec<ObserverId> {
        self.callbacks(EventKind::CollectStep)
    }

    pub fn collect_callbacks(&self) -> Vec<ObserverId> {
        self.callbacks(EventKind::Collect)
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.callbacks.read().lists[kind.index()].len()
    }

    pub fn observer_count(&self) -> usize {
        self.callbacks.read().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observer_count() == 0
    }

    /// Calls every `kind` callback with `stats`, in registration order.
    ///
    /// The list is snapshotted before the first call and no lock is held
    /// while callbacks run, so a callback may add or remove observers; the
    /// change is seen by the next dispatch. Panics are caught and reported as
    /// [`HookError::CallbackPanicked`]. Failures are handled per
    /// [`DispatchPolicy`].
    pub fn dispatch(&self, kind: EventKind, stats: &S) -> HookResult<()> {
        let snapshot: Vec<Callback<S>> = self.callbacks.read().lists[kind.index()]
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        trace!("dispatching {kind} to {} callback(s)", snapshot.len());

        let mut failures = Vec::new();
        for (index, callback) in snapshot.iter().enumerate() {
            let error = match panic::catch_unwind(AssertUnwindSafe(|| callback(stats))) {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => HookError::CallbackFailed {
                    kind,
                    index,
                    source,
                },
                Err(payload) => HookError::CallbackPanicked {
                    kind,
                    index,
                    message: panic_message(&*payload),
                },
            };

            match self.policy {
                DispatchPolicy::FailFast => return Err(error),
                DispatchPolicy::Continue => {
                    warn!("{error}");
                    failures.push(error);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HookError::Dispatch(failures))
        }
    }

    pub fn dispatch_minor(&self, stats: &S) -> HookResult<()> {
        self.dispatch(EventKind::Minor, stats)
    }

    pub fn dispatch_collect_step(&self, stats: &S) -> HookResult<()> {
        self.dispatch(EventKind::CollectStep, stats)
    }

    pub fn dispatch_collect(&self, stats: &S) -> HookResult<()> {
        self.dispatch(EventKind::Collect, stats)
    }

    /// The dispatch closure for `kind`, suitable for a runtime hook slot.
    pub fn hook_fn(self: &Arc<Self>, kind: EventKind) -> HookFn<S> {
        let multihook = Arc::clone(self);
        Arc::new(move |stats: &S| multihook.dispatch(kind, stats))
    }

    /// Writes this multiplexer's dispatch closures into all three slots.
    ///
    /// Whatever the slots held before is dropped.
    pub fn install<H: HookSlots<S> + ?Sized>(self: &Arc<Self>, slots: &H) {
        for kind in EventKind::ALL {
            if slots.is_installed(kind) {
                warn!("replacing the hook installed in {kind}");
            }
            slots.set_slot(kind, Some(self.hook_fn(kind)));
        }
        debug!("installed multihook with {} observer(s)", self.observer_count());
    }

    /// Empties all three slots.
    pub fn uninstall<H: HookSlots<S> + ?Sized>(&self, slots: &H) {
        for kind in EventKind::ALL {
            slots.set_slot(kind, None);
        }
        debug!("uninstalled multihook");
    }
}

impl<S: 'static> Default for MultiHook<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for MultiHook<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callbacks = self.callbacks.read();
        f.debug_struct("MultiHook")
            .field("policy", &self.policy)
            .field("observers", &callbacks.registrations.len())
            .field("minor", &callbacks.lists[0].len())
            .field("collect_step", &callbacks.lists[1].len())
            .field("collect", &callbacks.lists[2].len())
            .finish()
    }
}

fn capabilities<S: 'static, O: Observer<S>>(observer: &Arc<O>) -> [Option<Callback<S>>; 3] {
    let minor = Arc::clone(observer).as_minor().map(|hook| {
        Arc::new(move |stats: &S| hook.on_gc_minor(stats)) as Callback<S>
    });
    let collect_step = Arc::clone(observer).as_collect_step().map(|hook| {
        Arc::new(move |stats: &S| hook.on_gc_collect_step(stats)) as Callback<S>
    });
    let collect = Arc::clone(observer).as_collect().map(|hook| {
        Arc::new(move |stats: &S| hook.on_gc_collect(stats)) as Callback<S>
    });
    [minor, collect_step, collect]
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
