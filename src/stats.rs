//! Statistics records a PyPy-style incremental collector reports with each
//! hook event. The multiplexer forwards them untouched.

use std::time::Duration;

/// Phase of the incremental major collector.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GcState {
    Scanning = 0,
    Marking = 1,
    Sweeping = 2,
    Finalizing = 3,
}

impl GcState {
    pub const ALL: [GcState; 4] = [
        GcState::Scanning,
        GcState::Marking,
        GcState::Sweeping,
        GcState::Finalizing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GcState::Scanning => "SCANNING",
            GcState::Marking => "MARKING",
            GcState::Sweeping => "SWEEPING",
            GcState::Finalizing => "FINALIZING",
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// Reported after each minor (nursery) collection.
///
/// `count` is the number of collections folded into this event when the
/// runtime batches them; durations are in nanoseconds.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinorStats {
    pub count: u64,
    pub duration: u64,
    pub duration_min: u64,
    pub duration_max: u64,
    pub total_memory_used: u64,
    pub pinned_objects: u64,
}

/// Reported after each step of an incremental major collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectStepStats {
    pub count: u64,
    pub duration: u64,
    pub duration_min: u64,
    pub duration_max: u64,
    pub oldstate: GcState,
    pub newstate: GcState,
    pub major_is_done: bool,
}

/// Reported when a full major collection completes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub count: u64,
    pub num_major_collects: u64,
    pub arenas_count_before: u64,
    pub arenas_count_after: u64,
    pub arenas_bytes: u64,
    pub rawmalloc_bytes_before: u64,
    pub rawmalloc_bytes_after: u64,
}

impl MinorStats {
    pub fn total_duration(&self) -> Duration {
        Duration::from_nanos(self.duration)
    }
}

impl CollectStepStats {
    pub fn total_duration(&self) -> Duration {
        Duration::from_nanos(self.duration)
    }
}

impl CollectStats {
    pub fn arenas_freed(&self) -> u64 {
        self.arenas_count_before.saturating_sub(self.arenas_count_after)
    }

    pub fn rawmalloc_bytes_freed(&self) -> u64 {
        self.rawmalloc_bytes_before
            .saturating_sub(self.rawmalloc_bytes_after)
    }
}

/// Payload carried by the bundled runtime slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcStats {
    Minor(MinorStats),
    CollectStep(CollectStepStats),
    Collect(CollectStats),
}

impl GcStats {
    pub fn kind(&self) -> crate::hooks::EventKind {
        use crate::hooks::EventKind;
        match self {
            GcStats::Minor(_) => EventKind::Minor,
            GcStats::CollectStep(_) => EventKind::CollectStep,
            GcStats::Collect(_) => EventKind::Collect,
        }
    }

    /// Number of runtime events folded into this record.
    pub fn count(&self) -> u64 {
        match self {
            GcStats::Minor(s) => s.count,
            GcStats::CollectStep(s) => s.count,
            GcStats::Collect(s) => s.count,
        }
    }
}

impl From<MinorStats> for GcStats {
    fn from(stats: MinorStats) -> Self {
        GcStats::Minor(stats)
    }
}

impl From<CollectStepStats> for GcStats {
    fn from(stats: CollectStepStats) -> Self {
        GcStats::CollectStep(stats)
    }
}

impl From<CollectStats> for GcStats {
    fn from(stats: CollectStats) -> Self {
        GcStats::Collect(stats)
    }
}
