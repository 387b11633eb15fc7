//! Registry of open host windows.
//!
//! The contrast coordinator only consults the count; the ids let events and
//! tickers be tagged with the window they belong to.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

/// Identifier of one open host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostWindowId(pub u64);

impl fmt::Display for HostWindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Counters shared by every clone of [`HostWindows`].
#[derive(Default)]
struct Counts {
    /// Windows currently open.
    open: AtomicUsize,
    /// Next id to hand out.
    next_id: AtomicU64,
}

/// Process-wide count of open host windows.
#[derive(Clone, Default)]
pub struct HostWindows {
    /// Shared counters.
    counts: Arc<Counts>,
}

impl HostWindows {
    /// A registry with no windows open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened window. It counts as open until the guard drops.
    pub fn open(&self) -> HostWindowGuard {
        let id = self.counts.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.counts.open.fetch_add(1, Ordering::SeqCst);
        HostWindowGuard {
            id: HostWindowId(id),
            windows: self.clone(),
        }
    }

    /// Number of windows currently open.
    pub fn count(&self) -> usize {
        self.counts.open.load(Ordering::SeqCst)
    }
}

/// Keeps one host window registered in [`HostWindows`].
pub struct HostWindowGuard {
    /// Id of the registered window.
    id: HostWindowId,
    /// Registry to decrement on drop.
    windows: HostWindows,
}

impl HostWindowGuard {
    /// Id of this window.
    pub fn id(&self) -> HostWindowId {
        self.id
    }
}

impl fmt::Debug for HostWindowGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostWindowGuard").field(&self.id).finish()
    }
}

impl Drop for HostWindowGuard {
    fn drop(&mut self) {
        self.windows.counts.open.fetch_sub(1, Ordering::SeqCst);
    }
}
