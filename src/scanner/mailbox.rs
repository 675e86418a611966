//! 生产端背压：单槽邮箱 + 抽帧

use log::debug;

/// What happened to an offered frame.
#[derive(Debug, PartialEq)]
pub enum Offer<T> {
    /// Nothing in flight; send it now.
    Dispatch(T),
    /// Parked as the pending frame.
    Held,
    /// Parked; the previously pending frame is handed back as dropped.
    Replaced(T),
}

/// At most one frame in flight and one pending. A newer frame evicts the
/// pending one instead of queueing behind it.
#[derive(Debug)]
pub struct FrameMailbox<T> {
    busy: bool,
    pending: Option<T>,
    superseded: u64,
}

impl<T> FrameMailbox<T> {
    pub fn new() -> Self {
        Self {
            busy: false,
            pending: None,
            superseded: 0,
        }
    }

    pub fn offer(&mut self, frame: T) -> Offer<T> {
        if !self.busy {
            self.busy = true;
            return Offer::Dispatch(frame);
        }
        match self.pending.replace(frame) {
            Some(dropped) => {
                self.superseded += 1;
                debug!("📭 Pending frame superseded ({} total)", self.superseded);
                Offer::Replaced(dropped)
            }
            None => Offer::Held,
        }
    }

    /// The in-flight frame finished (results, timeout or error).
    ///
    /// Returns the pending frame to dispatch next, if any; the mailbox stays busy with it.
    pub fn complete(&mut self) -> Option<T> {
        let next = self.pending.take();
        self.busy = next.is_some();
        next
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

impl<T> Default for FrameMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards every n-th captured frame.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: u32,
    seen: u64,
}

impl FrameSampler {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            seen: 0,
        }
    }

    /// Count a captured frame; true if it should be forwarded.
    pub fn accept(&mut self) -> bool {
        self.seen += 1;
        self.seen % self.interval as u64 == 0
    }

    /// 0 is treated as 1.
    pub fn set_interval(&mut self, interval: u32) {
        self.interval = interval.max(1);
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}
