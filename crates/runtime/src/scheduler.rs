use std::cell::Cell;
use std::rc::Rc;

use foundation::time::Time;

use crate::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

/// When a scheduled task becomes runnable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Due {
    /// The first frame whose index is greater than `after`.
    /// `None` means "the first frame the scheduler ever sees".
    NextFrame { after: Option<u64> },
    /// The first frame whose time is at or past the deadline.
    At(Time),
}

/// Handle to a deferred task.
///
/// Cancelling is idempotent and takes effect before the next
/// [`Scheduler::run_frame`]; a cancelled task's payload is dropped unseen.
#[derive(Debug, Clone)]
pub struct Scheduled {
    id: TaskId,
    cancelled: Rc<Cell<bool>>,
}

impl Scheduled {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

#[derive(Debug)]
struct Entry<T> {
    id: TaskId,
    due: Due,
    payload: T,
    cancelled: Rc<Cell<bool>>,
}

/// Deterministic, single-threaded deferral of work to later frames.
///
/// Ordering contract:
/// - `run_frame` yields due payloads in scheduling order (`TaskId` ascending).
/// - Tasks scheduled while a frame's payloads are being handled run no
///   earlier than the next frame.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    last: Option<Frame>,
    tasks: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            last: None,
            tasks: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent frame passed to [`Scheduler::run_frame`].
    pub fn last_frame(&self) -> Option<Frame> {
        self.last
    }

    pub fn now(&self) -> Time {
        self.last.map(|f| f.time).unwrap_or(Time::ZERO)
    }

    /// Number of tasks still waiting (cancelled tasks excluded).
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|t| !t.cancelled.get()).count()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Defer `payload` to the next animation frame.
    pub fn next_frame(&mut self, payload: T) -> Scheduled {
        let after = self.last.map(|f| f.index);
        self.push(Due::NextFrame { after }, payload)
    }

    /// Defer `payload` by at least `delay_ms`. A zero delay means next frame.
    pub fn after_ms(&mut self, delay_ms: u64, payload: T) -> Scheduled {
        if delay_ms == 0 {
            return self.next_frame(payload);
        }
        let due = Due::At(self.now().after_millis(delay_ms));
        self.push(due, payload)
    }

    /// Cancel every pending task. Returns how many were still live.
    pub fn cancel_all(&mut self) -> usize {
        let live = self.pending();
        for t in &self.tasks {
            t.cancelled.set(true);
        }
        self.tasks.clear();
        live
    }

    /// Advance the clock to `frame` and take every task that is now due.
    pub fn run_frame(&mut self, frame: Frame) -> Vec<T> {
        self.last = Some(frame);

        let mut due = Vec::new();
        let mut keep = Vec::with_capacity(self.tasks.len());
        for entry in self.tasks.drain(..) {
            if entry.cancelled.get() {
                continue;
            }
            if is_due(entry.due, frame) {
                due.push(entry);
            } else {
                keep.push(entry);
            }
        }
        self.tasks = keep;

        due.sort_by_key(|e| e.id);
        due.into_iter()
            .map(|e| {
                // Consumed tasks report as cancelled so stale handles are inert.
                e.cancelled.set(true);
                e.payload
            })
            .collect()
    }

    fn push(&mut self, due: Due, payload: T) -> Scheduled {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let cancelled = Rc::new(Cell::new(false));
        self.tasks.push(Entry {
            id,
            due,
            payload,
            cancelled: Rc::clone(&cancelled),
        });
        Scheduled { id, cancelled }
    }
}

fn is_due(due: Due, frame: Frame) -> bool {
    match due {
        Due::NextFrame { after: None } => true,
        Due::NextFrame { after: Some(idx) } => frame.index > idx,
        Due::At(t) => frame.time >= t,
    }
}
