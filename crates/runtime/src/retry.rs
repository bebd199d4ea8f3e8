use crate::scheduler::{Scheduled, Scheduler};

/// A bounded series of delays (milliseconds since scheduling).
///
/// Delays are sorted and deduplicated on construction so the series always
/// fires in increasing order; `0` means "next frame".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays_ms: Vec<u64>,
}

impl RetrySchedule {
    pub fn new(delays_ms: impl IntoIterator<Item = u64>) -> Self {
        let mut delays_ms: Vec<u64> = delays_ms.into_iter().collect();
        delays_ms.sort_unstable();
        delays_ms.dedup();
        Self { delays_ms }
    }

    pub fn delays_ms(&self) -> &[u64] {
        &self.delays_ms
    }

    pub fn attempts(&self) -> usize {
        self.delays_ms.len()
    }

    /// Schedule one copy of `payload` per delay.
    pub fn schedule<T: Clone>(&self, scheduler: &mut Scheduler<T>, payload: T) -> Vec<Scheduled> {
        self.delays_ms
            .iter()
            .map(|&ms| scheduler.after_ms(ms, payload.clone()))
            .collect()
    }
}
