// SPDX-License-Identifier: CEPL-1.0
use std::time::Duration;

/// Collected per-frame render times. Reported once when the loop ends.
#[derive(Debug, Default)]
pub struct FrameStats {
    samples: Vec<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    pub frames: usize,
    pub average_us: u64,
    pub max_us: u64,
    pub min_us: u64,
}

impl FrameSummary {
    pub fn max_difference_us(&self) -> u64 {
        self.max_us - self.min_us
    }
}

impl FrameStats {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            samples: Vec::with_capacity(frames),
        }
    }

    pub fn record(&mut self, frame_time: Duration) {
        let us = u64::try_from(frame_time.as_micros()).unwrap_or(u64::MAX);
        self.samples.push(us);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `None` until at least one frame was recorded.
    pub fn summary(&self) -> Option<FrameSummary> {
        let max_us = *self.samples.iter().max()?;
        let min_us = *self.samples.iter().min()?;
        let total: u128 = self.samples.iter().map(|&s| u128::from(s)).sum();
        let average_us = (total / self.samples.len() as u128) as u64;
        Some(FrameSummary {
            frames: self.samples.len(),
            average_us,
            max_us,
            min_us,
        })
    }
}
