//! Part planning and scheduling order.

use serde::{Deserialize, Serialize};

use super::part::Part;

/// Splits `[0, size)` into contiguous parts of at most `part_size` bytes.
///
/// Without a known non-zero size, or with `part_size == 0`, returns a single
/// part: bounded to `size - 1` when the size is known, open-ended otherwise.
pub fn plan_parts(size: Option<u64>, part_size: u64) -> Vec<Part> {
    let size = size.filter(|&n| n > 0);
    match size {
        Some(size) if part_size > 0 => (0..size)
            .step_by(part_size as usize)
            .map(|start| Part::new(start, Some((start + part_size).min(size) - 1)))
            .collect(),
        _ => vec![Part::new(0, size.map(|n| n - 1))],
    }
}

/// Ordering applied to the part sequence before workers claim from it.
///
/// Workers claim the lowest index first, so the order of the sequence is the
/// schedule. Both knobs target media playback: `tail_parts` fetches the end of
/// the file early (containers that keep their index there), `reserved_prefix`
/// keeps the first parts (file header) ahead of any seek bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePolicy {
    /// Number of trailing parts moved to the front of a fresh plan.
    pub tail_parts: usize,
    /// Number of leading parts excluded from seek-bias rotation.
    pub reserved_prefix: usize,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            tail_parts: 6,
            reserved_prefix: 13,
        }
    }
}

impl SchedulePolicy {
    /// Order a freshly planned sequence: tail parts first, then seek bias.
    pub fn order_fresh(&self, parts: &mut [Part], start_from: Option<f64>) {
        let tail = self.tail_parts.min(parts.len());
        parts.rotate_right(tail);
        if let Some(pct) = start_from {
            self.seek_bias(parts, pct);
        }
    }

    /// Re-apply seek bias to a recovered sequence. The biased region is first
    /// put back in offset order so a new percentage is measured from the start.
    pub fn order_resumed(&self, parts: &mut [Part], start_from: Option<f64>) {
        let Some(pct) = start_from else {
            return;
        };
        if parts.len() <= self.reserved_prefix {
            return;
        }
        parts[self.reserved_prefix..].sort_by_key(|p| p.start);
        self.seek_bias(parts, pct);
    }

    /// Rotate the parts after the reserved prefix so scheduling starts `pct`
    /// percent of the way through them, wrapping around.
    fn seek_bias(&self, parts: &mut [Part], pct: f64) {
        if parts.len() <= self.reserved_prefix {
            return;
        }
        let biased = &mut parts[self.reserved_prefix..];
        let fraction = if pct.is_finite() {
            pct.clamp(0.0, 100.0) / 100.0
        } else {
            0.0
        };
        let shift = ((fraction * biased.len() as f64) as usize).min(biased.len());
        biased.rotate_left(shift);
    }
}
