//! Worker loop: claim a part, stream its range into the file, report the outcome.

use crate::retry::FetchError;
use crate::segmenter::{PartSlot, PartStatus};

use super::queue::Claim;
use super::JobContext;

enum Outcome {
    Completed,
    /// The job left `Downloading` while this part was in flight.
    Stopped,
    /// Part-level failure; the part goes back to the queue.
    Retry { error: FetchError, backoff: bool },
    /// The destination file could not be written.
    Fatal(std::io::Error),
}

pub(super) fn run_worker(ctx: &JobContext, id: usize) {
    tracing::debug!(worker = id, "worker started");
    while ctx.state.is_downloading() {
        let index = match ctx.queue.claim() {
            Claim::Part(index) => index,
            Claim::Idle => break,
            Claim::Drained => {
                ctx.complete();
                break;
            }
        };
        let slot = ctx.table.slot(index);

        if slot.is_complete() {
            slot.set_status(PartStatus::Completed);
            ctx.queue.finish(index);
            continue;
        }

        match fetch_part(ctx, slot) {
            Outcome::Completed => {
                tracing::debug!(worker = id, part = index, "part completed");
                ctx.queue.finish(index);
            }
            Outcome::Stopped => {
                if slot.status().is_active() {
                    slot.set_status(PartStatus::Pending);
                }
                ctx.queue.finish(index);
            }
            Outcome::Retry { error, backoff } => {
                tracing::warn!(
                    worker = id,
                    part = index,
                    offset = slot.current(),
                    error = %error,
                    "part failed, requeued"
                );
                slot.set_status(PartStatus::Error);
                ctx.queue.release(index);
                if backoff {
                    ctx.state.wait_while_downloading(ctx.part_backoff);
                }
            }
            Outcome::Fatal(e) => {
                slot.set_status(PartStatus::Error);
                ctx.queue.finish(index);
                ctx.fail(format!(
                    "write to {} failed: {}",
                    ctx.file.path().display(),
                    e
                ));
            }
        }
    }
    tracing::debug!(worker = id, "worker exited");
}

/// Bytes of `chunk` that still belong to the part (a server may overshoot the range end).
fn clamp_to_part(slot: &PartSlot, offset: u64, chunk: &[u8]) -> usize {
    match slot.end() {
        Some(end) => {
            let remaining = (end + 1).saturating_sub(offset);
            chunk.len().min(remaining as usize)
        }
        None => chunk.len(),
    }
}

fn fetch_part(ctx: &JobContext, slot: &PartSlot) -> Outcome {
    if !ctx.ranges_supported && slot.current() != slot.start() {
        // The server can only send the body from the beginning.
        slot.rewind();
    }
    slot.set_status(PartStatus::Connecting);
    let requested = slot.current();

    let mut stream = match ctx
        .transport
        .open_range(&ctx.url, &ctx.headers, requested, slot.end())
    {
        Ok(stream) => stream,
        Err(error) => return Outcome::Retry { error, backoff: true },
    };

    let received = stream.content_range_start().unwrap_or(0);
    if received != requested {
        return Outcome::Retry {
            error: FetchError::RangeMismatch {
                requested,
                received,
            },
            backoff: false,
        };
    }

    if !ctx.state.is_downloading() {
        return Outcome::Stopped;
    }
    slot.set_status(PartStatus::Downloading);

    while ctx.state.is_downloading() {
        let chunk = match stream.next_chunk() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                if slot.end().is_some() && !slot.is_complete() {
                    return Outcome::Retry {
                        error: FetchError::Closed,
                        backoff: false,
                    };
                }
                slot.set_status(PartStatus::Completed);
                return Outcome::Completed;
            }
            Err(error) => return Outcome::Retry { error, backoff: false },
        };

        let offset = slot.current();
        let n = clamp_to_part(slot, offset, &chunk);
        if let Err(e) = ctx.file.write_at(offset, &chunk[..n]) {
            return Outcome::Fatal(e);
        }
        slot.advance(n as u64);
        if slot.is_complete() {
            slot.set_status(PartStatus::Completed);
            return Outcome::Completed;
        }
    }
    Outcome::Stopped
}
