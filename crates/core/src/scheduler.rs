use crate::show::model::Routine;

/// Where a client is within a triggered routine at one display frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePosition {
    /// The shared start time has not been reached yet; keep polling. This
    /// pre-roll absorbs clock-offset and delivery jitter without visual
    /// effect since nothing renders before the start time.
    Pending,
    /// A step is live. `step_index` indexes the *active-filtered* step
    /// sequence of the routine, in playback order.
    Active {
        step_index: usize,
        elapsed_in_step: u64,
    },
    /// Elapsed time has passed the end of the last active step, or the
    /// routine has no active steps at all.
    Finished,
}

/// Map elapsed time since the shared start to the current step and phase.
///
/// Pure function of its inputs: re-invoked every display frame on every
/// client independently, with no per-frame network traffic and no memory of
/// previous invocations. That makes it safe for a client to join or rejoin
/// mid-session and land at exactly the same step and phase as everyone else.
///
/// Inactive steps are invisible here: they contribute nothing to the
/// timeline walk. Zero-duration steps are stepped over in the same pass.
pub fn schedule_frame(routine: &Routine, target_time: u64, corrected_now: u64) -> FramePosition {
    if corrected_now < target_time {
        return FramePosition::Pending;
    }

    let mut remaining = corrected_now - target_time;
    for (step_index, step) in routine.active_steps().enumerate() {
        if remaining < step.duration {
            return FramePosition::Active {
                step_index,
                elapsed_in_step: remaining,
            };
        }
        remaining -= step.duration;
    }

    FramePosition::Finished
}

/// Whether a flash step is in its lit half-cycle.
///
/// A flash step blinks `count` times over its duration; the first half of
/// each cycle is lit. A zero duration or zero count means the step is
/// instantaneously in its final, unlit phase — never a division hazard.
pub fn flash_phase(elapsed_in_step: u64, duration: u64, count: u64) -> bool {
    if duration == 0 || count == 0 {
        return false;
    }
    let cycle = duration as f64 / count as f64;
    let phase = (elapsed_in_step as f64 % cycle) / cycle;
    phase < 0.5
}
