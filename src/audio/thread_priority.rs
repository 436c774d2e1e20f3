// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Raises the calling thread's priority for the output callback. With
/// `realtime` set, also asks for SCHED_FIFO on unix. Failures are logged and
/// playback carries on at normal priority.
pub fn raise_callback_priority(priority: u8, realtime: bool) {
    let value = match ThreadPriorityValue::try_from(priority.min(99)) {
        Ok(value) => value,
        Err(e) => {
            warn!(priority, err = %e, "Invalid output thread priority");
            return;
        }
    };
    let priority = ThreadPriority::Crossplatform(value);
    if let Err(e) = set_current_thread_priority(priority) {
        warn!(err = %e, "Unable to raise output callback priority");
    }

    #[cfg(unix)]
    if realtime {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            priority,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled SCHED_FIFO for output callback thread"),
            Err(e) => warn!(err = %e, "Unable to enable SCHED_FIFO for output callback thread"),
        }
    }
    #[cfg(not(unix))]
    let _ = realtime;
}
