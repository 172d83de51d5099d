//! Real-time thread priority
//!
//! Platform-specific priority elevation for the push worker. Elevation is
//! best-effort: failure leaves the thread at default priority and playback
//! still works, with less headroom against scheduling jitter.
//!
//! # Platform support
//!
//! - **Linux**: `SCHED_FIFO` with elevated priority (requires
//!   `CAP_SYS_NICE` or rtkit-granted limits)
//! - **macOS**: pthread QoS class `USER_INTERACTIVE`
//! - elsewhere: unsupported, no-op

use std::sync::atomic::{AtomicBool, Ordering};

/// Track if priority has been set (avoid repeated syscalls)
static PRIORITY_SET: AtomicBool = AtomicBool::new(false);

/// Result of a priority elevation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityResult {
    /// Successfully elevated
    Success,
    /// Already set (no action needed)
    AlreadySet,
    /// Failed to set priority (non-fatal)
    Failed,
    /// Platform not supported
    Unsupported,
}

/// Set real-time priority for the current thread.
///
/// Safe to call multiple times; only the first call per process attempts
/// elevation.
pub fn set_realtime_priority() -> PriorityResult {
    if PRIORITY_SET.swap(true, Ordering::SeqCst) {
        return PriorityResult::AlreadySet;
    }

    let result = platform_set_priority();

    match result {
        PriorityResult::Success => {
            log::info!("Audio thread elevated to real-time priority");
        }
        PriorityResult::Failed => {
            log::warn!("Failed to set real-time thread priority (non-fatal)");
            PRIORITY_SET.store(false, Ordering::SeqCst); // Allow retry
        }
        PriorityResult::Unsupported => {
            log::debug!("Real-time priority not supported on this platform");
        }
        PriorityResult::AlreadySet => {}
    }

    result
}

#[cfg(target_os = "linux")]
fn platform_set_priority() -> PriorityResult {
    // SCHED_FIFO at a mid-range priority: above normal tasks, below
    // kernel threads.
    let param = libc::sched_param { sched_priority: 70 };

    let result = unsafe {
        libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param)
    };

    if result == 0 {
        PriorityResult::Success
    } else {
        PriorityResult::Failed
    }
}

#[cfg(target_os = "macos")]
fn platform_set_priority() -> PriorityResult {
    // QOS_CLASS_USER_INTERACTIVE - highest non-realtime QoS
    const QOS_CLASS_USER_INTERACTIVE: u32 = 0x21;

    extern "C" {
        fn pthread_set_qos_class_self_np(qos_class: u32, relative_priority: i32) -> i32;
    }

    let result = unsafe { pthread_set_qos_class_self_np(QOS_CLASS_USER_INTERACTIVE, 0) };

    if result == 0 {
        PriorityResult::Success
    } else {
        PriorityResult::Failed
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_set_priority() -> PriorityResult {
    PriorityResult::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_call_reports_already_set() {
        let first = set_realtime_priority();
        if first == PriorityResult::Success || first == PriorityResult::AlreadySet {
            assert_eq!(set_realtime_priority(), PriorityResult::AlreadySet);
        }
    }
}
