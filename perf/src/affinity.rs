//! Thread-to-core pinning for the benchmark threads.

/// Pins the calling thread to `core`. Returns `false` if the OS refused or
/// pinning is not supported on this platform.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core: usize) -> bool {
    // SAFETY: cpu_set_t is plain data; zeroed is the empty set.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_core: usize) -> bool {
    false
}

/// Pins to `core` if one was requested, logging when the request fails.
pub(crate) fn pin_if_requested(role: &str, core: Option<usize>) {
    let Some(core) = core else {
        return;
    };
    if pin_current_thread(core) {
        tracing::debug!(role, core, "pinned thread");
    } else {
        tracing::warn!(role, core, "failed to pin thread, running unpinned");
    }
}
