//! Process, OS and SDK facts attached to every report.

use std::time::{SystemTime, UNIX_EPOCH};

/// Read-only, side-effect-free environment queries.
pub trait AmbientFacts: Send + Sync {
    fn process_id(&self) -> u32;
    fn thread_id(&self) -> u64;
    fn os_name(&self) -> String;
    fn os_version(&self) -> Option<String>;
    fn sdk_name(&self) -> String;
    fn sdk_version(&self) -> String;
    /// Unix time in milliseconds.
    fn now_millis(&self) -> i64;
    /// e.g. "wifi", "4g"; None where the platform cannot tell.
    fn network_type(&self) -> Option<String>;
    /// Radio signal strength in dBm, where available.
    fn signal_strength(&self) -> Option<i32>;
}

/// Facts from the running process. Desktop and server hosts expose no radio
/// information, so network type and signal strength stay empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFacts;

impl AmbientFacts for SystemFacts {
    fn process_id(&self) -> u32 {
        std::process::id()
    }

    fn thread_id(&self) -> u64 {
        current_thread_id()
    }

    fn os_name(&self) -> String {
        std::env::consts::OS.to_string()
    }

    fn os_version(&self) -> Option<String> {
        kernel_release()
    }

    fn sdk_name(&self) -> String {
        "rust".to_string()
    }

    fn sdk_version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn network_type(&self) -> Option<String> {
        None
    }

    fn signal_strength(&self) -> Option<i32> {
        None
    }
}

#[cfg(unix)]
fn current_thread_id() -> u64 {
    // SAFETY: pthread_self has no preconditions and cannot fail.
    unsafe { libc::pthread_self() as usize as u64 }
}

#[cfg(not(unix))]
fn current_thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut h = DefaultHasher::new();
    std::thread::current().id().hash(&mut h);
    h.finish()
}

#[cfg(unix)]
fn kernel_release() -> Option<String> {
    let mut uts = std::mem::MaybeUninit::<libc::utsname>::uninit();
    // SAFETY: uname writes a complete utsname on success; it is only read after rc == 0.
    let rc = unsafe { libc::uname(uts.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let uts = unsafe { uts.assume_init() };
    // SAFETY: uname NUL-terminates every field.
    let release = unsafe { std::ffi::CStr::from_ptr(uts.release.as_ptr()) };
    Some(release.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn kernel_release() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_facts_are_populated() {
        let f = SystemFacts;
        assert_eq!(f.process_id(), std::process::id());
        assert!(!f.os_name().is_empty());
        assert_eq!(f.sdk_version(), env!("CARGO_PKG_VERSION"));
        assert!(f.now_millis() > 1_600_000_000_000);
        assert!(f.network_type().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn kernel_release_is_readable() {
        let release = SystemFacts.os_version().expect("uname release");
        assert!(!release.is_empty());
    }

    #[test]
    fn thread_id_differs_across_threads() {
        let here = SystemFacts.thread_id();
        let there = std::thread::spawn(|| SystemFacts.thread_id()).join().unwrap();
        assert_ne!(here, there);
    }
}
