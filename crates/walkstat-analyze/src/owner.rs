//! Owner and group name resolution for report rendering.
//!
//! Names are a display concern only. A failed lookup falls back to the
//! numeric id and is never an error.

use std::collections::HashMap;

use dashmap::DashMap;

/// Resolves numeric owner and group ids to names.
pub trait OwnerResolver: Send + Sync {
    /// Look up a user name.
    fn user_name(&self, uid: u32) -> Option<String>;

    /// Look up a group name.
    fn group_name(&self, gid: u32) -> Option<String>;

    /// User name, or the numeric id when unknown.
    fn user(&self, uid: u32) -> String {
        self.user_name(uid).unwrap_or_else(|| uid.to_string())
    }

    /// Group name, or the numeric id when unknown.
    fn group(&self, gid: u32) -> String {
        self.group_name(gid).unwrap_or_else(|| gid.to_string())
    }
}

/// Looks names up in the system user and group databases.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOwnerResolver;

impl SystemOwnerResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    /// Create a resolver that caches every lookup.
    pub fn cached() -> CachingOwnerResolver<Self> {
        CachingOwnerResolver::new(Self)
    }
}

impl OwnerResolver for SystemOwnerResolver {
    fn user_name(&self, uid: u32) -> Option<String> {
        sys::user_name(uid)
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        sys::group_name(gid)
    }
}

/// Memoizes another resolver, including misses.
///
/// Hotspot reports repeat the same few owners many times, and each system
/// lookup may hit a directory service.
#[derive(Debug)]
pub struct CachingOwnerResolver<R> {
    inner: R,
    users: DashMap<u32, Option<String>>,
    groups: DashMap<u32, Option<String>>,
}

impl<R: OwnerResolver> CachingOwnerResolver<R> {
    /// Wrap `inner` with a cache.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            users: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Number of distinct ids looked up so far.
    pub fn cached_entries(&self) -> usize {
        self.users.len() + self.groups.len()
    }
}

impl<R: OwnerResolver> OwnerResolver for CachingOwnerResolver<R> {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.users
            .entry(uid)
            .or_insert_with(|| self.inner.user_name(uid))
            .clone()
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        self.groups
            .entry(gid)
            .or_insert_with(|| self.inner.group_name(gid))
            .clone()
    }
}

/// Fixed id-to-name tables.
#[derive(Debug, Default, Clone)]
pub struct StaticOwnerResolver {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl StaticOwnerResolver {
    /// Create an empty resolver; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user name.
    pub fn with_user(mut self, uid: u32, name: impl Into<String>) -> Self {
        self.users.insert(uid, name.into());
        self
    }

    /// Add a group name.
    pub fn with_group(mut self, gid: u32, name: impl Into<String>) -> Self {
        self.groups.insert(gid, name.into());
        self
    }
}

impl OwnerResolver for StaticOwnerResolver {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.users.get(&uid).cloned()
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        self.groups.get(&gid).cloned()
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::CStr;

    /// Largest buffer tried before giving up on a lookup.
    const MAX_BUFFER: usize = 1 << 20;

    pub fn user_name(uid: u32) -> Option<String> {
        let mut buf = vec![0 as libc::c_char; 1024];
        loop {
            let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            let rc = unsafe {
                libc::getpwuid_r(
                    uid as libc::uid_t,
                    &mut entry,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() || entry.pw_name.is_null() {
                return None;
            }
            // SAFETY: pw_name points into `buf`, which outlives this borrow.
            let name = unsafe { CStr::from_ptr(entry.pw_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }

    pub fn group_name(gid: u32) -> Option<String> {
        let mut buf = vec![0 as libc::c_char; 1024];
        loop {
            let mut entry: libc::group = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::group = std::ptr::null_mut();
            let rc = unsafe {
                libc::getgrgid_r(
                    gid as libc::gid_t,
                    &mut entry,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() || entry.gr_name.is_null() {
                return None;
            }
            // SAFETY: gr_name points into `buf`, which outlives this borrow.
            let name = unsafe { CStr::from_ptr(entry.gr_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }
}

#[cfg(not(unix))]
mod sys {
    pub fn user_name(_uid: u32) -> Option<String> {
        None
    }

    pub fn group_name(_gid: u32) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fallback_to_numeric_id() {
        let resolver = StaticOwnerResolver::new().with_user(1000, "alice");
        assert_eq!(resolver.user(1000), "alice");
        assert_eq!(resolver.user(4242), "4242");
        assert_eq!(resolver.group(77), "77");
    }

    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl OwnerResolver for CountingResolver {
        fn user_name(&self, _uid: u32) -> Option<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            None
        }

        fn group_name(&self, gid: u32) -> Option<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Some(format!("g{gid}"))
        }
    }

    #[test]
    fn test_cache_memoizes_hits_and_misses() {
        let resolver = CachingOwnerResolver::new(CountingResolver::default());
        for _ in 0..3 {
            assert_eq!(resolver.user(5), "5");
            assert_eq!(resolver.group(6), "g6");
        }
        assert_eq!(resolver.inner.calls.load(Ordering::Relaxed), 2);
        assert_eq!(resolver.cached_entries(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_lookup_never_panics() {
        let resolver = SystemOwnerResolver::cached();
        // Root exists on practically every unix system; an absurd id does not.
        let _ = resolver.user(0);
        assert_eq!(resolver.user(u32::MAX - 7), (u32::MAX - 7).to_string());
    }
}
