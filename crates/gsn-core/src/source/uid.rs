use std::collections::HashSet;
use std::fmt;
use std::sync::{LazyLock, Mutex};

/// UIDs currently held by a live [`SourceUid`].
static LIVE_UIDS: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Length of every generated UID; matches the helper table's `varchar(17)`.
pub const UID_LEN: usize = 17;

/// Unique identifier of a stream source, used as its view name and as its
/// key in the helper table.
///
/// `v` followed by 16 random hex digits: a letter first, so the name is a
/// legal unquoted identifier in every supported dialect. Allocation
/// retries until the candidate is not held by another live source; the UID
/// is released when dropped.
pub struct SourceUid(String);

impl SourceUid {
    pub fn allocate() -> Self {
        let mut live = LIVE_UIDS.lock().expect("uid registry poisoned");
        loop {
            let candidate = format!("v{:016x}", rand::random::<u64>());
            if live.insert(candidate.clone()) {
                return Self(candidate);
            }
            log::debug!("uid collision on {candidate}, regenerating");
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `uid` is currently held by a live source.
    pub fn is_live(uid: &str) -> bool {
        LIVE_UIDS.lock().expect("uid registry poisoned").contains(uid)
    }
}

impl Drop for SourceUid {
    fn drop(&mut self) {
        if let Ok(mut live) = LIVE_UIDS.lock() {
            live.remove(&self.0);
        }
    }
}

impl fmt::Display for SourceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceUid({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape() {
        let uid = SourceUid::allocate();
        assert_eq!(uid.as_str().len(), UID_LEN);
        assert!(uid.as_str().starts_with('v'));
        assert!(uid.as_str()[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn released_on_drop() {
        let uid = SourceUid::allocate();
        let text = uid.as_str().to_string();
        assert!(SourceUid::is_live(&text));
        drop(uid);
        assert!(!SourceUid::is_live(&text));
    }

    #[test]
    fn distinct_while_live() {
        let uids: Vec<SourceUid> = (0..64).map(|_| SourceUid::allocate()).collect();
        let set: HashSet<&str> = uids.iter().map(|u| u.as_str()).collect();
        assert_eq!(set.len(), uids.len());
    }
}
