//! Password locks.
//!
//! Two independent tiers of locks are kept per [`PathKey`]:
//!
//! - **Permanent** locks survive unlocking. A correct password adds the path
//!   to the session's unlocked set; `relock` removes it again and the stored
//!   digest is reused.
//! - **Temporary** locks are one-shot. A correct password deletes the entry.
//!
//! Only SHA-256 digests of passwords are stored. Wrong passwords are an
//! expected outcome and never change state; there is no attempt counting.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, Result};
use crate::path_key::{PathKey, PathNormalizer};

/// Persisted form of one lock tier: path key -> lowercase hex digest.
pub type LockRecords = BTreeMap<String, String>;

/// Which tier a lock belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// Re-armable lock; unlocking only opens it for the session.
    Permanent,
    /// One-shot lock; unlocking deletes it.
    Temporary,
}

impl LockKind {
    /// Both tiers, in unlock precedence order.
    pub const ALL: [LockKind; 2] = [LockKind::Permanent, LockKind::Temporary];
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Permanent => f.write_str("permanent"),
            LockKind::Temporary => f.write_str("temporary"),
        }
    }
}

/// SHA-256 digest of a UTF-8 password.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecretHash([u8; 32]);

impl SecretHash {
    /// Hashes a password.
    pub fn of(password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Parses a 64-character hex digest.
    pub fn from_hex(hex_digest: &str) -> Result<Self> {
        let bytes = hex::decode(hex_digest.trim())
            .map_err(|e| EngineError::InvalidDigest(format!("{hex_digest:?}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            EngineError::InvalidDigest(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Lowercase hex encoding, as persisted.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether `password` hashes to this digest.
    pub fn matches(&self, password: &str) -> bool {
        Self::of(password) == *self
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix only; enough to tell digests apart in logs.
        write!(f, "SecretHash({}..)", &self.to_hex()[..8])
    }
}

/// A lock on one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEntry {
    /// The tier.
    pub kind: LockKind,
    /// Digest of the password.
    pub secret: SecretHash,
}

/// Outcome of an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockResult {
    /// The password matched; the path is open.
    Unlocked,
    /// The path is locked and the password did not match.
    WrongPassword,
    /// The path holds no lock.
    NotLocked,
}

/// Lock lifecycle state of a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// No lock of either tier.
    NoLock,
    /// Permanent lock, closed.
    LockedPermanent,
    /// Permanent lock, opened for this session.
    UnlockedPermanent,
    /// Temporary lock, not yet consumed.
    LockedTemporary,
}

impl LockState {
    /// Whether this state blocks access to the path itself.
    pub fn blocks(&self) -> bool {
        matches!(self, LockState::LockedPermanent | LockState::LockedTemporary)
    }
}

/// Both lock tiers plus the session-scoped unlocked set.
#[derive(Debug, Default, Clone)]
pub struct LockStore {
    permanent: HashMap<PathKey, SecretHash>,
    temporary: HashMap<PathKey, SecretHash>,
    unlocked: HashSet<PathKey>,
}

impl LockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a permanent lock and re-arms it if it was open.
    pub fn set_permanent_lock(&mut self, key: PathKey, password: &str) {
        self.unlocked.remove(&key);
        self.permanent.insert(key, SecretHash::of(password));
    }

    /// Stores a temporary lock.
    pub fn set_temporary_lock(&mut self, key: PathKey, password: &str) {
        self.unlocked.remove(&key);
        self.temporary.insert(key, SecretHash::of(password));
    }

    /// Tries to open the lock on `key`.
    ///
    /// A permanent lock is consulted strictly before a temporary one when a
    /// path holds both.
    pub fn attempt_unlock(&mut self, key: &PathKey, password: &str) -> UnlockResult {
        if let Some(secret) = self.permanent.get(key) {
            if !secret.matches(password) {
                return UnlockResult::WrongPassword;
            }
            self.unlocked.insert(key.clone());
            return UnlockResult::Unlocked;
        }

        if let Some(secret) = self.temporary.get(key) {
            if !secret.matches(password) {
                return UnlockResult::WrongPassword;
            }
            self.temporary.remove(key);
            return UnlockResult::Unlocked;
        }

        UnlockResult::NotLocked
    }

    /// Closes an opened permanent lock. Returns whether anything changed.
    pub fn relock(&mut self, key: &PathKey) -> bool {
        self.unlocked.remove(key)
    }

    /// The lock of the given tier on `key`, if any.
    pub fn entry(&self, key: &PathKey, kind: LockKind) -> Option<LockEntry> {
        let tier = match kind {
            LockKind::Permanent => &self.permanent,
            LockKind::Temporary => &self.temporary,
        };
        tier.get(key).map(|secret| LockEntry {
            kind,
            secret: *secret,
        })
    }

    /// Whether `key` has a permanent lock.
    pub fn has_permanent(&self, key: &PathKey) -> bool {
        self.permanent.contains_key(key)
    }

    /// Whether `key` has an unconsumed temporary lock.
    pub fn has_temporary(&self, key: &PathKey) -> bool {
        self.temporary.contains_key(key)
    }

    /// Whether `key` is in the session's unlocked set.
    pub fn is_unlocked(&self, key: &PathKey) -> bool {
        self.unlocked.contains(key)
    }

    /// Whether `key` counts as satisfied for a visibility rule: no permanent
    /// lock, or an opened one. Temporary locks are not consulted.
    pub fn is_satisfied(&self, key: &PathKey) -> bool {
        !self.has_permanent(key) || self.is_unlocked(key)
    }

    /// Whether the lock state of `key` alone blocks access.
    pub fn blocks(&self, key: &PathKey) -> bool {
        (self.has_permanent(key) && !self.is_unlocked(key)) || self.has_temporary(key)
    }

    /// Lifecycle state of `key`. A temporary lock is reported first when a
    /// path holds both tiers.
    pub fn state(&self, key: &PathKey) -> LockState {
        if self.has_temporary(key) {
            LockState::LockedTemporary
        } else if self.has_permanent(key) {
            if self.is_unlocked(key) {
                LockState::UnlockedPermanent
            } else {
                LockState::LockedPermanent
            }
        } else {
            LockState::NoLock
        }
    }

    /// Number of locks in a tier.
    pub fn count(&self, kind: LockKind) -> usize {
        match kind {
            LockKind::Permanent => self.permanent.len(),
            LockKind::Temporary => self.temporary.len(),
        }
    }

    /// Exports one tier in persisted form.
    pub fn records(&self, kind: LockKind) -> LockRecords {
        let tier = match kind {
            LockKind::Permanent => &self.permanent,
            LockKind::Temporary => &self.temporary,
        };
        tier.iter()
            .map(|(key, secret)| (key.as_str().to_string(), secret.to_hex()))
            .collect()
    }

    /// Replaces one tier from persisted records.
    ///
    /// Keys are re-normalized. Records with a malformed digest are skipped and
    /// logged. Returns the number of locks loaded. The unlocked set is left
    /// untouched.
    pub fn replace_tier(
        &mut self,
        kind: LockKind,
        records: &LockRecords,
        normalizer: &PathNormalizer,
    ) -> usize {
        let mut tier = HashMap::with_capacity(records.len());
        for (path, digest) in records {
            match SecretHash::from_hex(digest) {
                Ok(secret) => {
                    tier.insert(normalizer.normalize_str(path), secret);
                }
                Err(e) => {
                    tracing::warn!("Skipping {} lock for {}: {}", kind, path, e);
                }
            }
        }
        let loaded = tier.len();
        match kind {
            LockKind::Permanent => self.permanent = tier,
            LockKind::Temporary => self.temporary = tier,
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_key::PathStyle;

    fn normalizer() -> PathNormalizer {
        PathNormalizer::new(PathStyle::Posix, "/root")
    }

    fn key(path: &str) -> PathKey {
        normalizer().normalize(path)
    }

    #[test]
    fn test_secret_hash_is_sha256_hex() {
        // sha256("abc")
        assert_eq!(
            SecretHash::of("abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_secret_hash_hex_parsing() {
        let hash = SecretHash::of("pw1");
        assert_eq!(SecretHash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert!(matches!(
            SecretHash::from_hex("zz"),
            Err(EngineError::InvalidDigest(_))
        ));
        assert!(matches!(
            SecretHash::from_hex("abcd"),
            Err(EngineError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_secret_hash_debug_is_truncated() {
        let debug = format!("{:?}", SecretHash::of("secret"));
        assert!(debug.starts_with("SecretHash("));
        assert!(debug.len() < 24);
    }

    #[test]
    fn test_permanent_lock_lifecycle() {
        let mut store = LockStore::new();
        let a = key("/root/a.txt");

        assert_eq!(store.state(&a), LockState::NoLock);
        store.set_permanent_lock(a.clone(), "pw1");
        assert_eq!(store.state(&a), LockState::LockedPermanent);
        assert!(store.blocks(&a));

        assert_eq!(store.attempt_unlock(&a, "pw1"), UnlockResult::Unlocked);
        assert_eq!(store.state(&a), LockState::UnlockedPermanent);
        assert!(!store.blocks(&a));

        assert!(store.relock(&a));
        assert_eq!(store.state(&a), LockState::LockedPermanent);

        // Digest survived the unlock.
        assert_eq!(store.attempt_unlock(&a, "pw1"), UnlockResult::Unlocked);
    }

    #[test]
    fn test_temporary_lock_is_one_shot() {
        let mut store = LockStore::new();
        let t = key("/root/t.txt");

        store.set_temporary_lock(t.clone(), "once");
        assert_eq!(store.state(&t), LockState::LockedTemporary);
        assert_eq!(store.attempt_unlock(&t, "once"), UnlockResult::Unlocked);
        assert_eq!(store.state(&t), LockState::NoLock);
        assert_eq!(store.attempt_unlock(&t, "anything"), UnlockResult::NotLocked);
        assert_eq!(store.count(LockKind::Temporary), 0);
    }

    #[test]
    fn test_wrong_password_leaves_state_unchanged() {
        let mut store = LockStore::new();
        let a = key("/root/a.txt");
        let t = key("/root/t.txt");
        store.set_permanent_lock(a.clone(), "right");
        store.set_temporary_lock(t.clone(), "right");

        for _ in 0..5 {
            assert_eq!(store.attempt_unlock(&a, "wrong"), UnlockResult::WrongPassword);
            assert_eq!(store.attempt_unlock(&t, "wrong"), UnlockResult::WrongPassword);
        }
        assert_eq!(store.state(&a), LockState::LockedPermanent);
        assert_eq!(store.state(&t), LockState::LockedTemporary);
    }

    #[test]
    fn test_unlock_without_lock() {
        let mut store = LockStore::new();
        assert_eq!(
            store.attempt_unlock(&key("/root/free.txt"), "pw"),
            UnlockResult::NotLocked
        );
    }

    #[test]
    fn test_setting_lock_rearms_unlocked_path() {
        let mut store = LockStore::new();
        let a = key("/root/a");
        store.set_permanent_lock(a.clone(), "one");
        store.attempt_unlock(&a, "one");
        assert!(store.is_unlocked(&a));

        store.set_permanent_lock(a.clone(), "two");
        assert!(!store.is_unlocked(&a));
        assert_eq!(store.attempt_unlock(&a, "one"), UnlockResult::WrongPassword);
        assert_eq!(store.attempt_unlock(&a, "two"), UnlockResult::Unlocked);

        store.set_temporary_lock(a.clone(), "three");
        assert!(!store.is_unlocked(&a));
    }

    #[test]
    fn test_permanent_checked_before_temporary() {
        let mut store = LockStore::new();
        let a = key("/root/both");
        store.set_permanent_lock(a.clone(), "perm");
        store.set_temporary_lock(a.clone(), "temp");

        // The temporary password is never consulted while a permanent lock exists.
        assert_eq!(store.attempt_unlock(&a, "temp"), UnlockResult::WrongPassword);
        assert_eq!(store.attempt_unlock(&a, "perm"), UnlockResult::Unlocked);

        // Temporary lock still blocks and is still reported.
        assert!(store.blocks(&a));
        assert_eq!(store.state(&a), LockState::LockedTemporary);
        assert!(store.has_temporary(&a));
    }

    #[test]
    fn test_relock_is_noop_without_unlock() {
        let mut store = LockStore::new();
        let a = key("/root/a");
        assert!(!store.relock(&a));
        store.set_temporary_lock(a.clone(), "t");
        assert!(!store.relock(&a));
        assert!(store.has_temporary(&a));
    }

    #[test]
    fn test_satisfied_ignores_temporary_locks() {
        let mut store = LockStore::new();
        let a = key("/root/a");
        store.set_temporary_lock(a.clone(), "t");
        assert!(store.is_satisfied(&a));

        let b = key("/root/b");
        store.set_permanent_lock(b.clone(), "p");
        assert!(!store.is_satisfied(&b));
        store.attempt_unlock(&b, "p");
        assert!(store.is_satisfied(&b));
    }

    #[test]
    fn test_records_round_trip_through_tier() {
        let mut store = LockStore::new();
        store.set_permanent_lock(key("/root/a"), "pw");
        let records = store.records(LockKind::Permanent);
        assert_eq!(records.get("/root/a"), Some(&SecretHash::of("pw").to_hex()));

        let mut restored = LockStore::new();
        let loaded = restored.replace_tier(LockKind::Permanent, &records, &normalizer());
        assert_eq!(loaded, 1);
        assert!(restored.has_permanent(&key("/root/a")));
    }

    #[test]
    fn test_replace_tier_skips_bad_digests_and_renormalizes() {
        let mut records = LockRecords::new();
        records.insert("/root//x/./y".to_string(), SecretHash::of("pw").to_hex());
        records.insert("/root/bad".to_string(), "not-hex".to_string());

        let mut store = LockStore::new();
        let loaded = store.replace_tier(LockKind::Temporary, &records, &normalizer());
        assert_eq!(loaded, 1);
        assert!(store.has_temporary(&key("/root/x/y")));
        assert!(!store.has_temporary(&key("/root/bad")));
    }
}
