/// Cache identity of a KEK: its name plus the visibility partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KekId {
    pub name: String,
    pub deleted: bool,
}

impl KekId {
    pub fn new(name: &str, deleted: bool) -> Self {
        Self {
            name: name.to_string(),
            deleted,
        }
    }
}

/// Cache identity of a DEK: "(kek_name, subject, version, algorithm)"
/// plus the visibility partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DekId {
    pub kek_name: String,
    pub subject: String,
    pub version: i32,
    pub algorithm: String,
    pub deleted: bool,
}

impl DekId {
    pub fn new(
        kek_name: &str,
        subject: &str,
        version: i32,
        algorithm: &str,
        deleted: bool,
    ) -> Self {
        Self {
            kek_name: kek_name.to_string(),
            subject: subject.to_string(),
            version,
            algorithm: algorithm.to_string(),
            deleted,
        }
    }

    /// Returns true if this key is one version of the given
    /// "(kek_name, subject, algorithm)" family within the same partition.
    pub fn matches_family(
        &self,
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        deleted: bool,
    ) -> bool {
        self.kek_name == kek_name
            && self.subject == subject
            && self.algorithm == algorithm
            && self.deleted == deleted
    }
}

#[test]
fn test_cache_key() {
    use std::collections::HashSet;

    let mut keys = HashSet::new();
    assert!(keys.insert(KekId::new("k", false)));
    assert!(!keys.insert(KekId::new("k", false)));
    assert!(keys.insert(KekId::new("k", true)));

    let id = DekId::new("kek1", "sub1", 3, "AES256", false);
    assert_eq!(id, DekId::new("kek1", "sub1", 3, "AES256", false));
    assert_ne!(id, DekId::new("kek1", "sub1", 3, "AES256", true));
    assert_ne!(id, DekId::new("kek1", "sub1", 4, "AES256", false));

    assert!(id.matches_family("kek1", "sub1", "AES256", false));
    assert!(!id.matches_family("kek1", "sub1", "AES256", true));
    assert!(!id.matches_family("kek1", "sub2", "AES256", false));
    assert!(!id.matches_family("kek2", "sub1", "AES256", false));
    assert!(!id.matches_family("kek1", "sub1", "AES128", false));
}
