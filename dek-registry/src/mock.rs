use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::{
    cache_key::{DekId, KekId},
    client::DekClient,
    config::ClientConfig,
    constants::{LATEST_VERSION, MOCK_TS},
    dek::Dek,
    errors::{Error, Result},
    kek::Kek,
};

/// Implements the key registry in memory, for tests and local runs.
/// Records live as long as the client; nothing is ever evicted.
#[derive(Debug, Clone, Default)]
pub struct MockDekRegistryClient {
    client_config: ClientConfig,
    kek_cache: HashMap<KekId, Kek>,
    dek_cache: HashMap<DekId, Dek>,
}

impl MockDekRegistryClient {
    pub fn new(client_config: ClientConfig) -> Self {
        Self {
            client_config,
            kek_cache: HashMap::new(),
            dek_cache: HashMap::new(),
        }
    }

    /// Returns the highest version registered for "(kek_name, subject, algorithm)"
    /// among keys in the requested partition.
    fn latest_dek_version(
        &self,
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        deleted: bool,
    ) -> Option<i32> {
        self.dek_cache
            .keys()
            .filter(|id| id.matches_family(kek_name, subject, algorithm, deleted))
            .map(|id| id.version)
            .max()
            .filter(|v| *v > 0)
    }
}

#[async_trait]
impl DekClient for MockDekRegistryClient {
    fn config(&self) -> &ClientConfig {
        &self.client_config
    }

    async fn register_kek(
        &mut self,
        name: &str,
        kms_type: &str,
        kms_key_id: &str,
        shared: bool,
        kms_props: Option<BTreeMap<String, String>>,
        doc: Option<&str>,
    ) -> Result<Kek> {
        let cache_key = KekId::new(name, false);
        if let Some(cached) = self.kek_cache.get(&cache_key) {
            debug!("KEK '{}' already registered", name);
            return Ok(cached.clone());
        }

        info!("registering KEK '{}' (kms type '{}')", name, kms_type);
        let kek = Kek::new(name, kms_type, kms_key_id, shared, kms_props, doc);
        self.kek_cache.insert(cache_key, kek.clone());
        Ok(kek)
    }

    async fn get_kek(&self, name: &str, deleted: bool) -> Result<Kek> {
        let mut cached = self.kek_cache.get(&KekId::new(name, deleted));
        if cached.is_none() && deleted {
            // requests for deleted records also see live ones
            cached = self.kek_cache.get(&KekId::new(name, false));
        }
        match cached {
            Some(kek) if !kek.deleted || deleted => Ok(kek.clone()),
            _ => {
                warn!("KEK '{}' not found (deleted {})", name, deleted);
                Err(Error::not_found(format!("Kek not found: {}", name)))
            }
        }
    }

    async fn register_dek(
        &mut self,
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        version: i32,
        encrypted_key_material: Option<&str>,
    ) -> Result<Dek> {
        let cache_key = DekId::new(kek_name, subject, version, algorithm, false);
        if let Some(cached) = self.dek_cache.get(&cache_key) {
            debug!(
                "DEK '{}' version {} already registered under KEK '{}'",
                subject, version, kek_name
            );
            return Ok(cached.clone());
        }

        info!(
            "registering DEK '{}' version {} ({}) under KEK '{}'",
            subject, version, algorithm, kek_name
        );
        let dek = Dek::new(
            kek_name,
            subject,
            algorithm,
            version,
            encrypted_key_material,
            MOCK_TS,
        );
        self.dek_cache.insert(cache_key, dek.clone());
        Ok(dek)
    }

    async fn get_dek(
        &self,
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        version: i32,
        deleted: bool,
    ) -> Result<Dek> {
        let version = if version == LATEST_VERSION {
            match self.latest_dek_version(kek_name, subject, algorithm, deleted) {
                Some(v) => {
                    debug!("resolved latest version of DEK '{}' to {}", subject, v);
                    v
                }
                None => {
                    warn!("no DEK versions found for '{}'", subject);
                    return Err(Error::not_found(format!("Dek not found: {}", subject)));
                }
            }
        } else {
            version
        };

        // the fetch always reads the non-deleted partition
        let cache_key = DekId::new(kek_name, subject, version, algorithm, false);
        match self.dek_cache.get(&cache_key) {
            Some(dek) => Ok(dek.clone()),
            None => {
                warn!("DEK '{}' version {} not found", subject, version);
                Err(Error::not_found(format!("Dek not found: {}", subject)))
            }
        }
    }

    async fn get_dek_encrypted_key_material_bytes(&self, dek: &mut Dek) -> Result<Option<Vec<u8>>> {
        Ok(dek.encrypted_key_material_bytes()?.map(<[u8]>::to_vec))
    }

    async fn get_dek_key_material_bytes(&self, dek: &mut Dek) -> Result<Option<Vec<u8>>> {
        Ok(dek.key_material_bytes()?.map(<[u8]>::to_vec))
    }

    async fn set_dek_key_material(&self, dek: &mut Dek, key_material_bytes: &[u8]) -> Result<()> {
        dek.set_key_material(key_material_bytes);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// RUST_LOG=debug cargo test --package dek-registry --lib -- mock::test_register_kek --exact --show-output
#[cfg(test)]
#[tokio::test]
async fn test_register_kek() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cli = MockDekRegistryClient::default();

    let err = cli.get_kek("kek1", false).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Kek not found: kek1");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.code(), Some(40400));

    let mut props = BTreeMap::new();
    props.insert(String::from("region"), String::from("us-west-2"));
    let kek = cli
        .register_kek(
            "kek1",
            "aws-kms",
            "key-1",
            false,
            Some(props),
            Some("first"),
        )
        .await
        .unwrap();
    assert!(!kek.deleted);

    // first write wins
    let mut other_props = BTreeMap::new();
    other_props.insert(String::from("region"), String::from("eu-west-1"));
    let again = cli
        .register_kek(
            "kek1",
            "gcp-kms",
            "key-2",
            true,
            Some(other_props),
            None,
        )
        .await
        .unwrap();
    assert_eq!(again, kek);

    let fetched = cli.get_kek("kek1", false).await.unwrap();
    assert_eq!(fetched, kek);
    assert_eq!(fetched.kms_type, "aws-kms");
    assert_eq!(fetched.doc.as_deref(), Some("first"));
}

#[cfg(test)]
#[tokio::test]
async fn test_get_kek_visibility() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cli = MockDekRegistryClient::default();
    cli.register_kek("kek1", "local-kms", "id", true, None, None)
        .await
        .unwrap();

    let live = cli.get_kek("kek1", true).await.unwrap();
    assert!(!live.deleted);
    assert!(cli.get_kek("kek0", true).await.unwrap_err().is_not_found());

    // tombstones are only visible to requests that ask for them
    let mut tombstone = Kek::new("kek1", "local-kms", "id", true, None, None);
    tombstone.deleted = true;
    cli.kek_cache.insert(KekId::new("kek1", true), tombstone.clone());
    assert_eq!(cli.get_kek("kek1", true).await.unwrap(), tombstone);

    let mut hidden = tombstone.clone();
    hidden.name = String::from("kek2");
    cli.kek_cache.insert(KekId::new("kek2", false), hidden);
    assert!(cli.get_kek("kek2", false).await.unwrap_err().is_not_found());

    // a live record under the deleted partition is still returned
    let live = Kek::new("kek3", "local-kms", "id", false, None, None);
    cli.kek_cache.insert(KekId::new("kek3", true), live.clone());
    assert_eq!(cli.get_kek("kek3", true).await.unwrap(), live);
}

#[cfg(test)]
#[tokio::test]
async fn test_register_dek() {
    let _ = env_logger::builder().is_test(true).try_init();
    use crate::constants::DEFAULT_DEK_VERSION;

    let mut cli = MockDekRegistryClient::new(ClientConfig::new(vec![String::from("mock://")]));
    assert_eq!(cli.config().base_urls, vec![String::from("mock://")]);

    let dek = cli
        .register_dek(
            "kek1",
            "sub1",
            "AES256",
            DEFAULT_DEK_VERSION,
            Some("Zm9v"),
        )
        .await
        .unwrap();
    assert_eq!(dek.version, 1);
    assert_eq!(dek.ts, MOCK_TS);
    assert!(!dek.deleted);

    let again = cli
        .register_dek("kek1", "sub1", "AES256", 1, Some("YmFy"))
        .await
        .unwrap();
    assert_eq!(again, dek);

    let mut fetched = cli
        .get_dek("kek1", "sub1", "AES256", 1, false)
        .await
        .unwrap();
    assert_eq!(fetched.encrypted_key_material.as_deref(), Some("Zm9v"));
    assert_eq!(
        cli.get_dek_encrypted_key_material_bytes(&mut fetched)
            .await
            .unwrap(),
        Some(b"foo".to_vec())
    );

    let err = cli
        .get_dek("kek1", "sub1", "AES256", 2, false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Dek not found: sub1");

    // no material registered
    let mut bare = cli
        .register_dek("kek1", "sub2", "AES256", 1, None)
        .await
        .unwrap();
    assert_eq!(bare.encrypted_key_material, None);
    assert_eq!(
        cli.get_dek_encrypted_key_material_bytes(&mut bare)
            .await
            .unwrap(),
        None
    );

    assert!(cli.close().await.is_ok());
}

#[cfg(test)]
#[tokio::test]
async fn test_get_dek_latest_version() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cli = MockDekRegistryClient::default();
    assert!(cli
        .get_dek("kek1", "sub1", "AES256", LATEST_VERSION, false)
        .await
        .unwrap_err()
        .is_not_found());

    for version in [2, 1, 3] {
        cli.register_dek("kek1", "sub1", "AES256", version, None)
            .await
            .unwrap();
    }
    // other families never count towards the latest version
    cli.register_dek("kek1", "sub1", "AES128", 9, None)
        .await
        .unwrap();
    cli.register_dek("kek1", "sub2", "AES256", 7, None)
        .await
        .unwrap();
    cli.register_dek("kek2", "sub1", "AES256", 5, None)
        .await
        .unwrap();

    let latest = cli
        .get_dek("kek1", "sub1", "AES256", LATEST_VERSION, false)
        .await
        .unwrap();
    assert_eq!(latest.version, 3);

    // non-positive versions never resolve as latest
    cli.register_dek("kek1", "sub9", "AES256", 0, None)
        .await
        .unwrap();
    cli.register_dek("kek1", "sub9", "AES256", LATEST_VERSION, None)
        .await
        .unwrap();
    assert!(cli
        .get_dek("kek1", "sub9", "AES256", LATEST_VERSION, false)
        .await
        .unwrap_err()
        .is_not_found());

    // nothing lives in the deleted partition
    assert!(cli
        .get_dek("kek1", "sub1", "AES256", LATEST_VERSION, true)
        .await
        .unwrap_err()
        .is_not_found());
}

#[cfg(test)]
#[tokio::test]
async fn test_get_dek_deleted_partition() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cli = MockDekRegistryClient::default();
    cli.register_dek("kek1", "sub1", "AES256", 1, None)
        .await
        .unwrap();
    cli.register_dek("kek1", "sub1", "AES256", 2, None)
        .await
        .unwrap();

    // a tombstone at version 4 drives resolution for deleted requests,
    // but the fetch still reads the non-deleted partition
    let mut tombstone = Dek::new("kek1", "sub1", "AES256", 4, None, MOCK_TS);
    tombstone.deleted = true;
    cli.dek_cache.insert(DekId::new("kek1", "sub1", 4, "AES256", true), tombstone);
    assert!(cli
        .get_dek("kek1", "sub1", "AES256", LATEST_VERSION, true)
        .await
        .unwrap_err()
        .is_not_found());

    let mut tombstone = Dek::new("kek1", "sub1", "AES256", 2, None, MOCK_TS);
    tombstone.deleted = true;
    cli.dek_cache.insert(DekId::new("kek1", "sub1", 2, "AES256", true), tombstone);
    cli.dek_cache.remove(&DekId::new("kek1", "sub1", 4, "AES256", true));
    let dek = cli
        .get_dek("kek1", "sub1", "AES256", LATEST_VERSION, true)
        .await
        .unwrap();
    assert_eq!(dek.version, 2);
    assert!(!dek.deleted);

    // concrete versions ignore the requested partition
    let dek = cli
        .get_dek("kek1", "sub1", "AES256", 1, true)
        .await
        .unwrap();
    assert_eq!(dek.version, 1);
}

#[cfg(test)]
#[tokio::test]
async fn test_dek_key_material() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cli = MockDekRegistryClient::default();
    let mut dek = cli
        .register_dek("kek1", "sub1", "AES256", 1, Some("Zm9v"))
        .await
        .unwrap();
    assert_eq!(
        cli.get_dek_key_material_bytes(&mut dek).await.unwrap(),
        None
    );

    let key: Vec<u8> = (0..32).collect();
    cli.set_dek_key_material(&mut dek, &key).await.unwrap();
    assert!(dek.key_material.is_some());
    assert_eq!(
        cli.get_dek_key_material_bytes(&mut dek).await.unwrap(),
        Some(key)
    );

    // the caller's copy changed, the cached record did not
    let cached = cli
        .get_dek("kek1", "sub1", "AES256", 1, false)
        .await
        .unwrap();
    assert_eq!(cached.key_material, None);

    // memoized bytes survive a change of the underlying text
    let mut dek = cached;
    let first = cli
        .get_dek_encrypted_key_material_bytes(&mut dek)
        .await
        .unwrap();
    dek.encrypted_key_material = Some(String::from("YmFy"));
    let second = cli
        .get_dek_encrypted_key_material_bytes(&mut dek)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(second, Some(b"foo".to_vec()));

    let mut bad = cli
        .register_dek("kek1", "sub3", "AES256", 1, Some("%%%"))
        .await
        .unwrap();
    let err = cli
        .get_dek_encrypted_key_material_bytes(&mut bad)
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(err, Error::Decode { .. }));
}
