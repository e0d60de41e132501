use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{config::ClientConfig, dek::Dek, errors::Result, kek::Kek};

/// Key registry interface used by the field-level encryption rules.
/// Implemented by the in-memory "MockDekRegistryClient"; a networked
/// client would implement the same operations against the registry REST API.
#[async_trait]
pub trait DekClient: Send + Sync {
    /// Returns the settings the client was created with.
    fn config(&self) -> &ClientConfig;

    /// Registers a KEK, or returns the visible KEK already registered
    /// under the same name.
    async fn register_kek(
        &mut self,
        name: &str,
        kms_type: &str,
        kms_key_id: &str,
        shared: bool,
        kms_props: Option<BTreeMap<String, String>>,
        doc: Option<&str>,
    ) -> Result<Kek>;

    /// Fetches a KEK. With "deleted" set, soft-deleted KEKs are returned too.
    async fn get_kek(&self, name: &str, deleted: bool) -> Result<Kek>;

    /// Registers a DEK, or returns the visible DEK already registered
    /// with the same identity.
    async fn register_dek(
        &mut self,
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        version: i32,
        encrypted_key_material: Option<&str>,
    ) -> Result<Dek>;

    /// Fetches a DEK. "LATEST_VERSION" resolves to the highest version registered.
    async fn get_dek(
        &self,
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        version: i32,
        deleted: bool,
    ) -> Result<Dek>;

    async fn get_dek_encrypted_key_material_bytes(&self, dek: &mut Dek) -> Result<Option<Vec<u8>>>;

    async fn get_dek_key_material_bytes(&self, dek: &mut Dek) -> Result<Option<Vec<u8>>>;

    async fn set_dek_key_material(&self, dek: &mut Dek, key_material_bytes: &[u8]) -> Result<()>;

    /// Releases the resources held by the client.
    async fn close(&mut self) -> Result<()>;
}
