use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Standard alphabet; encodes with padding, decodes with or without it.
const MATERIAL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Represents a data encryption key (DEK) record.
/// Key material travels as base64 text; the decoded bytes are
/// memoized on the record the first time they are asked for.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Dek {
    pub kek_name: String,
    pub subject: String,
    pub version: i32,
    pub algorithm: String,

    /// Key material wrapped by the KEK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_key_material: Option<String>,
    /// Unwrapped key material, only set once the DEK was decrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_material: Option<String>,

    pub ts: i64,
    #[serde(default)]
    pub deleted: bool,

    #[serde(skip)]
    encrypted_key_material_bytes: Option<Vec<u8>>,
    #[serde(skip)]
    key_material_bytes: Option<Vec<u8>>,
}

/// Memoized bytes are derived state, so they do not take part in equality.
impl PartialEq for Dek {
    fn eq(&self, other: &Self) -> bool {
        self.kek_name == other.kek_name
            && self.subject == other.subject
            && self.version == other.version
            && self.algorithm == other.algorithm
            && self.encrypted_key_material == other.encrypted_key_material
            && self.key_material == other.key_material
            && self.ts == other.ts
            && self.deleted == other.deleted
    }
}
impl Eq for Dek {}

impl Dek {
    pub fn new(
        kek_name: &str,
        subject: &str,
        algorithm: &str,
        version: i32,
        encrypted_key_material: Option<&str>,
        ts: i64,
    ) -> Self {
        Self {
            kek_name: kek_name.to_string(),
            subject: subject.to_string(),
            version,
            algorithm: algorithm.to_string(),
            encrypted_key_material: encrypted_key_material
                .filter(|m| !m.is_empty())
                .map(String::from),
            key_material: None,
            ts,
            deleted: false,
            encrypted_key_material_bytes: None,
            key_material_bytes: None,
        }
    }

    /// Returns the decoded "encrypted_key_material", or None if unset.
    /// Decodes once; later calls return the memoized bytes even if
    /// the text has been changed since.
    pub fn encrypted_key_material_bytes(&mut self) -> Result<Option<&[u8]>> {
        decode_memoized(
            self.encrypted_key_material.as_deref(),
            &mut self.encrypted_key_material_bytes,
        )
    }

    /// Same as "encrypted_key_material_bytes" for the unwrapped material.
    pub fn key_material_bytes(&mut self) -> Result<Option<&[u8]>> {
        decode_memoized(self.key_material.as_deref(), &mut self.key_material_bytes)
    }

    /// Stores the unwrapped key material as base64 text.
    /// Empty input leaves the record untouched.
    pub fn set_key_material(&mut self, key_material_bytes: &[u8]) {
        if key_material_bytes.is_empty() {
            return;
        }
        self.key_material = Some(MATERIAL_ENGINE.encode(key_material_bytes));
    }

    /// Encodes the record in JSON, as the registry service would return it.
    pub fn encode_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn decode_memoized<'a>(
    text: Option<&str>,
    memo: &'a mut Option<Vec<u8>>,
) -> Result<Option<&'a [u8]>> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(None),
    };
    if memo.is_none() {
        let decoded = MATERIAL_ENGINE.decode(text).map_err(Error::decode)?;
        debug!("decoded {}-byte key material", decoded.len());
        *memo = Some(decoded);
    }
    Ok(memo.as_deref())
}

#[test]
fn test_dek_material() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut dek = Dek::new("kek1", "sub1", "AES256", 1, Some("Zm9v"), 0);
    assert_eq!(
        dek.encrypted_key_material_bytes().unwrap(),
        Some(&b"foo"[..])
    );
    assert_eq!(dek.key_material_bytes().unwrap(), None);

    // memoized: the changed text is not decoded again
    dek.encrypted_key_material = Some(String::from("YmFy"));
    assert_eq!(
        dek.encrypted_key_material_bytes().unwrap(),
        Some(&b"foo"[..])
    );

    dek.set_key_material(&[]);
    assert_eq!(dek.key_material, None);

    let key = [7u8; 32];
    dek.set_key_material(&key);
    assert_eq!(dek.key_material_bytes().unwrap(), Some(&key[..]));

    let mut dek = Dek::new("kek1", "sub1", "AES256", 1, Some("not base64!"), 0);
    let err = dek.encrypted_key_material_bytes().unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));

    // unpadded text decodes like padded text
    let mut dek = Dek::new("kek1", "sub1", "AES256", 1, Some("Zm9vYg"), 0);
    assert_eq!(
        dek.encrypted_key_material_bytes().unwrap(),
        Some(&b"foob"[..])
    );
    let mut dek = Dek::new("kek1", "sub1", "AES256", 1, Some("Zm9vYg=="), 0);
    assert_eq!(
        dek.encrypted_key_material_bytes().unwrap(),
        Some(&b"foob"[..])
    );

    // empty material is the same as none
    let mut dek = Dek::new("kek1", "sub1", "AES256", 1, Some(""), 0);
    assert_eq!(dek.encrypted_key_material, None);
    assert_eq!(dek.encrypted_key_material_bytes().unwrap(), None);
}

#[test]
fn test_dek_json() {
    let mut dek = Dek::new("kek1", "sub1", "AES256", 2, None, 42);
    assert_eq!(
        dek.encode_json().unwrap(),
        r#"{"kekName":"kek1","subject":"sub1","version":2,"algorithm":"AES256","ts":42,"deleted":false}"#
    );

    dek.set_key_material(b"foo");
    let _ = dek.key_material_bytes().unwrap();
    let encoded = dek.encode_json().unwrap();
    assert!(encoded.contains(r#""keyMaterial":"Zm9v""#));
    assert!(!encoded.contains("Bytes"));

    let decoded: Dek = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, dek);
}
