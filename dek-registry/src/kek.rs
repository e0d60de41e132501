use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Represents a key encryption key (KEK) record.
/// The key itself lives in the KMS; the record only references it.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Kek {
    pub name: String,
    pub kms_type: String,
    pub kms_key_id: String,

    /// Omitted when never supplied, kept when supplied empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_props: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    pub shared: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl Kek {
    pub fn new(
        name: &str,
        kms_type: &str,
        kms_key_id: &str,
        shared: bool,
        kms_props: Option<BTreeMap<String, String>>,
        doc: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kms_type: kms_type.to_string(),
            kms_key_id: kms_key_id.to_string(),
            kms_props,
            doc: doc.filter(|d| !d.is_empty()).map(String::from),
            shared,
            deleted: false,
        }
    }

    /// Encodes the record in JSON, as the registry service would return it.
    pub fn encode_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[test]
fn test_kek() {
    let kek = Kek::new(
        "kek1",
        "aws-kms",
        "arn:aws:kms:us-west-2:1:key/1",
        false,
        None,
        None,
    );
    assert!(!kek.deleted);
    assert_eq!(
        kek.encode_json().unwrap(),
        r#"{"name":"kek1","kmsType":"aws-kms","kmsKeyId":"arn:aws:kms:us-west-2:1:key/1","shared":false,"deleted":false}"#
    );

    let kek = Kek::new(
        "kek2",
        "local-kms",
        "id",
        true,
        Some(BTreeMap::new()),
        Some(""),
    );
    assert_eq!(kek.kms_props, Some(BTreeMap::new()));
    assert_eq!(kek.doc, None);

    let mut props = BTreeMap::new();
    props.insert(String::from("secret"), String::from("s3cr3t"));
    let kek = Kek::new(
        "kek3",
        "local-kms",
        "id",
        true,
        Some(props),
        Some("test kek"),
    );
    let decoded: Kek = serde_json::from_str(&kek.encode_json().unwrap()).unwrap();
    assert_eq!(decoded, kek);

    // "deleted" defaults to false when the service omits it
    let decoded: Kek =
        serde_json::from_str(r#"{"name":"k","kmsType":"t","kmsKeyId":"i","shared":false}"#)
            .unwrap();
    assert!(!decoded.deleted);
}
