use std::{
    fs::{self, File},
    io::{self, Error, ErrorKind, Write},
    path::Path,
};

use log::info;
use serde::{Deserialize, Serialize};

/// Represents the settings of a key registry client.
/// The in-memory client accepts and returns these as-is;
/// only a networked client would act on them.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Registry endpoints, tried in order.
    #[serde(default)]
    pub base_urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_latest_ttl_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries_wait_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries_max_wait_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(base_urls: Vec<String>) -> Self {
        Self {
            base_urls,
            ..Default::default()
        }
    }

    /// Converts to string in YAML format.
    pub fn encode_yaml(&self) -> io::Result<String> {
        serde_yaml::to_string(&self).map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed to serialize ClientConfig to YAML {}", e),
            )
        })
    }

    /// Saves the current config to disk
    /// and overwrites the file.
    pub fn sync(&self, file_path: &str) -> io::Result<()> {
        info!("syncing ClientConfig to '{}'", file_path);
        let path = Path::new(file_path);
        if let Some(parent_dir) = path.parent() {
            fs::create_dir_all(parent_dir)?;
        }

        let d = self.encode_yaml()?;
        let mut f = File::create(file_path)?;
        f.write_all(d.as_bytes())?;

        Ok(())
    }

    pub fn load(file_path: &str) -> io::Result<Self> {
        info!("loading ClientConfig from {}", file_path);

        if !Path::new(file_path).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("file {} does not exists", file_path),
            ));
        }

        let f = File::open(file_path).map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed to open {} ({})", file_path, e),
            )
        })?;
        serde_yaml::from_reader(f)
            .map_err(|e| Error::new(ErrorKind::InvalidInput, format!("invalid YAML: {}", e)))
    }
}

#[test]
fn test_client_config() {
    let _ = env_logger::builder().is_test(true).try_init();

    let contents = r#"

base_urls:
- http://localhost:8081
- http://localhost:8082
cache_capacity: 1000
max_retries: 2

"#;
    let mut f = tempfile::NamedTempFile::new().unwrap();
    let ret = f.write_all(contents.as_bytes());
    assert!(ret.is_ok());
    let config_path = f.path().to_str().unwrap();

    let cfg = ClientConfig::load(config_path).unwrap();

    let mut orig = ClientConfig::new(vec![
        String::from("http://localhost:8081"),
        String::from("http://localhost:8082"),
    ]);
    orig.cache_capacity = Some(1000);
    orig.max_retries = Some(2);
    assert_eq!(cfg, orig);

    // absent fields stay absent after a round trip
    let tmp_dir = tempfile::tempdir().unwrap();
    let synced_path = tmp_dir.path().join("nested").join("client.yaml");
    let synced_path = synced_path.to_str().unwrap();
    cfg.sync(synced_path).unwrap();

    let encoded = cfg.encode_yaml().unwrap();
    assert!(!encoded.contains("retries_wait_ms"));

    let reloaded = ClientConfig::load(synced_path).unwrap();
    assert_eq!(reloaded, cfg);
}

#[test]
fn test_client_config_load_errors() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let missing = tmp_dir.path().join("missing.yaml");
    let err = ClientConfig::load(missing.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(b"base_urls: {not: [a list").unwrap();
    let err = ClientConfig::load(f.path().to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
