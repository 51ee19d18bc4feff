//! Main Network struct and public API.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{NetworkError, Result};
use crate::model::{NetDocument, Phase};
use crate::projection::project;
use crate::reconcile::{Reconciliation, reconcile_data_source};
use crate::text::{Parser, ParserConfig};
use crate::validation::{ValidationConfig, Validator};

/// Configuration for a [`Network`].
#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    /// Text parsing and schema strictness.
    pub parser: ParserConfig,
    /// Validation settings.
    pub validation: ValidationConfig,
}

/// Where the loaded network came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// File path, when loaded with [`Network::load_file`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// SHA-256 hash of the loaded text.
    pub hash: String,
    /// Size of the loaded text in bytes.
    pub size_bytes: u64,
    /// Number of layers at load time.
    pub layer_count: usize,
}

/// A network description loaded once and then edited in place.
///
/// Every operation other than loading fails with
/// [`NetworkError::NotLoaded`] until `load_text` or `load_file` succeeds.
pub struct Network {
    parser: Parser,
    validator: Validator,
    document: Option<NetDocument>,
    source: Option<SourceInfo>,
}

impl Network {
    /// Create an unloaded network with default configuration.
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    /// Create an unloaded network with custom configuration.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            parser: Parser::with_config(config.parser),
            validator: Validator::with_config(config.validation),
            document: None,
            source: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Metadata about the loaded text, if loaded.
    pub fn source(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }

    // ---- Loading ----

    /// Load a prototxt file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.require_unloaded()?;

        let text = fs::read_to_string(path).map_err(|e| NetworkError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_text(&text)?;

        if let Some(source) = self.source.as_mut() {
            source.path = Some(path.to_path_buf());
        }
        Ok(())
    }

    /// Load prototxt text.
    pub fn load_text(&mut self, text: &str) -> Result<()> {
        self.require_unloaded()?;

        let message = self.parser.parse(text)?;
        let document = NetDocument::from_message(&message, self.parser.config())?;

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());

        self.source = Some(SourceInfo {
            path: None,
            hash: format!("sha256:{:x}", hasher.finalize()),
            size_bytes: text.len() as u64,
            layer_count: document.len(),
        });
        log::debug!("loaded network with {} layers", document.len());
        self.document = Some(document);
        Ok(())
    }

    fn require_unloaded(&self) -> Result<()> {
        if self.is_loaded() {
            Err(NetworkError::AlreadyLoaded)
        } else {
            Ok(())
        }
    }

    /// The full, unprojected document.
    pub fn document(&self) -> Result<&NetDocument> {
        self.document.as_ref().ok_or(NetworkError::NotLoaded)
    }

    fn document_mut(&mut self) -> Result<&mut NetDocument> {
        self.document.as_mut().ok_or(NetworkError::NotLoaded)
    }

    /// Consume the network, returning the full document.
    pub fn into_document(self) -> Result<NetDocument> {
        self.document.ok_or(NetworkError::NotLoaded)
    }

    /// The full document rendered as prototxt.
    pub fn to_prototxt(&self) -> Result<String> {
        Ok(self.document()?.to_prototxt())
    }

    // ---- Changing the network ----

    /// Point the train or val data layer at an LMDB database.
    ///
    /// Without `force` only an existing `Data` layer with exactly `tops` is
    /// accepted, and only its `data_param.source` changes. With `force`,
    /// conflicting data layers are deleted and a new one is created at the
    /// front of the network.
    pub fn set_data_source_lmdb<S: AsRef<str>>(
        &mut self,
        phase: Phase,
        tops: &[S],
        filename: impl AsRef<Path>,
        force: bool,
    ) -> Result<Reconciliation> {
        let filename = filename.as_ref();
        let document = self.document_mut()?;
        let source = filename.to_str().ok_or_else(|| {
            NetworkError::InvalidArgument(format!(
                "data source path is not valid UTF-8: {}",
                filename.display()
            ))
        })?;
        reconcile_data_source(document, phase, tops, source, force)
    }

    // ---- Retrieving the train/val/deploy networks ----

    /// Independent copy of the network for `phase`.
    pub fn project(&self, phase: Phase) -> Result<NetDocument> {
        Ok(project(self.document()?, phase))
    }

    /// The network used during the TRAIN phase of training.
    pub fn train_network(&self) -> Result<NetDocument> {
        self.project(Phase::Train)
    }

    /// The network used during the TEST phase of training.
    pub fn val_network(&self) -> Result<NetDocument> {
        self.project(Phase::Val)
    }

    /// Every layer used in training, train or val.
    pub fn trainval_network(&self) -> Result<NetDocument> {
        self.project(Phase::TrainVal)
    }

    /// The network used for deployment.
    pub fn deploy_network(&self) -> Result<NetDocument> {
        self.project(Phase::Deploy)
    }

    // ---- Validation ----

    /// Validate the train, val and deploy networks, in that order.
    pub fn validate(&self) -> Result<()> {
        self.validate_train_network()?;
        self.validate_val_network()?;
        self.validate_deploy_network()
    }

    pub fn validate_train_network(&self) -> Result<()> {
        self.validate_phase(Phase::Train)
    }

    pub fn validate_val_network(&self) -> Result<()> {
        self.validate_phase(Phase::Val)
    }

    pub fn validate_deploy_network(&self) -> Result<()> {
        self.validate_phase(Phase::Deploy)
    }

    fn validate_phase(&self, phase: Phase) -> Result<()> {
        let network = self.project(phase)?;
        self.validator.validate(&network, phase)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NET: &str = r#"
        name: "tiny"
        layer {
          name: "data"
          type: "Data"
          top: "data"
          top: "label"
          include { phase: TRAIN }
          data_param { source: "train_db" }
        }
        layer {
          name: "data"
          type: "Data"
          top: "data"
          top: "label"
          include { phase: TEST }
          data_param { source: "val_db" }
        }
        layer { name: "ip" type: "InnerProduct" bottom: "data" top: "ip" }
        layer { name: "train_loss" type: "SoftmaxWithLoss" bottom: "ip" bottom: "label" top: "loss" }
        layer { name: "deploy_prob" type: "Softmax" bottom: "ip" top: "prob" }
    "#;

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn loaded() -> Network {
        let mut network = Network::new();
        network.load_text(NET).unwrap();
        network
    }

    #[test]
    fn test_load_and_validate() {
        let network = loaded();
        assert!(network.is_loaded());
        network.validate().unwrap();
        assert_eq!(network.document().unwrap().len(), 5);
    }

    #[test]
    fn test_load_twice() {
        let mut network = loaded();
        let err = network.load_text(NET).unwrap_err();
        assert!(matches!(err, NetworkError::AlreadyLoaded));
    }

    #[test]
    fn test_requires_load() {
        let mut network = Network::new();
        assert!(matches!(network.validate(), Err(NetworkError::NotLoaded)));
        assert!(matches!(network.train_network(), Err(NetworkError::NotLoaded)));
        assert!(matches!(
            network.set_data_source_lmdb(Phase::Train, &["data"], "db", false),
            Err(NetworkError::NotLoaded)
        ));
    }

    #[test]
    fn test_failed_load_leaves_network_unloaded() {
        let mut network = Network::new();
        assert!(network.load_text("layer {").is_err());
        assert!(!network.is_loaded());
        network.load_text(NET).unwrap();
    }

    #[test]
    fn test_load_file_records_source() {
        let file = create_test_file(NET);
        let mut network = Network::new();
        network.load_file(file.path()).unwrap();

        let source = network.source().unwrap();
        assert_eq!(source.path.as_deref(), Some(file.path()));
        assert!(source.hash.starts_with("sha256:"));
        assert_eq!(source.size_bytes, NET.len() as u64);
        assert_eq!(source.layer_count, 5);
    }

    #[test]
    fn test_load_file_when_loaded() {
        let mut network = loaded();
        let err = network.load_file("/nonexistent/net.prototxt").unwrap_err();
        assert!(matches!(err, NetworkError::AlreadyLoaded));

        let file = create_test_file(NET);
        assert!(matches!(
            network.load_file(file.path()),
            Err(NetworkError::AlreadyLoaded)
        ));
        assert!(network.source().unwrap().path.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let mut network = Network::new();
        let err = network.load_file("/nonexistent/net.prototxt").unwrap_err();
        assert!(matches!(err, NetworkError::Io { .. }));
    }

    #[test]
    fn test_phase_networks() {
        let network = loaded();
        assert_eq!(network.train_network().unwrap().layer_names(), vec!["data", "ip", "loss"]);
        assert_eq!(network.val_network().unwrap().layer_names(), vec!["data", "ip", "loss"]);
        assert_eq!(network.trainval_network().unwrap().len(), 4);
        assert_eq!(network.deploy_network().unwrap().layer_names(), vec!["data", "ip", "prob"]);
    }

    #[test]
    fn test_set_data_source() {
        let mut network = loaded();
        let outcome = network
            .set_data_source_lmdb(Phase::Train, &["data", "label"], "/jobs/42/train_db", false)
            .unwrap();
        assert_eq!(outcome, Reconciliation::Updated { index: 0 });

        let train = network.train_network().unwrap();
        assert_eq!(train.layers[0].data_source(), Some("/jobs/42/train_db"));
        assert!(network.to_prototxt().unwrap().contains("/jobs/42/train_db"));
    }

    #[cfg(unix)]
    #[test]
    fn test_set_data_source_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut network = loaded();
        let before = network.document().unwrap().clone();
        let path = Path::new(OsStr::from_bytes(b"/db/\xff\xfe"));

        let err = network
            .set_data_source_lmdb(Phase::Train, &["data", "label"], path, true)
            .unwrap_err();
        assert!(err.is_caller_error());
        assert_eq!(network.document().unwrap(), &before);
    }
}
