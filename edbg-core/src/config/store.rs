//! Layout storage backends

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::layout::{LayoutKey, RegisterLayout, LAYOUT_VERSION};
use super::settings::DebuggerConfig;

/// Layout persistence errors
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout file error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid TOML layout: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("cannot write TOML layout: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("binary layout error: {0}")]
    Deserialize(#[from] postcard::Error),
    #[error("layout version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u8, expected: u8 },
}

/// Source of register layouts keyed by node firmware
pub trait LayoutStore {
    /// Load the layout for `key`; `Ok(None)` if none is stored
    fn load(&mut self, key: &LayoutKey) -> Result<Option<RegisterLayout>, LayoutError>;

    /// Store the layout for `key`, replacing any previous one
    fn store(&mut self, key: &LayoutKey, layout: &RegisterLayout) -> Result<(), LayoutError>;
}

fn check_version(layout: &RegisterLayout) -> Result<(), LayoutError> {
    if layout.version != LAYOUT_VERSION {
        warn!(
            "Layout version mismatch: found {}, expected {}",
            layout.version, LAYOUT_VERSION
        );
        return Err(LayoutError::VersionMismatch {
            found: layout.version,
            expected: LAYOUT_VERSION,
        });
    }
    Ok(())
}

/// Log a summary of a loaded layout
fn log_layout_summary(key: &LayoutKey, layout: &RegisterLayout) {
    info!("Layout {} loaded", key.file_stem());
    debug!("  {} registers", layout.registers.len());
    debug!(
        "  {} root registers",
        layout.registers.iter().filter(|r| r.parent.is_none()).count()
    );
}

/// Layouts held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStore {
    layouts: BTreeMap<LayoutKey, RegisterLayout>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load(&mut self, key: &LayoutKey) -> Result<Option<RegisterLayout>, LayoutError> {
        Ok(self.layouts.get(key).cloned())
    }

    fn store(&mut self, key: &LayoutKey, layout: &RegisterLayout) -> Result<(), LayoutError> {
        self.layouts.insert(key.clone(), layout.clone());
        Ok(())
    }
}

/// Layout files below a root directory
///
/// Each layout lives at
/// `<root>/<connector>/<node name>/cpuII-VMM_mm_PPPP.toml`, with an optional
/// postcard encoded `.bin` file next to it.
#[derive(Debug, Clone)]
pub struct DirLayoutStore {
    root: PathBuf,
}

impl DirLayoutStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the configured layout directory
    pub fn from_config(config: &DebuggerConfig) -> Self {
        Self::new(&config.layout_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the layout file with `extension`
    pub fn path(&self, key: &LayoutKey, extension: &str) -> PathBuf {
        self.root.join(key.relative_path(extension))
    }

    fn load_toml(&self, key: &LayoutKey) -> Result<RegisterLayout, LayoutError> {
        let text = fs::read_to_string(self.path(key, "toml"))?;
        debug!("Read {} bytes of TOML layout", text.len());

        let layout: RegisterLayout = toml::from_str(&text)?;
        check_version(&layout)?;
        Ok(layout)
    }

    fn load_binary(&self, key: &LayoutKey) -> Result<RegisterLayout, LayoutError> {
        let bytes = fs::read(self.path(key, "bin"))?;
        debug!("Read {} bytes of binary layout", bytes.len());

        let layout: RegisterLayout = postcard::from_bytes(&bytes)?;
        check_version(&layout)?;
        Ok(layout)
    }

    /// Store the layout in the postcard binary format
    pub fn store_binary(&self, key: &LayoutKey, layout: &RegisterLayout) -> Result<(), LayoutError> {
        let path = self.path(key, "bin");
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let bytes = postcard::to_allocvec(layout)?;
        fs::write(&path, bytes)?;
        debug!("Wrote binary layout {}", path.display());
        Ok(())
    }
}

fn is_not_found(err: &LayoutError) -> bool {
    matches!(err, LayoutError::Io(e) if e.kind() == io::ErrorKind::NotFound)
}

impl LayoutStore for DirLayoutStore {
    /// Tries the TOML file first and falls back to the binary file
    fn load(&mut self, key: &LayoutKey) -> Result<Option<RegisterLayout>, LayoutError> {
        info!("Loading layout {}", key.file_stem());

        let toml_error = match self.load_toml(key) {
            Ok(layout) => {
                info!("Loaded layout from TOML");
                log_layout_summary(key, &layout);
                return Ok(Some(layout));
            }
            Err(e) if is_not_found(&e) => {
                debug!("No TOML layout found, trying binary format");
                None
            }
            Err(e) => {
                warn!("Failed to load TOML layout: {}, trying binary", e);
                Some(e)
            }
        };

        match self.load_binary(key) {
            Ok(layout) => {
                log_layout_summary(key, &layout);
                Ok(Some(layout))
            }
            Err(e) if is_not_found(&e) => match toml_error {
                Some(e) => Err(e),
                None => {
                    debug!("No layout stored for {}", key.file_stem());
                    Ok(None)
                }
            },
            Err(e) => Err(e),
        }
    }

    fn store(&mut self, key: &LayoutKey, layout: &RegisterLayout) -> Result<(), LayoutError> {
        let path = self.path(key, "toml");
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let text = toml::to_string(layout)?;
        fs::write(&path, text)?;
        info!("Stored layout {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegisterDef;
    use edbg_protocol::{Direction, Source, Version, VariableType};

    fn key() -> LayoutKey {
        LayoutKey {
            connector: "Serial".to_string(),
            node_id: 1,
            node_name: "FOITN".to_string(),
            application_version: Version::new(0, 5, 0),
        }
    }

    fn layout() -> RegisterLayout {
        RegisterLayout::new(vec![
            RegisterDef {
                id: 1,
                name: "speed".to_string(),
                offset: 0x10,
                var_type: VariableType::Int,
                size: 4,
                direction: Direction::ReadWrite,
                source: Source::ElfParsed,
                deref_depth: 0,
                parent: None,
            },
            RegisterDef {
                id: 2,
                name: "limit".to_string(),
                offset: 0x14,
                var_type: VariableType::Double,
                size: 8,
                direction: Direction::Read,
                source: Source::HandwrittenOffset,
                deref_depth: 1,
                parent: Some(1),
            },
        ])
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryLayoutStore::new();
        assert!(store.load(&key()).unwrap().is_none());

        store.store(&key(), &layout()).unwrap();
        assert_eq!(store.load(&key()).unwrap(), Some(layout()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dir_store_toml() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirLayoutStore::new(dir.path());

        assert!(store.load(&key()).unwrap().is_none());

        store.store(&key(), &layout()).unwrap();
        assert!(dir
            .path()
            .join("Serial/FOITN/cpu01-V00_05_0000.toml")
            .exists());
        assert_eq!(store.load(&key()).unwrap(), Some(layout()));
    }

    #[test]
    fn test_dir_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        DirLayoutStore::new(dir.path()).store(&key(), &layout()).unwrap();

        let config = DebuggerConfig {
            layout_dir: dir.path().to_path_buf(),
            ..DebuggerConfig::default()
        };
        let mut store = DirLayoutStore::from_config(&config);
        assert_eq!(store.root(), dir.path());
        assert_eq!(store.load(&key()).unwrap(), Some(layout()));

        let mut elsewhere = DirLayoutStore::from_config(&DebuggerConfig {
            layout_dir: dir.path().join("other"),
            ..DebuggerConfig::default()
        });
        assert!(elsewhere.load(&key()).unwrap().is_none());
    }

    #[test]
    fn test_dir_store_binary_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirLayoutStore::new(dir.path());

        store.store_binary(&key(), &layout()).unwrap();
        assert!(!store.path(&key(), "toml").exists());
        assert_eq!(store.load(&key()).unwrap(), Some(layout()));
    }

    #[test]
    fn test_dir_store_broken_toml_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirLayoutStore::new(dir.path());

        store.store_binary(&key(), &layout()).unwrap();
        fs::write(store.path(&key(), "toml"), "not = [valid").unwrap();
        assert_eq!(store.load(&key()).unwrap(), Some(layout()));

        // Without a binary file the TOML error is reported
        fs::remove_file(store.path(&key(), "bin")).unwrap();
        assert!(matches!(
            store.load(&key()),
            Err(LayoutError::TomlParse(_))
        ));
    }

    #[test]
    fn test_dir_store_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirLayoutStore::new(dir.path());
        let path = store.path(&key(), "toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "version = 7\n").unwrap();

        assert!(matches!(
            store.load(&key()),
            Err(LayoutError::VersionMismatch {
                found: 7,
                expected: LAYOUT_VERSION
            })
        ));
    }
}
