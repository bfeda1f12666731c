//! Persistence Engine
//!
//! Writes one file per registry entry, named `<identity>-<name>.<ext>`, and
//! rebuilds a registry by scanning a directory tree for that naming
//! convention. There is no manifest: the file set is the source of truth.
//!
//! Saves are not transactional. Each file is written independently, so a
//! failure part-way through leaves the files already written in place, and
//! files from earlier saves under other names are never removed. Loads are
//! all-or-nothing: any unreadable or undecodable artifact fails the load.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::codec;
use crate::config::PersistenceConfig;
use crate::error::{StoreError, StoreResult};
use crate::identity::{has_path_separator, CalibratorIdentity};
use crate::registry::{Registry, SerializationKind};
use crate::state::CalibratorState;

#[derive(Debug, Clone, Default)]
pub struct Persistence {
    config: PersistenceConfig,
}

impl Persistence {
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Save a fitted calibrator's registry into `output_dir`.
    ///
    /// Returns the paths written, binary artifacts first.
    pub fn save(&self, state: &CalibratorState, output_dir: &Path) -> StoreResult<Vec<PathBuf>> {
        ensure_directory(output_dir)?;
        if !state.fit_status() {
            return Err(StoreError::NotFitted {
                identity: state.identity().to_string(),
            });
        }
        self.save_registry(state.registry(), state.identity(), output_dir)
    }

    /// Write every entry of `registry` without checking fit status
    pub fn save_registry(
        &self,
        registry: &Registry,
        identity: &CalibratorIdentity,
        output_dir: &Path,
    ) -> StoreResult<Vec<PathBuf>> {
        ensure_directory(output_dir)?;

        // Reject bad names before anything touches the disk
        if let Some(bad) = registry.names().find(|name| !is_valid_name(name)) {
            return Err(StoreError::InvalidName(bad.to_string()));
        }

        let mut written = Vec::with_capacity(registry.len());
        for kind in SerializationKind::ALL {
            for (name, payload) in registry.entries_of_kind(kind) {
                let path = output_dir.join(identity.file_name(name, kind));
                let bytes = codec::encode_artifact(payload, self.config.pretty_json).map_err(
                    |reason| StoreError::Encode {
                        name: name.to_string(),
                        reason,
                    },
                )?;
                write_file(&path, &bytes)?;
                tracing::debug!("Wrote {} artifact {} ({} bytes)", kind, path.display(), bytes.len());
                written.push(path);
            }
        }

        tracing::info!(
            "Saved {} objects for '{}' to {}",
            written.len(),
            identity,
            output_dir.display()
        );
        Ok(written)
    }

    /// Rebuild a registry from every artifact of `identity` under `input_dir`.
    ///
    /// Sub-directories are searched. Files with other prefixes or unknown
    /// extensions are ignored; finding nothing yields an empty registry.
    pub fn load(&self, identity: &CalibratorIdentity, input_dir: &Path) -> StoreResult<Registry> {
        ensure_directory(input_dir)?;

        let mut walker = WalkDir::new(input_dir)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth.saturating_add(1));
        }

        let mut registry = Registry::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| input_dir.to_path_buf());
                StoreError::io(path, e.into())
            })?;
            // Symlinked files count as artifacts; `follow_links` only governs
            // descending into linked directories
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            let Some((name, kind)) = identity.parse_file_name(file_name) else {
                continue;
            };

            let path = entry.path();
            let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
            let payload =
                codec::decode_artifact(kind, &bytes).map_err(|reason| StoreError::corrupt(path, reason))?;

            if registry.contains(name) {
                tracing::debug!("Artifact {} replaces an earlier '{}' entry", path.display(), name);
            }
            tracing::debug!("Read {} artifact {}", kind, path.display());
            registry.register(name, payload);
        }

        tracing::info!(
            "Loaded {} objects for '{}' from {}",
            registry.len(),
            identity,
            input_dir.display()
        );
        Ok(registry)
    }
}

fn ensure_directory(path: &Path) -> StoreResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(StoreError::InvalidTarget {
            path: path.to_path_buf(),
        }),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !has_path_separator(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    writer.flush().map_err(|e| StoreError::io(path, e))
}
