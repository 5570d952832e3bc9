use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use time::OffsetDateTime;

use crate::cache::layout::{ArtifactKind, CacheKey, artifact_path};
use crate::error::{RemapError, Result};
use crate::util::hashing::hash_path;

const KINDS: [ArtifactKind; 5] = [
    ArtifactKind::RawJar,
    ArtifactKind::MappingFile,
    ArtifactKind::RenamedJar,
    ArtifactKind::DecompiledTree,
    ArtifactKind::DecompiledMods,
];

/// Per-(kind, key) cache record. Created implicitly on first query, mutated
/// only by `publish`; this subsystem never evicts.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub present: bool,
    pub integrity: Option<String>,
    pub last_verified: Option<OffsetDateTime>,
}

impl CacheEntry {
    fn absent(path: PathBuf) -> Self {
        Self {
            path,
            present: false,
            integrity: None,
            last_verified: None,
        }
    }
}

/// On-disk staged-artifact cache, one subtree per artifact kind, keyed by
/// (version, mapping scheme). Publication is an atomic rename: a reader can
/// never observe a partially written artifact.
pub struct CacheStore {
    root: PathBuf,
    staging: PathBuf,
    entries: DashMap<(ArtifactKind, CacheKey), CacheEntry>,
}

impl CacheStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for kind in KINDS {
            fs::create_dir_all(root.join(kind.subdir()))?;
        }
        let staging = root.join("tmp");
        fs::create_dir_all(&staging)?;
        Ok(Self {
            root,
            staging,
            entries: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Same-filesystem scratch space, so the publish rename stays atomic.
    /// Orphans left here by a crash are never treated as published.
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Presence/integrity check only; never triggers production. When an
    /// integrity marker is recorded but not yet verified, the artifact is
    /// hashed once and the verification timestamp cached.
    pub fn has(&self, kind: ArtifactKind, key: &CacheKey) -> bool {
        let path = artifact_path(&self.root, kind, key);
        let mut entry = self
            .entries
            .entry((kind, key.clone()))
            .or_insert_with(|| CacheEntry::absent(path.clone()));

        if !path.exists() {
            entry.present = false;
            return false;
        }
        if let Some(expected) = entry.integrity.clone()
            && entry.last_verified.is_none()
        {
            match hash_path(&path) {
                Ok(actual) if actual == expected => {
                    entry.last_verified = Some(OffsetDateTime::now_utc());
                }
                _ => {
                    tracing::warn!(%kind, %key, "artifact failed integrity re-check");
                    entry.present = false;
                    return false;
                }
            }
        }
        entry.present = true;
        true
    }

    pub fn locate(&self, kind: ArtifactKind, key: &CacheKey) -> Option<PathBuf> {
        if self.has(kind, key) {
            Some(artifact_path(&self.root, kind, key))
        } else {
            None
        }
    }

    /// Move a staged artifact into its canonical location, verifying the
    /// expected hash first when one is supplied. On mismatch the temp
    /// artifact is discarded and the cache is left in its prior state.
    pub fn publish(
        &self,
        kind: ArtifactKind,
        key: &CacheKey,
        temp: &Path,
        expected_hash: Option<&str>,
    ) -> Result<PathBuf> {
        let actual = hash_path(temp)?;
        if let Some(expected) = expected_hash
            && expected != actual
        {
            discard(temp);
            tracing::warn!(%kind, %key, expected, actual, "rejecting corrupt artifact");
            return Err(RemapError::CacheCorruption {
                path: temp.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }

        let dest = artifact_path(&self.root, kind, key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        // rename over an existing directory fails; clear it first
        if kind.is_directory() && dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        fs::rename(temp, &dest)?;

        self.entries.insert(
            (kind, key.clone()),
            CacheEntry {
                path: dest.clone(),
                present: true,
                integrity: Some(actual),
                last_verified: Some(OffsetDateTime::now_utc()),
            },
        );
        tracing::info!(%kind, %key, path = %dest.display(), "published artifact");
        Ok(dest)
    }

    /// Keys with a successfully published artifact, sorted. Staging files and
    /// foreign names never appear.
    pub fn list(&self, kind: ArtifactKind) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(self.root.join(kind.subdir()))? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str()
                && let Some(key) = kind.parse_name(name)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn discard(temp: &Path) {
    let result = if temp.is_dir() {
        fs::remove_dir_all(temp)
    } else {
        fs::remove_file(temp)
    };
    if let Err(e) = result {
        tracing::warn!(path = %temp.display(), error = %e, "failed to discard staged artifact");
    }
}
