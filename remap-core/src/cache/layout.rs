use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One cacheable pipeline stage output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    RawJar,
    MappingFile,
    RenamedJar,
    DecompiledTree,
    DecompiledMods,
}

/// (version, mapping-scheme) cache key.
///
/// Raw jars are keyed by version alone: their layout ignores `scheme`, so
/// every mapping scheme shares one download of the same version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub version: String,
    pub scheme: String,
}

impl CacheKey {
    pub fn new(version: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            scheme: scheme.into(),
        }
    }

    /// Version-only key, for artifacts that are scheme-independent.
    pub fn bare(version: impl Into<String>) -> Self {
        Self::new(version, "")
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scheme.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.version, self.scheme)
        }
    }
}

impl ArtifactKind {
    pub fn subdir(&self) -> &'static str {
        match self {
            ArtifactKind::RawJar => "jars",
            ArtifactKind::MappingFile => "mappings",
            ArtifactKind::RenamedJar => "renamed",
            ArtifactKind::DecompiledTree => "decompiled",
            ArtifactKind::DecompiledMods => "decompiled-mods",
        }
    }

    /// Decompiled stages publish whole source trees, not single files.
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            ArtifactKind::DecompiledTree | ArtifactKind::DecompiledMods
        )
    }

    /// Deterministic artifact name; presence is checkable by path existence
    /// alone, no index file. Mapping schemes never collide for one version.
    pub fn file_name(&self, key: &CacheKey) -> String {
        match self {
            ArtifactKind::RawJar => format!("client.{}.jar", key.version),
            ArtifactKind::MappingFile => format!("{}-{}.tiny", key.scheme, key.version),
            ArtifactKind::RenamedJar => format!("{}-{}.jar", key.version, key.scheme),
            ArtifactKind::DecompiledTree | ArtifactKind::DecompiledMods => {
                format!("{}-{}", key.version, key.scheme)
            }
        }
    }

    /// Inverse of [`ArtifactKind::file_name`]; `None` for foreign files.
    /// Scheme names carry no `-`, so versions may (`1.20.1-pre1`).
    pub fn parse_name(&self, name: &str) -> Option<CacheKey> {
        match self {
            ArtifactKind::RawJar => {
                let version = name.strip_prefix("client.")?.strip_suffix(".jar")?;
                Some(CacheKey::bare(version))
            }
            ArtifactKind::MappingFile => {
                let (scheme, version) = name.strip_suffix(".tiny")?.split_once('-')?;
                Some(CacheKey::new(version, scheme))
            }
            ArtifactKind::RenamedJar => {
                let (version, scheme) = name.strip_suffix(".jar")?.rsplit_once('-')?;
                Some(CacheKey::new(version, scheme))
            }
            ArtifactKind::DecompiledTree | ArtifactKind::DecompiledMods => {
                let (version, scheme) = name.rsplit_once('-')?;
                Some(CacheKey::new(version, scheme))
            }
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.subdir())
    }
}

pub fn artifact_path(root: &Path, kind: ArtifactKind, key: &CacheKey) -> PathBuf {
    root.join(kind.subdir()).join(kind.file_name(key))
}
