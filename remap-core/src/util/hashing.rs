use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Hex blake3 digest of a single file.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Hex blake3 digest of a directory tree: relative paths and file contents in
/// sorted walk order, so the digest is stable across platforms.
pub fn hash_tree(root: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    for entry in walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        hasher.update(rel.as_bytes());
        hasher.update(&[0]);
        let mut f = File::open(entry.path())?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = f.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Digest dispatching on artifact shape: directories hash as trees.
pub fn hash_path(path: &Path) -> Result<String> {
    if path.is_dir() {
        hash_tree(path)
    } else {
        hash_file(path)
    }
}
