//! Decompress and untar a package archive into the cache, atomically.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;
use tar::Archive;

/// Extract a `.tar.gz` byte stream into `final_dir`, via a sibling
/// staging directory so a crash mid-extract never leaves something
/// that looks like a complete package. `final_dir` and `staging_dir`
/// must be distinct paths in the same parent directory.
pub fn extract_tar_gz(bytes: &[u8], staging_dir: &Path, final_dir: &Path) -> Result<()> {
    if staging_dir.exists() {
        fs::remove_dir_all(staging_dir)?;
    }
    fs::create_dir_all(staging_dir)?;

    let result = (|| -> Result<()> {
        let decoder = GzDecoder::new(bytes);
        let mut archive = Archive::new(decoder);
        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.to_path_buf();
            let dest = staging_dir.join(&path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            if entry.header().entry_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                fs::write(&dest, buf)?;
            }
        }
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_dir_all(staging_dir);
        return result.map_err(|e| Error::InvalidStructure(format!("extraction failed: {e}")));
    }

    if final_dir.exists() {
        // Another caller finished first; our staging copy is redundant.
        let _ = fs::remove_dir_all(staging_dir);
        return Ok(());
    }

    fs::rename(staging_dir, final_dir)?;
    Ok(())
}

/// Remove a stale staging directory left behind by a previous crashed
/// attempt, so the next extraction starts clean.
pub fn clean_stale_staging(staging_dir: &Path) -> Result<()> {
    if staging_dir.exists() {
        fs::remove_dir_all(staging_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tar::Builder;

    fn build_archive() -> Vec<u8> {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = Builder::new(&mut tar_bytes);
            let data = b"{\"name\":\"test\"}";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_cksum();
            builder
                .append_data(&mut header, "package/package.json", &data[..])
                .unwrap();
            builder.finish().unwrap();
        }
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&tar_bytes).unwrap();
        gz.finish().unwrap()
    }

    #[test]
    fn extracts_into_final_dir_via_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join(".pkg.staging");
        let final_dir = tmp.path().join("pkg#1.0.0");

        extract_tar_gz(&build_archive(), &staging, &final_dir).unwrap();

        assert!(final_dir.join("package/package.json").exists());
        assert!(!staging.exists());
    }

    #[test]
    fn second_extraction_is_a_noop_when_final_dir_already_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join(".pkg.staging");
        let final_dir = tmp.path().join("pkg#1.0.0");

        extract_tar_gz(&build_archive(), &staging, &final_dir).unwrap();
        extract_tar_gz(&build_archive(), &staging, &final_dir).unwrap();

        assert!(final_dir.join("package/package.json").exists());
    }
}
