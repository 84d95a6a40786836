//! Free space check before anything is downloaded

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use loopdown_core::package::ContentPackage;
use loopdown_core::size::ByteSize;
use loopdown_core::Error as CoreError;

use crate::error::Result;

/// Bytes a run needs: everything downloaded plus everything installed
pub fn required_space(packages: &[ContentPackage]) -> ByteSize {
    packages
        .iter()
        .map(|pkg| pkg.download_size + pkg.installed_size)
        .sum()
}

/// Compare a requirement against the space available at `path`
pub fn evaluate(required: ByteSize, available: ByteSize, path: &Utf8Path) -> Result<()> {
    if available < required {
        return Err(CoreError::insufficient_space(required, available, path).into());
    }
    Ok(())
}

/// Nearest ancestor of `path` that exists, starting with `path` itself
pub fn nearest_existing(path: &Utf8Path) -> Utf8PathBuf {
    path.ancestors()
        .find(|candidate| !candidate.as_str().is_empty() && candidate.exists())
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| Utf8PathBuf::from("/"))
}

/// Free bytes on the volume holding `path` (or its nearest existing ancestor)
pub fn available_space(path: &Utf8Path) -> Result<ByteSize> {
    let existing = nearest_existing(path);
    let bytes = fs4::available_space(existing.as_std_path())?;
    debug!("{} bytes available at {}", bytes, existing);
    Ok(ByteSize::from(bytes))
}

/// Fail with `InsufficientSpace` when the packages do not fit at `path`
pub fn check(packages: &[ContentPackage], path: &Utf8Path) -> Result<()> {
    let required = required_space(packages);
    let available = available_space(path)?;

    evaluate(required, available, path)?;
    info!(
        "Disk space check passed: {} required, {} available at {}",
        required.human(),
        available.human(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn pkg(id: &str, download: i64, installed: i64) -> ContentPackage {
        ContentPackage::new(id, format!("{}.pkg", id))
            .unwrap()
            .with_sizes(download, installed)
    }

    #[test]
    fn test_required_space_sums_both_sizes() {
        let packages = vec![pkg("a", 100, 400), pkg("b", 50, 150)];
        assert_eq!(required_space(&packages), ByteSize::new(700));
        assert_eq!(required_space(&[]), ByteSize::ZERO);
    }

    #[test]
    fn test_evaluate_boundary() {
        let path = Utf8Path::new("/tmp");
        assert!(evaluate(ByteSize::new(100), ByteSize::new(100), path).is_ok());
        assert!(evaluate(ByteSize::new(100), ByteSize::new(101), path).is_ok());

        let err = evaluate(ByteSize::new(100), ByteSize::new(99), path).unwrap_err();
        match err {
            Error::Core(CoreError::InsufficientSpace {
                required,
                available,
                path,
            }) => {
                assert_eq!(required, ByteSize::new(100));
                assert_eq!(available, ByteSize::new(99));
                assert_eq!(path, "/tmp");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nearest_existing_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let missing = root.join("not/yet/created");
        assert_eq!(nearest_existing(&missing), root);
    }

    #[test]
    fn test_check_with_nothing_to_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(check(&[], &root.join("dest")).is_ok());
    }
}
