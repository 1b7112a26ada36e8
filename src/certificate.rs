//! Certificate access for webhook registration.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An open certificate. Dropping the handle releases it.
pub type CertificateHandle = Box<dyn Read + Send>;

/// Opens certificate files by path.
pub trait CertificateStore: Send + Sync {
    fn open(&self, path: &Path) -> std::io::Result<CertificateHandle>;
}

/// Reads certificates from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCertificateStore;

impl CertificateStore for FsCertificateStore {
    fn open(&self, path: &Path) -> std::io::Result<CertificateHandle> {
        Ok(Box::new(File::open(path)?))
    }
}

/// Open `path` and read it fully. The handle is dropped before returning,
/// whether or not the read succeeded.
pub fn read_certificate(store: &dyn CertificateStore, path: &Path) -> std::io::Result<Vec<u8>> {
    let mut handle = store.open(path)?;
    let mut content = Vec::new();
    handle.read_to_end(&mut content)?;
    Ok(content)
}
