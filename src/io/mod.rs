mod local;

pub use local::FileSource;

use anyhow::Result;
use async_trait::async_trait;

/// Random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` from `offset`. Fails if the source ends first.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Total size of the data source
    fn size(&self) -> u64;
}
