use std::path::Path;
use std::sync::Arc;

use cn_core::{ArticleStorage, Result};

pub mod backends;

pub use backends::*;

/// Open (or create) the SQLite content store at `db_path`.
pub async fn create_storage(db_path: &Path) -> Result<Arc<dyn ArticleStorage>> {
    let storage = SQLiteStorage::new_with_path(db_path).await?;
    tracing::info!("🏦 Storage backend initialized at {}", storage.get_db_path().display());
    Ok(Arc::new(storage))
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}
