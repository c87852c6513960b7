//! Catalog collaborator.
//!
//! A catalog is a read-only sequence of [`Record`]s, each naming an output
//! file stem and a remote image to fetch. The pipeline only needs three
//! signals from a source:
//!
//! - `Some(Ok(record))` - the next record
//! - `Some(Err(CatalogError::Item { .. }))` - one unreadable record, skipped
//! - `Some(Err(CatalogError::Fatal { .. }))` or `None` - end of the sequence
//!
//! # Sources
//!
//! - [`MongoCatalog`] - a MongoDB collection (`mongodb://` URIs)
//! - [`JsonLinesCatalog`] - a JSON Lines export, one document per line
//! - [`MemoryCatalog`] - an in-memory sequence for tests and embedding
//!
//! # Example
//!
//! ```ignore
//! use coverfetch::catalog::{open_catalog, CollectionName, FieldProjection};
//!
//! let mut catalog = open_catalog(
//!     "mongodb://localhost:27017",
//!     FieldProjection::default(),
//!     &CollectionName::default(),
//! )
//! .await?;
//! while let Some(item) = catalog.next_record().await {
//!     println!("{:?}", item);
//! }
//! ```

mod jsonl;
mod memory;
mod mongo;
mod types;

use std::path::PathBuf;

use futures::future::BoxFuture;

pub use jsonl::JsonLinesCatalog;
pub use memory::MemoryCatalog;
pub use mongo::{is_mongodb_uri, MongoCatalog, MONGODB_SCHEME, MONGODB_SRV_SCHEME};
pub use types::{
    CatalogError, CollectionName, FieldProjection, Record, DEFAULT_COLLECTION, DEFAULT_DATABASE,
};

/// URI scheme accepted for JSON Lines catalogs.
pub const FILE_SCHEME: &str = "file://";

/// A streamed, read-only source of catalog records.
///
/// Implementations must be `Send` so the dispatcher can drive them from any
/// runtime worker. After yielding a fatal error a source should return
/// `None` on every subsequent call.
pub trait CatalogSource: Send {
    /// Returns the next item, or `None` once the sequence is exhausted.
    fn next_record(&mut self) -> BoxFuture<'_, Option<Result<Record, CatalogError>>>;

    /// Human-readable description of the source for logging.
    fn describe(&self) -> String;
}

/// Opens the catalog named by `uri`.
///
/// - `mongodb://` and `mongodb+srv://` connect to MongoDB and read
///   `collection`
/// - `file://<path>` or a bare filesystem path reads a JSON Lines export
///
/// Any other scheme is rejected as a fatal error.
pub async fn open_catalog(
    uri: &str,
    projection: FieldProjection,
    collection: &CollectionName,
) -> Result<Box<dyn CatalogSource>, CatalogError> {
    let uri = uri.trim();
    if is_mongodb_uri(uri) {
        let catalog = MongoCatalog::open(uri, collection, projection).await?;
        return Ok(Box::new(catalog));
    }

    let path = catalog_path(uri)?;
    let catalog = JsonLinesCatalog::open(path, projection).await?;
    Ok(Box::new(catalog))
}

fn catalog_path(uri: &str) -> Result<PathBuf, CatalogError> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(CatalogError::fatal("catalog URI is empty"));
    }

    if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
        return Ok(PathBuf::from(path));
    }

    if let Some((scheme, _)) = uri.split_once("://") {
        return Err(CatalogError::fatal(format!(
            "unsupported catalog scheme '{}' (use mongodb://, mongodb+srv:// or file://)",
            scheme
        )));
    }

    Ok(PathBuf::from(uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_path_file_scheme() {
        let path = catalog_path("file:///data/podcasts.jsonl").unwrap();
        assert_eq!(path, PathBuf::from("/data/podcasts.jsonl"));
    }

    #[test]
    fn test_catalog_path_bare_path() {
        let path = catalog_path("podcasts.jsonl").unwrap();
        assert_eq!(path, PathBuf::from("podcasts.jsonl"));
    }

    #[test]
    fn test_catalog_path_rejects_other_schemes() {
        let err = catalog_path("postgres://localhost/podgo").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("postgres"));
    }

    #[test]
    fn test_catalog_path_rejects_empty() {
        assert!(catalog_path("   ").unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_open_catalog_routes_mongodb_scheme() {
        // An unreachable server surfaces as a fatal open error, not a
        // rejected scheme or a missing file
        let result = open_catalog(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200",
            FieldProjection::default(),
            &CollectionName::default(),
        )
        .await;

        match result {
            Err(CatalogError::Fatal { reason }) => {
                assert!(reason.contains("podgo.podcasts"), "{}", reason)
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("nothing listens on port 1"),
        }
    }

    #[tokio::test]
    async fn test_open_catalog_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().join("missing.jsonl").display());

        let result = open_catalog(&uri, FieldProjection::default(), &CollectionName::default()).await;
        assert!(matches!(result, Err(CatalogError::Fatal { .. })));
    }
}
