//! MongoDB catalog source.
//!
//! Runs one `find` over the configured collection, projecting only the
//! identifier and locator fields, and streams the cursor. A document that
//! cannot be decoded or lacks a string field is an item error. Cursor and
//! transport failures are fatal.

use futures::future::BoxFuture;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Cursor};
use tracing::debug;

use super::types::{CatalogError, CollectionName, FieldProjection, Record};
use super::CatalogSource;

/// URI scheme accepted for MongoDB catalogs.
pub const MONGODB_SCHEME: &str = "mongodb://";

/// URI scheme for DNS seed-list connection strings.
pub const MONGODB_SRV_SCHEME: &str = "mongodb+srv://";

/// Catalog backed by a MongoDB collection.
pub struct MongoCatalog {
    cursor: Cursor<Document>,
    namespace: String,
    projection: FieldProjection,
    /// 1-based index of the last document read
    position: u64,
    finished: bool,
}

impl MongoCatalog {
    /// Connects to `uri` and opens a cursor over `collection`.
    ///
    /// Fails fatally if the connection string is invalid or the query cannot
    /// be started (unreachable server, authentication, missing privileges).
    pub async fn open(
        uri: &str,
        collection: &CollectionName,
        projection: FieldProjection,
    ) -> Result<Self, CatalogError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| CatalogError::fatal(format!("invalid MongoDB URI: {}", e)))?;

        let namespace = format!("{}.{}", collection.database, collection.collection);
        let cursor = client
            .database(&collection.database)
            .collection::<Document>(&collection.collection)
            .find(doc! {})
            .projection(projection_document(&projection))
            .await
            .map_err(|e| CatalogError::fatal(format!("find on {} failed: {}", namespace, e)))?;

        debug!(namespace = %namespace, "Opened MongoDB catalog");

        Ok(Self {
            cursor,
            namespace,
            projection,
            position: 0,
            finished: false,
        })
    }

    async fn read_next(&mut self) -> Option<Result<Record, CatalogError>> {
        if self.finished {
            return None;
        }

        match self.cursor.advance().await {
            Ok(true) => {}
            Ok(false) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(CatalogError::fatal(format!(
                    "cursor on {} failed after document {}: {}",
                    self.namespace, self.position, e
                ))));
            }
        }
        self.position += 1;

        let document = match self.cursor.deserialize_current() {
            Ok(document) => document,
            Err(e) => {
                return Some(Err(CatalogError::item(
                    self.position,
                    format!("undecodable document: {}", e),
                )))
            }
        };

        Some(project_document(&document, self.position, &self.projection))
    }
}

impl CatalogSource for MongoCatalog {
    fn next_record(&mut self) -> BoxFuture<'_, Option<Result<Record, CatalogError>>> {
        Box::pin(self.read_next())
    }

    fn describe(&self) -> String {
        format!("mongodb:{}", self.namespace)
    }
}

/// Returns true if `uri` is a MongoDB connection string.
pub fn is_mongodb_uri(uri: &str) -> bool {
    uri.starts_with(MONGODB_SCHEME) || uri.starts_with(MONGODB_SRV_SCHEME)
}

/// `{ <identifier_field>: 1, <locator_field>: 1 }`
fn projection_document(projection: &FieldProjection) -> Document {
    let mut fields = Document::new();
    fields.insert(projection.identifier_field.as_str(), 1);
    fields.insert(projection.locator_field.as_str(), 1);
    fields
}

fn project_document(
    document: &Document,
    position: u64,
    projection: &FieldProjection,
) -> Result<Record, CatalogError> {
    let identifier = string_field(document, &projection.identifier_field, position)?;
    let locator = string_field(document, &projection.locator_field, position)?;
    Ok(Record::new(identifier, locator))
}

fn string_field<'a>(document: &'a Document, field: &str, position: u64) -> Result<&'a str, CatalogError> {
    match document.get(field) {
        Some(Bson::String(s)) => Ok(s.as_str()),
        Some(other) => Err(CatalogError::item(
            position,
            format!("field '{}' is not a string: {}", field, other),
        )),
        None => Err(CatalogError::item(
            position,
            format!("missing field '{}'", field),
        )),
    }
}
