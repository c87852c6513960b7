//! Catalog record and error types.

use thiserror::Error;

/// Default document field holding the record identifier.
pub const DEFAULT_IDENTIFIER_FIELD: &str = "podlistUrl";

/// Default document field holding the image locator.
pub const DEFAULT_LOCATOR_FIELD: &str = "image";

/// Default MongoDB database holding the catalog.
pub const DEFAULT_DATABASE: &str = "podgo";

/// Default MongoDB collection holding the catalog.
pub const DEFAULT_COLLECTION: &str = "podcasts";

/// One catalog entry: an output filename stem and the image to fetch.
///
/// The identifier is used verbatim as the output file stem. Uniqueness and
/// filesystem safety are preconditions supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    identifier: String,
    image_locator: String,
}

impl Record {
    /// Creates a record from its two projected fields.
    pub fn new(identifier: impl Into<String>, image_locator: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            image_locator: image_locator.into(),
        }
    }

    /// The output filename stem.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The remote image URL.
    pub fn image_locator(&self) -> &str {
        &self.image_locator
    }

    /// Output file name (`<identifier>.jpg`).
    pub fn output_file_name(&self) -> String {
        format!("{}.jpg", self.identifier)
    }
}

/// Which document fields map onto a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjection {
    /// Field holding the identifier.
    pub identifier_field: String,
    /// Field holding the image locator.
    pub locator_field: String,
}

impl FieldProjection {
    /// Creates a projection from explicit field names.
    pub fn new(identifier_field: impl Into<String>, locator_field: impl Into<String>) -> Self {
        Self {
            identifier_field: identifier_field.into(),
            locator_field: locator_field.into(),
        }
    }
}

impl Default for FieldProjection {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTIFIER_FIELD, DEFAULT_LOCATOR_FIELD)
    }
}

/// Database and collection a MongoDB catalog is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName {
    pub database: String,
    pub collection: String,
}

impl CollectionName {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl Default for CollectionName {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE, DEFAULT_COLLECTION)
    }
}

/// Errors raised by a catalog source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A single record could not be read. The dispatcher skips it.
    #[error("catalog item {position} unreadable: {reason}")]
    Item { position: u64, reason: String },

    /// The source itself failed. No further records will be produced.
    #[error("catalog failed: {reason}")]
    Fatal { reason: String },
}

impl CatalogError {
    /// Shorthand for an item-level error.
    pub fn item(position: u64, reason: impl Into<String>) -> Self {
        CatalogError::Item {
            position,
            reason: reason.into(),
        }
    }

    /// Shorthand for a fatal source error.
    pub fn fatal(reason: impl Into<String>) -> Self {
        CatalogError::Fatal {
            reason: reason.into(),
        }
    }

    /// Returns true if this error ends the record sequence.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Fatal { .. })
    }
}
