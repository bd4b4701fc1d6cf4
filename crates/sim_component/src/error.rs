//! Error types for component storage and signature declarations.

/// Errors raised by type-erased component storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A record was routed to a table of a different component type. Only
    /// possible when two component types report the same type name.
    #[error("table for `{expected}` cannot store a `{found}` record")]
    TypeMismatch {
        /// The table's component type.
        expected: &'static str,
        /// The record's component type.
        found: &'static str,
    },
}

/// Errors raised when a signature declaration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The same component type appears twice in one signature.
    #[error("component `{field}` is declared more than once")]
    DuplicateField {
        /// Name of the repeated component type.
        field: &'static str,
    },
}
