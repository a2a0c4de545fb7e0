mod versioned_schema;

pub use versioned_schema::{
    open_versioned, Column, ForeignKey, ForeignKeyOnChange, PartialUniqueIndex, SqlType, Table,
    VersionedSchema,
    BASE_DB_VERSION, DEFAULT_TIMESTAMP_MS,
};
