use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};

/// Default expression for timestamp columns, in unix milliseconds.
pub const DEFAULT_TIMESTAMP_MS: &str = "(cast(unixepoch('subsec') * 1000 as int))";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
                generated_as: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn parse(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    SetNull,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::SetNull => "SET NULL",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a> {
    pub name: &'a str,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'a str>,
    pub foreign_key: Option<&'a ForeignKey>,
    /// Expression for a `GENERATED ALWAYS AS (...) VIRTUAL` column.
    pub generated_as: Option<&'a str>,
}

impl Column<'_> {
    fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.as_sql());
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.non_null {
            sql.push_str(" NOT NULL");
        }
        if self.is_unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default_value) = self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default_value));
        }
        if let Some(expr) = self.generated_as {
            sql.push_str(&format!(" GENERATED ALWAYS AS ({}) VIRTUAL", expr));
        }
        if let Some(fk) = self.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                fk.foreign_table,
                fk.foreign_column,
                fk.on_delete.as_sql()
            ));
        }
        sql
    }
}

/// `CREATE UNIQUE INDEX name ON table(columns) WHERE predicate`. Uniqueness
/// only binds the rows matching `predicate`.
pub struct PartialUniqueIndex {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub predicate: &'static str,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
    pub partial_unique_indices: &'static [PartialUniqueIndex],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut parts: Vec<String> = self.columns.iter().map(Column::definition).collect();
        for unique_constraint in self.unique_constraints {
            parts.push(format!("UNIQUE ({})", unique_constraint.join(", ")));
        }
        let create_sql = format!("CREATE TABLE {} ({});", self.name, parts.join(", "));
        conn.execute(&create_sql, params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;

        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, columns),
                params![],
            )?;
        }
        for index in self.partial_unique_indices {
            conn.execute(
                &format!(
                    "CREATE UNIQUE INDEX {} ON {}({}) WHERE {};",
                    index.name,
                    self.name,
                    index.columns.join(", "),
                    index.predicate
                ),
                params![],
            )
            .with_context(|| format!("Failed to create index {}", index.name))?;
        }
        Ok(())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|c| c.name)
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        struct ActualColumn {
            name: String,
            sql_type: String,
            non_null: bool,
            is_primary_key: bool,
            generated: bool,
        }

        // table_xinfo also lists generated columns (hidden = 2 or 3)
        let mut stmt = conn.prepare(&format!("PRAGMA table_xinfo({});", self.name))?;
        let actual: Vec<ActualColumn> = stmt
            .query_map([], |row| {
                let hidden: i32 = row.get(6)?;
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                    generated: hidden == 2 || hidden == 3,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        if actual.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: {}, expected: {}",
                self.name,
                actual.len(),
                self.columns.len(),
                actual
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.column_names().collect::<Vec<_>>().join(", ")
            );
        }

        for (actual, expected) in actual.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            // Generated columns report their declared type with a trailing
            // "GENERATED ALWAYS" on some SQLite versions, compare the head only.
            let declared = actual.sql_type.split_whitespace().next().unwrap_or("");
            if SqlType::parse(declared) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
            if actual.generated != expected.generated_as.is_some() {
                bail!(
                    "Table {} column {} generated mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.generated_as.is_some(),
                    actual.generated
                );
            }
        }

        for (index_name, _columns) in self.indices {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        let mut unique_column_sets: Vec<Vec<String>> = Vec::new();
        let mut list_stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        // (name, unique, partial)
        let index_list: Vec<(String, i32, i32)> = list_stmt
            .query_map([], |row| Ok((row.get(1)?, row.get(2)?, row.get(4)?)))?
            .filter_map(|r| r.ok())
            .collect();
        for expected in self.partial_unique_indices {
            let found = index_list
                .iter()
                .any(|(name, unique, partial)| name == expected.name && *unique == 1 && *partial == 1);
            if !found {
                bail!(
                    "Table {} is missing partial unique index '{}'",
                    self.name,
                    expected.name
                );
            }
        }
        let unique_indices: Vec<String> = index_list
            .into_iter()
            .filter(|(_, unique, partial)| *unique == 1 && *partial == 0)
            .map(|(name, _, _)| name)
            .collect();
        for index_name in &unique_indices {
            let mut info_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut cols: Vec<String> = info_stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            cols.sort();
            unique_column_sets.push(cols);
        }
        for expected in self.unique_constraints {
            let mut expected_sorted: Vec<&str> = expected.to_vec();
            expected_sorted.sort();
            let found = unique_column_sets
                .iter()
                .any(|cols| cols.iter().map(String::as_str).eq(expected_sorted.iter().copied()));
            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    self.name,
                    expected.join(", ")
                );
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

pub const BASE_DB_VERSION: usize = 77000;

/// Opens (or creates) a database and brings it to the latest of `schemas`.
///
/// Fresh databases are created at the latest version. Existing ones are
/// validated against their recorded version and migrated forward in a
/// single transaction.
pub fn open_versioned(
    conn: &mut Connection,
    schemas: &'static [VersionedSchema],
    label: &str,
) -> Result<()> {
    let latest = schemas
        .last()
        .with_context(|| format!("No schema versions declared for {} database", label))?;

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        tracing::info!(
            "Creating {} database schema at version {}",
            label,
            latest.version
        );
        return latest.create(conn);
    }

    let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |r| r.get(0))?;
    let db_version = raw_version - BASE_DB_VERSION as i64;
    let current = schemas
        .iter()
        .position(|s| s.version as i64 == db_version)
        .with_context(|| format!("Unknown {} database version {}", label, db_version))?;
    schemas[current]
        .validate(conn)
        .with_context(|| format!("{} database schema validation failed", label))?;

    if current + 1 == schemas.len() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let mut reached = schemas[current].version;
    for schema in &schemas[current + 1..] {
        tracing::info!(
            "Migrating {} database from version {} to {}",
            label,
            reached,
            schema.version
        );
        if let Some(migration_fn) = schema.migration {
            migration_fn(&tx)
                .with_context(|| format!("Failed to migrate to version {}", schema.version))?;
        }
        reached = schema.version;
    }
    tx.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + reached),
        [],
    )?;
    tx.commit()?;
    Ok(())
}
