//! Schema resolution: live table columns joined with declared field names.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use tl_common::{keys, Column, StoreError, TableDescriber};
use tl_config::ColumnDeclarations;
use tracing::{debug, info};

use crate::logging::event_names;

/// Errors from schema resolution.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to describe table `{table}`: {source}")]
    Describe {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("no column `{column}` in table (declared for field `{field}`)")]
    MissingColumn { column: String, field: String },

    #[error("no required column '{0}'")]
    MissingReservedKey(String),

    #[error("describe of table `{table}` exceeded {timeout_ms}ms")]
    Timeout { table: String, timeout_ms: u64 },
}

impl From<SchemaError> for tl_common::Error {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::MissingReservedKey(key) => tl_common::Error::MissingRequiredKey(key),
            other => tl_common::Error::Schema(other.to_string()),
        }
    }
}

/// Resolved field key to column mapping.
///
/// The two required reserved columns are held outside the general map so
/// a mapping without them cannot be constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    timestamp: Column,
    input: Column,
    others: Option<Column>,
    hash: Option<Column>,
    fields: BTreeMap<String, Column>,
}

impl FieldMapping {
    /// Build a mapping from `field key -> column`, splitting out reserved keys.
    pub fn new(mut entries: BTreeMap<String, Column>) -> Result<Self, SchemaError> {
        let timestamp = entries
            .remove(keys::TIMESTAMP)
            .ok_or_else(|| SchemaError::MissingReservedKey(keys::TIMESTAMP.to_string()))?;
        let input = entries
            .remove(keys::INPUT)
            .ok_or_else(|| SchemaError::MissingReservedKey(keys::INPUT.to_string()))?;
        let others = entries.remove(keys::OTHERS);
        let hash = entries.remove(keys::HASH);

        // Unknown reserved keys never reach the mapping.
        entries.retain(|key, _| !keys::is_reserved(key));

        Ok(FieldMapping {
            timestamp,
            input,
            others,
            hash,
            fields: entries,
        })
    }

    pub fn timestamp(&self) -> &Column {
        &self.timestamp
    }

    pub fn input(&self) -> &Column {
        &self.input
    }

    /// Overflow column, when configured.
    pub fn others(&self) -> Option<&Column> {
        self.others.as_ref()
    }

    /// Content hash column, when configured.
    pub fn hash(&self) -> Option<&Column> {
        self.hash.as_ref()
    }

    /// Column for a message field. Reserved keys never match.
    pub fn field(&self, name: &str) -> Option<&Column> {
        if keys::is_reserved(name) {
            return None;
        }
        self.fields.get(name)
    }

    /// Non-reserved `(field, column)` pairs in field order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.fields.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Look up any key, reserved or not.
    pub fn get(&self, key: &str) -> Option<&Column> {
        match key {
            keys::TIMESTAMP => Some(&self.timestamp),
            keys::INPUT => Some(&self.input),
            keys::OTHERS => self.others.as_ref(),
            keys::HASH => self.hash.as_ref(),
            _ => self.fields.get(key),
        }
    }

    /// Number of columns every row built from this mapping carries.
    pub fn column_count(&self) -> usize {
        2 + self.fields.len() + usize::from(self.others.is_some()) + usize::from(self.hash.is_some())
    }

    /// Names of every mapped column, in row order.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![self.timestamp.name.as_str(), self.input.name.as_str()];
        names.extend(self.fields.values().map(|c| c.name.as_str()));
        names.extend(self.others.iter().map(|c| c.name.as_str()));
        names.extend(self.hash.iter().map(|c| c.name.as_str()));
        names
    }
}

/// Resolve declared field names against the live schema of `table`.
pub fn resolve<D>(
    store: &D,
    table: &str,
    declarations: &ColumnDeclarations,
    timeout: Duration,
) -> Result<FieldMapping, SchemaError>
where
    D: TableDescriber + ?Sized,
{
    let started = Instant::now();
    let live = store
        .describe_table(table, timeout)
        .map_err(|source| match source {
            StoreError::Timeout { table, timeout_ms } => SchemaError::Timeout { table, timeout_ms },
            source => SchemaError::Describe {
                table: table.to_string(),
                source,
            },
        })?;

    if started.elapsed() > timeout {
        return Err(SchemaError::Timeout {
            table: table.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        });
    }

    debug!(
        target: event_names::SCHEMA_DESCRIBED,
        table,
        columns = live.len(),
        "table described"
    );

    let mut entries = BTreeMap::new();
    for (field, column_name) in declarations.iter() {
        let column = live
            .iter()
            .find(|c| c.name == column_name)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: column_name.to_string(),
                field: field.to_string(),
            })?;
        entries.insert(field.to_string(), column.clone());
    }

    let mapping = FieldMapping::new(entries)?;
    info!(
        target: event_names::SCHEMA_RESOLVED,
        table,
        columns = mapping.column_count(),
        "field mapping resolved"
    );
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tl_common::LogicalType;

    fn live_columns() -> Vec<Column> {
        vec![
            Column::new("ts", LogicalType::Timestamp, false),
            Column::new("tag", LogicalType::Text, false),
            Column::new("msg", LogicalType::Text, true),
            Column::new("rest", LogicalType::Json, true),
        ]
    }

    fn declarations(json: &str) -> ColumnDeclarations {
        ColumnDeclarations::parse(json).unwrap()
    }

    #[test]
    fn test_resolve_maps_declared_fields() {
        let store = MemoryStore::new().with_table("logs", live_columns());
        let mapping = resolve(
            &store,
            "logs",
            &declarations(r#"{".timestamp":"ts",".input":"tag","log":"msg",".others":"rest"}"#),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(mapping.timestamp().name, "ts");
        assert_eq!(mapping.input().logical_type, LogicalType::Text);
        assert_eq!(mapping.field("log").unwrap().name, "msg");
        assert_eq!(mapping.others().unwrap().name, "rest");
        assert!(mapping.hash().is_none());
        assert_eq!(mapping.column_count(), 4);
        assert_eq!(mapping.column_names(), vec!["ts", "tag", "msg", "rest"]);
    }

    #[test]
    fn test_resolve_missing_column() {
        let store = MemoryStore::new().with_table("logs", live_columns());
        let err = resolve(
            &store,
            "logs",
            &declarations(r#"{".timestamp":"ts",".input":"tag","host":"hostname"}"#),
            Duration::from_secs(5),
        )
        .unwrap_err();
        match err {
            SchemaError::MissingColumn { column, field } => {
                assert_eq!(column, "hostname");
                assert_eq!(field, "host");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_unknown_table() {
        let store = MemoryStore::new();
        let err = resolve(
            &store,
            "logs",
            &declarations(r#"{".timestamp":"ts",".input":"tag"}"#),
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Describe { .. }));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = MemoryStore::new().with_table("logs", live_columns());
        let decl = declarations(r#"{".timestamp":"ts",".input":"tag","log":"msg"}"#);
        let first = resolve(&store, "logs", &decl, Duration::from_secs(5)).unwrap();
        let second = resolve(&store, "logs", &decl, Duration::from_secs(5)).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.describe_calls(), 2);
    }

    #[test]
    fn test_resolve_slow_describe_times_out() {
        let store = MemoryStore::new()
            .with_table("logs", live_columns())
            .with_describe_delay(Duration::from_millis(30));
        let err = resolve(
            &store,
            "logs",
            &declarations(r#"{".timestamp":"ts",".input":"tag"}"#),
            Duration::from_millis(5),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Timeout { .. }));
    }

    #[test]
    fn test_mapping_requires_reserved_keys() {
        let mut entries = BTreeMap::new();
        entries.insert(
            keys::TIMESTAMP.to_string(),
            Column::new("ts", LogicalType::Timestamp, false),
        );
        let err = FieldMapping::new(entries).unwrap_err();
        assert!(matches!(err, SchemaError::MissingReservedKey(ref k) if k == ".input"));
    }

    #[test]
    fn test_reserved_keys_never_match_fields() {
        let store = MemoryStore::new().with_table("logs", live_columns());
        let mapping = resolve(
            &store,
            "logs",
            &declarations(r#"{".timestamp":"ts",".input":"tag"}"#),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(mapping.field(".timestamp").is_none());
        assert_eq!(mapping.get(".timestamp").unwrap().name, "ts");
    }
}
