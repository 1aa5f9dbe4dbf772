//! Request types for the completion API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{CaseSensitivity, NormalizationStrategy};

/// A request for completion suggestions at a cursor position.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// The SQL text being edited (UTF-8 string)
    pub sql: String,

    /// SQL dialect
    #[serde(default)]
    pub dialect: Dialect,

    /// Cursor position as a character index into the SQL string. Out-of-range
    /// positions are clamped to the end.
    pub cursor_offset: usize,

    /// Tables and their columns available for completion
    #[serde(default)]
    pub schema: Schema,

    /// Optional completion behavior overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CompletionOptions>,
}

impl CompletionRequest {
    pub fn new(sql: impl Into<String>, cursor_offset: usize, schema: Schema) -> Self {
        Self {
            sql: sql.into(),
            dialect: Dialect::default(),
            cursor_offset,
            schema,
            options: None,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// SQL dialect used for tokenization and identifier folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    Ansi,
    Bigquery,
    Clickhouse,
    Databricks,
    Duckdb,
    Hive,
    Mssql,
    Mysql,
    Postgres,
    Redshift,
    Snowflake,
    Sqlite,
}

impl Dialect {
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{
            AnsiDialect, BigQueryDialect, ClickHouseDialect, DatabricksDialect, DuckDbDialect,
            GenericDialect, HiveDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
            RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
        };
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::Ansi => Box::new(AnsiDialect {}),
            Self::Bigquery => Box::new(BigQueryDialect {}),
            Self::Clickhouse => Box::new(ClickHouseDialect {}),
            Self::Databricks => Box::new(DatabricksDialect {}),
            Self::Duckdb => Box::new(DuckDbDialect {}),
            Self::Hive => Box::new(HiveDialect {}),
            Self::Mssql => Box::new(MsSqlDialect {}),
            Self::Mysql => Box::new(MySqlDialect {}),
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Redshift => Box::new(RedshiftSqlDialect {}),
            Self::Snowflake => Box::new(SnowflakeDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
        }
    }

    /// Default folding for unquoted identifiers.
    ///
    /// Case-insensitive dialects fold to lowercase for comparison.
    pub fn normalization_strategy(&self) -> NormalizationStrategy {
        match self {
            Self::Snowflake => NormalizationStrategy::Uppercase,
            Self::Bigquery => NormalizationStrategy::CaseSensitive,
            _ => NormalizationStrategy::Lowercase,
        }
    }
}

/// Options controlling which suggestions are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    /// Override for identifier matching (default 'dialect')
    #[serde(default)]
    pub case_sensitivity: CaseSensitivity,

    /// Offer table names and aliases in scope alongside column suggestions (default: true)
    #[serde(default = "default_true")]
    pub qualifier_suggestions: bool,

    /// When true, an aliased table can only be referenced through its alias (default: false)
    #[serde(default)]
    pub alias_shadows_table: bool,

    /// Offer schema tables when no table in scope resolves (default: true)
    #[serde(default = "default_true")]
    pub schema_fallback: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            case_sensitivity: CaseSensitivity::default(),
            qualifier_suggestions: true,
            alias_shadows_table: false,
            schema_fallback: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Tables available for completion, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<SchemaTable>,
}

/// A table and its ordered column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaTable {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl SchemaTable {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Finds a table by name under the given folding strategy.
    ///
    /// Quoted references (`quoted == true`) must match exactly. A dotted name
    /// that matches no table falls back to its last segment.
    pub fn find_table(
        &self,
        name: &str,
        quoted: bool,
        strategy: NormalizationStrategy,
    ) -> Option<&SchemaTable> {
        let matches = |candidate: &str, wanted: &str| {
            if quoted {
                candidate == wanted
            } else {
                strategy.apply(candidate) == strategy.apply(wanted)
            }
        };

        self.tables
            .iter()
            .find(|table| matches(&table.name, name))
            .or_else(|| {
                let (_, last) = name.rsplit_once('.')?;
                self.tables.iter().find(|table| matches(&table.name, last))
            })
    }
}

impl<K, C, S> FromIterator<(K, C)> for Schema
where
    K: Into<String>,
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, C)>>(iter: T) -> Self {
        Self {
            tables: iter
                .into_iter()
                .map(|(name, columns)| SchemaTable::new(name, columns))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_iter([
            ("users", vec!["id", "name", "email"]),
            ("Documents", vec!["id", "content"]),
        ])
    }

    #[test]
    fn from_iter_preserves_order() {
        let names: Vec<_> = schema().tables.iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["users", "Documents"]);
    }

    #[test]
    fn find_table_folds_unquoted_names() {
        let schema = schema();
        let strategy = NormalizationStrategy::Lowercase;
        assert_eq!(
            schema.find_table("USERS", false, strategy).map(|t| t.name.as_str()),
            Some("users")
        );
        assert_eq!(
            schema.find_table("documents", false, strategy).map(|t| t.name.as_str()),
            Some("Documents")
        );
        assert!(schema.find_table("documents", true, strategy).is_none());
    }

    #[test]
    fn find_table_falls_back_to_last_segment() {
        let schema = schema();
        let table = schema.find_table("public.users", false, NormalizationStrategy::Lowercase);
        assert_eq!(table.map(|t| t.name.as_str()), Some("users"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CompletionOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, CompletionOptions::default());

        let options: CompletionOptions =
            serde_json::from_str(r#"{"aliasShadowsTable": true, "caseSensitivity": "exact"}"#)
                .unwrap();
        assert!(options.alias_shadows_table);
        assert!(options.qualifier_suggestions);
        assert_eq!(options.case_sensitivity, CaseSensitivity::Exact);
    }

    #[test]
    fn request_deserializes_from_camel_case_json() {
        let request: CompletionRequest = serde_json::from_str(
            r#"{
                "sql": "SELECT * FROM ",
                "cursorOffset": 14,
                "dialect": "postgres",
                "schema": {"tables": [{"name": "users", "columns": ["id"]}]}
            }"#,
        )
        .unwrap();
        assert_eq!(request.cursor_offset, 14);
        assert_eq!(request.dialect, Dialect::Postgres);
        assert_eq!(request.schema.tables[0].columns, vec!["id"]);
        assert!(request.options.is_none());
    }
}
