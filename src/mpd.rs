//! Logical→physical conversion: dialect-specific column types and
//! automatic index synthesis.

use crate::heuristics;
use crate::mld::LogicalSchema;

/// Target DBMS. Always chosen explicitly by the caller; never detected
/// from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    PostgreSql,
    Sqlite,
}

#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    #[error("unknown dialect '{0}' (expected mysql, postgresql or sqlite)")]
    Unknown(String),
}

impl Dialect {
    pub fn parse(s: &str) -> Result<Self, DialectError> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::PostgreSql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(DialectError::Unknown(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Column type replacing a generic auto-increment INTEGER.
    pub fn auto_increment_type(&self) -> &'static str {
        match self {
            Self::MySql => "INT AUTO_INCREMENT",
            Self::PostgreSql => "SERIAL",
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub kind: &'static str,
}

/// Logical schema specialized to one dialect, with synthesized indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSchema {
    pub dialect: Dialect,
    pub schema: LogicalSchema,
    pub indexes: Vec<Index>,
}

/// Specialize a logical schema to one dialect. Auto-increment columns get
/// the dialect's type; every FK column and every commonly-searched column
/// gets an index.
pub fn to_physical(logical: &LogicalSchema, dialect: Dialect) -> PhysicalSchema {
    let mut schema = logical.clone();

    for table in &mut schema.tables {
        for column in &mut table.columns {
            if column.auto_increment {
                column.sql_type = dialect.auto_increment_type().to_string();
            }
        }
    }

    let mut indexes: Vec<Index> = Vec::new();
    let push = |indexes: &mut Vec<Index>, table: &str, column: &str| {
        let name = format!("idx_{table}_{column}");
        if !indexes.iter().any(|i| i.name == name) {
            indexes.push(Index {
                name,
                table: table.to_string(),
                columns: vec![column.to_string()],
                kind: "BTREE",
            });
        }
    };

    for fk in &schema.foreign_keys {
        push(&mut indexes, &fk.table, &fk.column);
    }
    for table in &schema.tables {
        for column in &table.columns {
            if heuristics::is_searched_column(&column.name) {
                push(&mut indexes, &table.name, &column.name);
            }
        }
    }

    PhysicalSchema {
        dialect,
        schema,
        indexes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::to_logical;
    use crate::markdown;

    const SHOP: &str = r#"
## Client
- nom (varchar) : nom du client
- email (varchar) : adresse email

## Commande
- date_commande (date)
- montant (decimal)

### Client <-> Commande : Passe
Client : 1,1
Commande : 0,n
"#;

    fn physical(dialect: Dialect) -> PhysicalSchema {
        let logical = to_logical(&markdown::parse(SHOP).schema).unwrap();
        to_physical(&logical, dialect)
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("MySQL").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::parse("postgres").unwrap(), Dialect::PostgreSql);
        assert!(Dialect::parse("oracle").is_err());
    }

    #[test]
    fn test_auto_increment_rewrite() {
        let mysql = physical(Dialect::MySql);
        let id = mysql.schema.table("client").unwrap().column("id").unwrap();
        assert_eq!(id.sql_type, "INT AUTO_INCREMENT");

        let postgres = physical(Dialect::PostgreSql);
        let id = postgres.schema.table("client").unwrap().column("id").unwrap();
        assert_eq!(id.sql_type, "SERIAL");

        let sqlite = physical(Dialect::Sqlite);
        let id = sqlite.schema.table("client").unwrap().column("id").unwrap();
        assert_eq!(id.sql_type, "INTEGER PRIMARY KEY AUTOINCREMENT");
    }

    #[test]
    fn test_fk_and_searched_columns_get_indexes() {
        let physical = physical(Dialect::MySql);
        let names: Vec<&str> = physical.indexes.iter().map(|i| i.name.as_str()).collect();

        assert!(names.contains(&"idx_commande_client_id"));
        assert!(names.contains(&"idx_client_nom"));
        assert!(names.contains(&"idx_client_email"));
    }

    #[test]
    fn test_indexes_deduplicated() {
        let physical = physical(Dialect::MySql);
        let mut names: Vec<&str> = physical.indexes.iter().map(|i| i.name.as_str()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_original_schema_untouched() {
        let logical = to_logical(&markdown::parse(SHOP).schema).unwrap();
        let _ = to_physical(&logical, Dialect::PostgreSql);
        let id = logical.table("client").unwrap().column("id").unwrap();
        assert_eq!(id.sql_type, "INTEGER");
    }
}
