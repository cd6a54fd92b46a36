//! SQL DDL generation from a physical schema.
//!
//! Statement order is fixed: every `CREATE TABLE` first (so foreign keys
//! never reference a table that does not exist yet), then foreign keys,
//! then indexes, then unique and check constraints.

use crate::mld::{CheckConstraint, Column, ForeignKey, Table, UniqueConstraint};
use crate::mpd::{Dialect, Index, PhysicalSchema};

/// Render a physical schema as executable SQL DDL.
pub fn to_sql(physical: &PhysicalSchema) -> String {
    let mut output = String::new();

    for table in &physical.schema.tables {
        write_create_table(&mut output, table, physical.dialect);
        output.push('\n');
    }
    for fk in &physical.schema.foreign_keys {
        write_foreign_key(&mut output, fk);
    }
    if !physical.schema.foreign_keys.is_empty() {
        output.push('\n');
    }
    for index in &physical.indexes {
        write_index(&mut output, index);
    }
    if !physical.indexes.is_empty() {
        output.push('\n');
    }
    for unique in &physical.schema.unique_constraints {
        write_unique(&mut output, unique);
    }
    for check in &physical.schema.check_constraints {
        write_check(&mut output, check);
    }

    output
}

fn write_create_table(output: &mut String, table: &Table, dialect: Dialect) {
    output.push_str(&format!("CREATE TABLE {} (\n", table.name));

    let mut lines: Vec<String> = table.columns.iter().map(column_definition).collect();
    if needs_pk_clause(table, dialect) {
        lines.push(format!("    PRIMARY KEY ({})", table.primary_key.join(", ")));
    }
    output.push_str(&lines.join(",\n"));
    output.push('\n');

    match dialect {
        Dialect::MySql => output.push_str(
            ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;\n",
        ),
        _ => output.push_str(");\n"),
    }
}

/// SQLite embeds the key in `INTEGER PRIMARY KEY AUTOINCREMENT`; adding a
/// table-level clause on top would be rejected.
fn needs_pk_clause(table: &Table, dialect: Dialect) -> bool {
    if table.primary_key.is_empty() {
        return false;
    }
    if dialect == Dialect::Sqlite && table.primary_key.len() == 1 {
        let embedded = table
            .column(&table.primary_key[0])
            .map(|c| c.sql_type.contains("PRIMARY KEY"))
            .unwrap_or(false);
        if embedded {
            return false;
        }
    }
    true
}

fn column_definition(column: &Column) -> String {
    let mut definition = format!("    {} {}", column.name, column.sql_type);
    if !column.nullable {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        definition.push_str(" DEFAULT ");
        definition.push_str(&quote_default(default));
    }
    definition
}

fn quote_default(value: &str) -> String {
    let keyword = matches!(
        value.to_uppercase().as_str(),
        "NULL" | "TRUE" | "FALSE" | "CURRENT_TIMESTAMP" | "CURRENT_DATE"
    );
    if keyword || value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{value}'")
    }
}

fn write_foreign_key(output: &mut String, fk: &ForeignKey) {
    output.push_str(&format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});\n",
        fk.table, fk.constraint_name, fk.column, fk.referenced_table, fk.referenced_column
    ));
}

fn write_index(output: &mut String, index: &Index) {
    output.push_str(&format!(
        "CREATE INDEX {} ON {} ({});\n",
        index.name,
        index.table,
        index.columns.join(", ")
    ));
}

fn write_unique(output: &mut String, unique: &UniqueConstraint) {
    let name = unique
        .name
        .clone()
        .unwrap_or_else(|| format!("uq_{}_{}", unique.table, unique.columns.join("_")));
    output.push_str(&format!(
        "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({});\n",
        unique.table,
        name,
        unique.columns.join(", ")
    ));
}

fn write_check(output: &mut String, check: &CheckConstraint) {
    let name = check
        .name
        .clone()
        .unwrap_or_else(|| format!("ck_{}", check.table));
    output.push_str(&format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({});\n",
        check.table, name, check.expression
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::to_logical;
    use crate::markdown;
    use crate::mpd::to_physical;

    const SHOP: &str = r#"
## Client
- nom (varchar) : nom du client

## Commande
- date_commande (date)
- montant (decimal)

### Client <-> Commande : Passe
Client : 1,1
Commande : 0,n
"#;

    fn generate(dialect: Dialect) -> String {
        let logical = to_logical(&markdown::parse(SHOP).schema).unwrap();
        to_sql(&to_physical(&logical, dialect))
    }

    #[test]
    fn test_mysql_rendering() {
        let sql = generate(Dialect::MySql);

        assert!(sql.contains("CREATE TABLE client ("));
        assert!(sql.contains("    id INT AUTO_INCREMENT NOT NULL"));
        assert!(sql.contains("    PRIMARY KEY (id)"));
        assert!(sql.contains(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;"));
    }

    #[test]
    fn test_sqlite_embeds_primary_key() {
        let sql = generate(Dialect::Sqlite);

        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        // No redundant table-level clause for the embedded key.
        let client_block = sql.split("CREATE TABLE commande").next().unwrap();
        assert!(!client_block.contains("PRIMARY KEY (id)"));
    }

    #[test]
    fn test_foreign_keys_come_after_all_tables() {
        let sql = generate(Dialect::PostgreSql);
        let last_create = sql.rfind("CREATE TABLE").unwrap();
        let first_fk = sql.find("ADD CONSTRAINT fk_").unwrap();
        assert!(last_create < first_fk);
        assert!(sql.contains(
            "ALTER TABLE commande ADD CONSTRAINT fk_commande_client FOREIGN KEY (client_id) REFERENCES client (id);"
        ));
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        assert_eq!(generate(Dialect::MySql), generate(Dialect::MySql));
        assert_eq!(generate(Dialect::Sqlite), generate(Dialect::Sqlite));
    }

    #[test]
    fn test_default_quoting() {
        assert_eq!(quote_default("0"), "0");
        assert_eq!(quote_default("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
        assert_eq!(quote_default("draft"), "'draft'");
    }

    #[test]
    fn test_indexes_rendered() {
        let sql = generate(Dialect::PostgreSql);
        assert!(sql.contains("CREATE INDEX idx_commande_client_id ON commande (client_id);"));
        assert!(sql.contains("CREATE INDEX idx_client_nom ON client (nom);"));
    }
}
