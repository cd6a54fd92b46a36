//! Logical model (MLD) value types: tables, columns, keys, constraints.

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub auto_increment: bool,
    pub default: Option<String>,
}

impl Column {
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            auto_increment: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Lowercased entity name.
    pub name: String,
    pub columns: Vec<Column>,
    /// Never empty once conversion is done: a key is synthesized when the
    /// conceptual entity offers no candidate.
    pub primary_key: Vec<String>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// `fk_{source}_{target}`.
    pub constraint_name: String,
}

impl ForeignKey {
    pub fn new(table: &str, column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            constraint_name: format!("fk_{table}_{referenced_table}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub table: String,
    pub columns: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub table: String,
    pub expression: String,
    pub name: Option<String>,
}

/// Relational schema produced by the conceptual→logical conversion.
/// Tables keep entity insertion order; every foreign key references
/// tables present in `tables`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogicalSchema {
    pub tables: Vec<Table>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub check_constraints: Vec<CheckConstraint>,
}

impl LogicalSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Foreign keys owned by one table, in declaration order.
    pub fn foreign_keys_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ForeignKey> {
        self.foreign_keys.iter().filter(move |fk| fk.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fk_constraint_name() {
        let fk = ForeignKey::new("commande", "client_id", "client", "id");
        assert_eq!(fk.constraint_name, "fk_commande_client");
    }

    #[test]
    fn test_table_lookup() {
        let mut schema = LogicalSchema::default();
        schema.tables.push(Table::new("client"));
        assert!(schema.table("client").is_some());
        assert!(schema.table("commande").is_none());
    }
}
