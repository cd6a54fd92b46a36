//! SQL schema inspector: parses `CREATE TABLE` / `CREATE INDEX` /
//! `ALTER TABLE … ADD CONSTRAINT` statements into the logical-model shape
//! and infers relationships, including implicit ones carried only by
//! column naming.

use super::lexer::{Token, tokenize};
use crate::heuristics;
use crate::mld::{Column, ForeignKey, Table, UniqueConstraint};
use crate::mpd::Index;

/// A relationship between two tables, either backed by an explicit FK
/// constraint or inferred from a reference-shaped column name.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredRelation {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    /// `"{0|1}..{1|*}"`: min from the source column's nullability, max
    /// from its uniqueness.
    pub cardinality: String,
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub table: String,
    pub column: String,
    pub kind: &'static str,
}

/// Logical-model shape recovered from DDL text.
#[derive(Debug, Clone, Default)]
pub struct InspectedSchema {
    pub tables: Vec<Table>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub indexes: Vec<Index>,
    pub relations: Vec<InferredRelation>,
    pub hierarchies: Vec<Hierarchy>,
}

impl InspectedSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_index(&self, table: &str, column: &str) -> bool {
        self.indexes
            .iter()
            .any(|i| i.table == table && i.columns.iter().any(|c| c == column))
    }

    pub fn is_unique_column(&self, table: &str, column: &str) -> bool {
        if let Some(t) = self.table(table) {
            if t.primary_key.len() == 1 && t.primary_key[0] == column {
                return true;
            }
        }
        self.unique_constraints
            .iter()
            .any(|u| u.table == table && u.columns.len() == 1 && u.columns[0] == column)
    }

    pub fn is_fk_column(&self, table: &str, column: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.table == table && fk.column == column)
    }
}

/// Analyze DDL text. Lenient by design: statements and clauses outside
/// the understood subset are skipped, never fatal.
pub fn analyze_sql(text: &str) -> InspectedSchema {
    let tokens = tokenize(text);
    let mut parser = Parser {
        tokens,
        pos: 0,
        schema: InspectedSchema::default(),
    };
    parser.parse();
    parser.infer_relations();
    parser.schema
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    schema: InspectedSchema,
}

impl Parser {
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn take_ident(&mut self) -> Option<String> {
        if let Token::Ident(name) = self.current() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    /// Table names may come as `schema.table`; only the last part counts.
    fn take_qualified_name(&mut self) -> Option<String> {
        let mut name = self.take_ident()?;
        while self.current() == &Token::Dot {
            self.advance();
            match self.take_ident() {
                Some(part) => name = part,
                None => break,
            }
        }
        Some(name)
    }

    fn parse(&mut self) {
        while self.current() != &Token::Eof {
            match self.current() {
                Token::Create => {
                    self.advance();
                    if self.current() == &Token::Unique {
                        self.advance();
                    }
                    match self.current() {
                        Token::Table => {
                            self.advance();
                            self.skip_if_not_exists();
                            self.parse_create_table();
                        }
                        Token::Index => {
                            self.advance();
                            self.skip_if_not_exists();
                            self.parse_create_index();
                        }
                        _ => self.skip_statement(),
                    }
                }
                Token::Alter => self.parse_alter_table(),
                _ => self.advance(),
            }
        }
    }

    fn skip_if_not_exists(&mut self) {
        if self.current() == &Token::If {
            self.advance();
            if self.current() == &Token::Not {
                self.advance();
            }
            if self.current() == &Token::Exists {
                self.advance();
            }
        }
    }

    fn parse_create_table(&mut self) {
        let Some(name) = self.take_qualified_name() else {
            self.skip_statement();
            return;
        };
        if self.current() != &Token::LParen {
            self.skip_statement();
            return;
        }
        self.advance();

        let mut table = Table::new(&name);
        loop {
            match self.current().clone() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => self.advance(),
                Token::Constraint => {
                    // Named constraint: drop the name, let the next
                    // iteration dispatch on the constraint kind.
                    self.advance();
                    let _ = self.take_ident();
                }
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    table.primary_key.extend(self.parse_column_list());
                }
                Token::Foreign => {
                    self.parse_foreign_key_clause(&name);
                }
                Token::Unique => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    let columns = self.parse_column_list();
                    if !columns.is_empty() {
                        self.schema.unique_constraints.push(UniqueConstraint {
                            table: name.clone(),
                            columns,
                            name: None,
                        });
                    }
                }
                Token::Index | Token::Key => {
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Ident(_) => {
                    if let Some(column) = self.parse_column(&name, &mut table.primary_key) {
                        table.columns.push(column);
                    }
                }
                Token::Eof => break,
                _ => self.advance(),
            }
        }
        // Table options (ENGINE=..., charset) up to the semicolon.
        self.skip_statement();
        self.schema.tables.push(table);
    }

    fn parse_column(&mut self, table: &str, primary_key: &mut Vec<String>) -> Option<Column> {
        let name = self.take_ident()?;

        // Type text: idents and parenthesized arguments, verbatim.
        let mut type_parts: Vec<String> = Vec::new();
        let mut depth = 0;
        loop {
            match self.current().clone() {
                Token::Ident(part) => {
                    if depth == 0 && !type_parts.is_empty() {
                        // Second bare word (DOUBLE PRECISION etc.).
                        type_parts.push(format!(" {part}"));
                    } else {
                        type_parts.push(part);
                    }
                    self.advance();
                }
                Token::Num(n) if depth > 0 => {
                    type_parts.push(n);
                    self.advance();
                }
                Token::LParen => {
                    depth += 1;
                    type_parts.push("(".to_string());
                    self.advance();
                }
                Token::RParen if depth > 0 => {
                    depth -= 1;
                    type_parts.push(")".to_string());
                    self.advance();
                }
                Token::Comma if depth > 0 => {
                    type_parts.push(",".to_string());
                    self.advance();
                }
                _ => break,
            }
        }
        if type_parts.is_empty() {
            return None;
        }

        let mut column = Column::new(&name, &type_parts.concat());
        loop {
            match self.current() {
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    if !primary_key.contains(&name) {
                        primary_key.push(name.clone());
                    }
                }
                Token::Not => {
                    self.advance();
                    if self.current() == &Token::Null {
                        self.advance();
                        column.nullable = false;
                    }
                }
                Token::Null => self.advance(),
                Token::Unique => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    self.schema.unique_constraints.push(UniqueConstraint {
                        table: table.to_string(),
                        columns: vec![name.clone()],
                        name: None,
                    });
                }
                Token::Default => {
                    self.advance();
                    column.default = self.parse_default_value();
                }
                Token::AutoIncrement => {
                    self.advance();
                    column.auto_increment = true;
                }
                Token::References => {
                    self.advance();
                    if let Some((target, target_column)) = self.parse_reference() {
                        self.schema.foreign_keys.push(ForeignKey::new(
                            table,
                            &name,
                            &target,
                            &target_column,
                        ));
                    }
                    self.skip_on_actions();
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Constraint => {
                    self.advance();
                    let _ = self.take_ident();
                }
                Token::On => self.skip_on_actions(),
                Token::Comma | Token::RParen | Token::Eof => break,
                _ => self.advance(),
            }
        }
        Some(column)
    }

    fn parse_default_value(&mut self) -> Option<String> {
        match self.current().clone() {
            Token::Str(s) => {
                self.advance();
                Some(s)
            }
            Token::Num(n) => {
                self.advance();
                Some(n)
            }
            Token::Null => {
                self.advance();
                Some("NULL".to_string())
            }
            Token::Ident(s) => {
                self.advance();
                let mut value = s;
                if self.current() == &Token::LParen {
                    self.skip_parenthesized();
                    value.push_str("()");
                }
                Some(value)
            }
            Token::LParen => {
                self.skip_parenthesized();
                None
            }
            _ => None,
        }
    }

    /// `FOREIGN KEY (col) REFERENCES target (col)` inside a table body.
    fn parse_foreign_key_clause(&mut self, table: &str) {
        self.advance(); // FOREIGN
        if self.current() != &Token::Key {
            return;
        }
        self.advance();

        let columns = self.parse_column_list();
        if self.current() != &Token::References {
            return;
        }
        self.advance();

        if let (Some(column), Some((target, target_column))) =
            (columns.first(), self.parse_reference())
        {
            self.schema
                .foreign_keys
                .push(ForeignKey::new(table, column, &target, &target_column));
        }
        self.skip_on_actions();
    }

    fn parse_reference(&mut self) -> Option<(String, String)> {
        let target = self.take_qualified_name()?;
        let column = if self.current() == &Token::LParen {
            self.parse_column_list()
                .into_iter()
                .next()
                .unwrap_or_else(|| "id".to_string())
        } else {
            "id".to_string()
        };
        Some((target, column))
    }

    fn parse_column_list(&mut self) -> Vec<String> {
        let mut columns = Vec::new();
        if self.current() != &Token::LParen {
            return columns;
        }
        self.advance();
        loop {
            match self.current().clone() {
                Token::Ident(name) => {
                    columns.push(name);
                    self.advance();
                }
                Token::Comma => self.advance(),
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => break,
                _ => self.advance(),
            }
        }
        columns
    }

    /// `CREATE INDEX name ON table (columns)`.
    fn parse_create_index(&mut self) {
        let Some(name) = self.take_ident() else {
            self.skip_statement();
            return;
        };
        if self.current() != &Token::On {
            self.skip_statement();
            return;
        }
        self.advance();
        let Some(table) = self.take_qualified_name() else {
            self.skip_statement();
            return;
        };
        let columns = self.parse_column_list();
        if !columns.is_empty() {
            self.schema.indexes.push(Index {
                name,
                table,
                columns,
                kind: "BTREE",
            });
        }
        self.skip_statement();
    }

    /// `ALTER TABLE [ONLY] t ADD CONSTRAINT name FOREIGN KEY … | UNIQUE …`.
    fn parse_alter_table(&mut self) {
        self.advance(); // ALTER
        if self.current() != &Token::Table {
            self.skip_statement();
            return;
        }
        self.advance();
        if self.current() == &Token::Only {
            self.advance();
        }
        let Some(table) = self.take_qualified_name() else {
            self.skip_statement();
            return;
        };
        if self.current() != &Token::Add {
            self.skip_statement();
            return;
        }
        self.advance();

        let mut constraint_name = None;
        if self.current() == &Token::Constraint {
            self.advance();
            constraint_name = self.take_ident();
        }

        match self.current() {
            Token::Foreign => {
                self.advance(); // FOREIGN
                if self.current() != &Token::Key {
                    self.skip_statement();
                    return;
                }
                self.advance();
                let columns = self.parse_column_list();
                if self.current() != &Token::References {
                    self.skip_statement();
                    return;
                }
                self.advance();
                if let (Some(column), Some((target, target_column))) =
                    (columns.first(), self.parse_reference())
                {
                    let mut fk = ForeignKey::new(&table, column, &target, &target_column);
                    if let Some(name) = constraint_name {
                        fk.constraint_name = name;
                    }
                    self.schema.foreign_keys.push(fk);
                }
                self.skip_statement();
            }
            Token::Unique => {
                self.advance();
                let columns = self.parse_column_list();
                if !columns.is_empty() {
                    self.schema.unique_constraints.push(UniqueConstraint {
                        table,
                        columns,
                        name: constraint_name,
                    });
                }
                self.skip_statement();
            }
            _ => self.skip_statement(),
        }
    }

    fn skip_on_actions(&mut self) {
        while self.current() == &Token::On {
            self.advance();
            if matches!(self.current(), Token::Delete | Token::Update) {
                self.advance();
            }
            match self.current().clone() {
                Token::Cascade | Token::Restrict => self.advance(),
                Token::Ident(word) if word.eq_ignore_ascii_case("SET") => {
                    self.advance();
                    if matches!(self.current(), Token::Null | Token::Default) {
                        self.advance();
                    }
                }
                Token::Ident(word) if word.eq_ignore_ascii_case("NO") => {
                    self.advance();
                    if matches!(self.current(), Token::Ident(a) if a.eq_ignore_ascii_case("ACTION"))
                    {
                        self.advance();
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_parenthesized(&mut self) {
        if self.current() != &Token::LParen {
            return;
        }
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }

    fn skip_until(&mut self, stops: &[Token]) {
        while !stops.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }

    /// Build the relation list: explicit FK constraints first, then
    /// implicit references carried by column names (`client_id`,
    /// `id_client`, `produit_code`, `commande_ref`). Self-references are
    /// tagged as recursive hierarchies.
    fn infer_relations(&mut self) {
        let schema = &self.schema;
        let mut relations: Vec<InferredRelation> = Vec::new();
        let mut hierarchies: Vec<Hierarchy> = Vec::new();

        for fk in &schema.foreign_keys {
            relations.push(InferredRelation {
                table: fk.table.clone(),
                column: fk.column.clone(),
                referenced_table: fk.referenced_table.clone(),
                cardinality: relation_cardinality(schema, &fk.table, &fk.column),
                explicit: true,
            });
            if fk.table == fk.referenced_table {
                hierarchies.push(Hierarchy {
                    table: fk.table.clone(),
                    column: fk.column.clone(),
                    kind: "recursive",
                });
            }
        }

        for table in &schema.tables {
            for column in &table.columns {
                if schema.is_fk_column(&table.name, &column.name) {
                    continue;
                }
                let Some(target) = heuristics::referenced_entity(&column.name) else {
                    continue;
                };
                if schema.table(target).is_none() {
                    continue;
                }
                relations.push(InferredRelation {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    referenced_table: target.to_string(),
                    cardinality: relation_cardinality(schema, &table.name, &column.name),
                    explicit: false,
                });
                if table.name == target {
                    hierarchies.push(Hierarchy {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        kind: "recursive",
                    });
                }
            }
        }

        self.schema.relations = relations;
        self.schema.hierarchies = hierarchies;
    }
}

fn relation_cardinality(schema: &InspectedSchema, table: &str, column: &str) -> String {
    let nullable = schema
        .table(table)
        .and_then(|t| t.column(column))
        .map(|c| c.nullable)
        .unwrap_or(true);
    let min = if nullable { "0" } else { "1" };
    let max = if schema.is_unique_column(table, column) {
        "1"
    } else {
        "*"
    };
    format!("{min}..{max}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP_SQL: &str = r#"
CREATE TABLE client (
    id INTEGER PRIMARY KEY,
    nom VARCHAR(100) NOT NULL,
    email VARCHAR(255) UNIQUE
);

CREATE TABLE commande (
    id INTEGER PRIMARY KEY,
    date_commande DATE NOT NULL,
    client_id INTEGER NOT NULL,
    FOREIGN KEY (client_id) REFERENCES client(id)
);
"#;

    #[test]
    fn test_analyze_tables_and_columns() {
        let schema = analyze_sql(SHOP_SQL);

        assert_eq!(schema.tables.len(), 2);
        let client = schema.table("client").unwrap();
        assert_eq!(client.primary_key, vec!["id"]);
        assert_eq!(client.columns.len(), 3);
        assert_eq!(client.column("nom").unwrap().sql_type, "VARCHAR(100)");
        assert!(!client.column("nom").unwrap().nullable);
        assert!(schema.is_unique_column("client", "email"));

        assert_eq!(schema.foreign_keys.len(), 1);
        let fk = &schema.foreign_keys[0];
        assert_eq!(fk.table, "commande");
        assert_eq!(fk.referenced_table, "client");
        assert_eq!(fk.referenced_column, "id");
    }

    #[test]
    fn test_explicit_relation_cardinality() {
        let schema = analyze_sql(SHOP_SQL);
        let relation = &schema.relations[0];

        assert!(relation.explicit);
        // NOT NULL, not unique: each commande points at exactly one
        // client, many commandes per client.
        assert_eq!(relation.cardinality, "1..*");
    }

    #[test]
    fn test_recursive_hierarchy() {
        let sql = "CREATE TABLE categorie (id INT, parent_id INT REFERENCES categorie(id));";
        let schema = analyze_sql(sql);

        assert_eq!(schema.hierarchies.len(), 1);
        let hierarchy = &schema.hierarchies[0];
        assert_eq!(hierarchy.kind, "recursive");
        assert_eq!(hierarchy.table, "categorie");
    }

    #[test]
    fn test_implicit_relation_from_column_name() {
        let sql = r#"
CREATE TABLE client (id INT PRIMARY KEY);
CREATE TABLE commande (id INT PRIMARY KEY, client_id INT);
"#;
        let schema = analyze_sql(sql);

        assert_eq!(schema.foreign_keys.len(), 0);
        assert_eq!(schema.relations.len(), 1);
        let relation = &schema.relations[0];
        assert!(!relation.explicit);
        assert_eq!(relation.referenced_table, "client");
        // Nullable implicit reference.
        assert_eq!(relation.cardinality, "0..*");
    }

    #[test]
    fn test_alter_table_constraint() {
        let sql = r#"
CREATE TABLE client (id INT PRIMARY KEY);
CREATE TABLE commande (id INT PRIMARY KEY, client_id INT NOT NULL);
ALTER TABLE commande ADD CONSTRAINT fk_commande_client FOREIGN KEY (client_id) REFERENCES client (id);
"#;
        let schema = analyze_sql(sql);

        assert_eq!(schema.foreign_keys.len(), 1);
        assert_eq!(schema.foreign_keys[0].constraint_name, "fk_commande_client");
    }

    #[test]
    fn test_create_index_parsed() {
        let sql = r#"
CREATE TABLE client (id INT PRIMARY KEY, nom VARCHAR(100));
CREATE INDEX idx_client_nom ON client (nom);
"#;
        let schema = analyze_sql(sql);

        assert!(schema.has_index("client", "nom"));
        assert_eq!(schema.indexes[0].name, "idx_client_nom");
    }

    #[test]
    fn test_unique_fk_gives_one_to_one_cardinality() {
        let sql = r#"
CREATE TABLE utilisateur (id INT PRIMARY KEY);
CREATE TABLE profil (
    id INT PRIMARY KEY,
    utilisateur_id INT NOT NULL UNIQUE,
    FOREIGN KEY (utilisateur_id) REFERENCES utilisateur(id)
);
"#;
        let schema = analyze_sql(sql);
        let relation = schema.relations.iter().find(|r| r.explicit).unwrap();
        assert_eq!(relation.cardinality, "1..1");
    }

    #[test]
    fn test_mysql_noise_tolerated() {
        let sql = r#"
-- MySQL dump
CREATE TABLE IF NOT EXISTS `produit` (
    `id` INT AUTO_INCREMENT PRIMARY KEY,
    `prix` DECIMAL(10,2) DEFAULT 0,
    KEY `idx_prix` (`prix`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
"#;
        let schema = analyze_sql(sql);
        let produit = schema.table("produit").unwrap();

        assert!(produit.column("id").unwrap().auto_increment);
        assert_eq!(produit.column("prix").unwrap().sql_type, "DECIMAL(10,2)");
        assert_eq!(produit.column("prix").unwrap().default.as_deref(), Some("0"));
    }

    #[test]
    fn test_round_trip_with_forward_pipeline() {
        use crate::generator::to_sql;
        use crate::logical::to_logical;
        use crate::markdown;
        use crate::mpd::{Dialect, to_physical};

        let text = r#"
## Client
- nom (varchar) : nom du client

## Commande
- date_commande (date)

### Client <-> Commande : Passe
Client : 1,1
Commande : 0,n
"#;
        let logical = to_logical(&markdown::parse(text).schema).unwrap();
        let sql = to_sql(&to_physical(&logical, Dialect::PostgreSql));
        let inspected = analyze_sql(&sql);

        // Same tables, columns and foreign keys come back.
        assert_eq!(inspected.tables.len(), logical.tables.len());
        for table in &logical.tables {
            let recovered = inspected.table(&table.name).unwrap();
            let expected: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            let actual: Vec<&str> = recovered.columns.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(expected, actual);
            assert_eq!(table.primary_key, recovered.primary_key);
        }
        assert_eq!(inspected.foreign_keys.len(), logical.foreign_keys.len());
        assert_eq!(inspected.foreign_keys[0].referenced_table, "client");
    }
}
