//! Schema validation rules.
//!
//! Each rule is an independent, total function over the whole inspected
//! schema. `validate_schema` runs them in a fixed, documented order; the
//! list is read-only and stateless, so rules can be cherry-picked in
//! tests.

use super::inspector::InspectedSchema;
use crate::heuristics;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: &'static str,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn table_issue(severity: Severity, kind: &'static str, table: &str, message: String) -> Self {
        Self {
            severity,
            kind,
            table: table.to_string(),
            column: None,
            message,
        }
    }

    fn column_issue(
        severity: Severity,
        kind: &'static str,
        table: &str,
        column: &str,
        message: String,
    ) -> Self {
        Self {
            severity,
            kind,
            table: table.to_string(),
            column: Some(column.to_string()),
            message,
        }
    }
}

type Rule = fn(&InspectedSchema) -> Vec<ValidationIssue>;

/// Rules in execution order.
pub const RULES: &[(&str, Rule)] = &[
    ("missing_primary_key", missing_primary_key),
    ("dangling_foreign_key", dangling_foreign_key),
    ("naming_convention", naming_convention),
    ("name_type_mismatch", name_type_mismatch),
    ("nullable_keys", nullable_keys),
    ("missing_indexes", missing_indexes),
    ("circular_reference", circular_reference),
    ("isolated_table", isolated_table),
    ("missing_junction", missing_junction),
];

/// Run every rule in order against the schema.
pub fn validate_schema(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    RULES.iter().flat_map(|(_, rule)| rule(schema)).collect()
}

fn missing_primary_key(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    schema
        .tables
        .iter()
        .filter(|t| t.primary_key.is_empty())
        .map(|t| {
            ValidationIssue::table_issue(
                Severity::Error,
                "missing_primary_key",
                &t.name,
                format!("table '{}' has no primary key", t.name),
            )
        })
        .collect()
}

fn dangling_foreign_key(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for fk in &schema.foreign_keys {
        match schema.table(&fk.referenced_table) {
            None => issues.push(ValidationIssue::column_issue(
                Severity::Error,
                "dangling_foreign_key",
                &fk.table,
                &fk.column,
                format!(
                    "foreign key '{}' references missing table '{}'",
                    fk.constraint_name, fk.referenced_table
                ),
            )),
            Some(target) if target.column(&fk.referenced_column).is_none() => {
                issues.push(ValidationIssue::column_issue(
                    Severity::Error,
                    "dangling_foreign_key",
                    &fk.table,
                    &fk.column,
                    format!(
                        "foreign key '{}' references missing column '{}.{}'",
                        fk.constraint_name, fk.referenced_table, fk.referenced_column
                    ),
                ))
            }
            _ => {}
        }
    }
    issues
}

fn naming_convention(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let pattern = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    let mut issues = Vec::new();
    for table in &schema.tables {
        if !pattern.is_match(&table.name) {
            issues.push(ValidationIssue::table_issue(
                Severity::Warning,
                "naming_convention",
                &table.name,
                format!("table name '{}' should be snake_case", table.name),
            ));
        }
        for column in &table.columns {
            if !pattern.is_match(&column.name) {
                issues.push(ValidationIssue::column_issue(
                    Severity::Warning,
                    "naming_convention",
                    &table.name,
                    &column.name,
                    format!("column name '{}' should be snake_case", column.name),
                ));
            }
        }
    }
    issues
}

/// Column names promise a shape their declared type does not deliver.
fn name_type_mismatch(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for table in &schema.tables {
        for column in &table.columns {
            let name = column.name.to_lowercase();
            let typ = column.sql_type.to_uppercase();

            if heuristics::is_date_named(&name)
                && !typ.contains("DATE")
                && !typ.contains("TIMESTAMP")
            {
                issues.push(ValidationIssue::column_issue(
                    Severity::Warning,
                    "name_type_mismatch",
                    &table.name,
                    &column.name,
                    format!("column '{}' looks like a date but is typed {typ}", column.name),
                ));
            }
            if name == "id" && !typ.contains("INT") && !typ.contains("SERIAL") {
                issues.push(ValidationIssue::column_issue(
                    Severity::Warning,
                    "name_type_mismatch",
                    &table.name,
                    &column.name,
                    format!("identifier column typed {typ}, expected an integer type"),
                ));
            }
            if heuristics::is_price_column(&name) && typ.contains("INT") {
                issues.push(ValidationIssue::column_issue(
                    Severity::Warning,
                    "name_type_mismatch",
                    &table.name,
                    &column.name,
                    format!("monetary column '{}' typed {typ}, expected DECIMAL", column.name),
                ));
            }
        }
    }
    issues
}

fn nullable_keys(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for table in &schema.tables {
        for pk in &table.primary_key {
            if table.column(pk).map(|c| c.nullable).unwrap_or(false) {
                issues.push(ValidationIssue::column_issue(
                    Severity::Error,
                    "nullable_primary_key",
                    &table.name,
                    pk,
                    format!("primary key column '{pk}' must be NOT NULL"),
                ));
            }
        }
    }
    for fk in &schema.foreign_keys {
        let nullable = schema
            .table(&fk.table)
            .and_then(|t| t.column(&fk.column))
            .map(|c| c.nullable)
            .unwrap_or(false);
        if nullable {
            issues.push(ValidationIssue::column_issue(
                Severity::Warning,
                "nullable_foreign_key",
                &fk.table,
                &fk.column,
                format!("foreign key column '{}' should be NOT NULL", fk.column),
            ));
        }
    }
    issues
}

fn missing_indexes(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for fk in &schema.foreign_keys {
        if !schema.has_index(&fk.table, &fk.column) {
            issues.push(ValidationIssue::column_issue(
                Severity::Warning,
                "missing_index",
                &fk.table,
                &fk.column,
                format!("foreign key column '{}' has no index", fk.column),
            ));
        }
    }
    for table in &schema.tables {
        for column in &table.columns {
            if heuristics::is_filter_column(&column.name)
                && !schema.has_index(&table.name, &column.name)
            {
                issues.push(ValidationIssue::column_issue(
                    Severity::Suggestion,
                    "missing_index",
                    &table.name,
                    &column.name,
                    format!("frequently filtered column '{}' has no index", column.name),
                ));
            }
        }
    }
    issues
}

/// DFS over the FK dependency graph; each cycle is reported once, from
/// its first table in schema order. Self-references are hierarchies, not
/// cycles.
fn circular_reference(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut reported: Vec<Vec<String>> = Vec::new();

    for start in &schema.tables {
        let mut stack = vec![start.name.clone()];
        if let Some(mut cycle) = dfs_cycle(schema, &start.name, &mut stack) {
            cycle.sort();
            if !reported.contains(&cycle) {
                reported.push(cycle.clone());
                issues.push(ValidationIssue::table_issue(
                    Severity::Warning,
                    "circular_reference",
                    &start.name,
                    format!("circular foreign key reference through {}", cycle.join(" -> ")),
                ));
            }
        }
    }
    issues
}

fn dfs_cycle(
    schema: &InspectedSchema,
    current: &str,
    stack: &mut Vec<String>,
) -> Option<Vec<String>> {
    for fk in &schema.foreign_keys {
        if fk.table != current || fk.referenced_table == fk.table {
            continue;
        }
        if stack.first().map(String::as_str) == Some(fk.referenced_table.as_str()) {
            return Some(stack.clone());
        }
        if stack.iter().any(|t| t == &fk.referenced_table) {
            continue;
        }
        stack.push(fk.referenced_table.clone());
        if let Some(cycle) = dfs_cycle(schema, &fk.referenced_table, stack) {
            return Some(cycle);
        }
        stack.pop();
    }
    None
}

fn isolated_table(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    schema
        .tables
        .iter()
        .filter(|table| {
            !schema
                .relations
                .iter()
                .any(|r| r.table == table.name || r.referenced_table == table.name)
        })
        .map(|table| {
            ValidationIssue::table_issue(
                Severity::Warning,
                "isolated_table",
                &table.name,
                format!("table '{}' has no relationship with any other table", table.name),
            )
        })
        .collect()
}

/// Two tables pointing at each other usually mean a missing junction
/// table for a many-to-many pair.
fn missing_junction(schema: &InspectedSchema) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen: Vec<(String, String)> = Vec::new();
    for a in &schema.relations {
        for b in &schema.relations {
            if a.table != b.referenced_table
                || b.table != a.referenced_table
                || a.table == b.table
            {
                continue;
            }
            let mut pair = [a.table.clone(), b.table.clone()];
            pair.sort();
            let key = (pair[0].clone(), pair[1].clone());
            if !seen.contains(&key) {
                seen.push(key.clone());
                issues.push(ValidationIssue::table_issue(
                    Severity::Suggestion,
                    "missing_junction",
                    &key.0,
                    format!(
                        "tables '{}' and '{}' reference each other; a junction table would model the many-to-many pair",
                        key.0, key.1
                    ),
                ));
            }
        }
    }
    issues
}
