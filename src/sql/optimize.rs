//! Optimization suggestions: indexes, constraints, normalization smells
//! and data-type right-sizing. Everything here is advisory; suggestions
//! are rendered next to the generated artifact, never enforced.

use super::inspector::InspectedSchema;
use crate::heuristics;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationSuggestion {
    pub kind: &'static str,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<String>,
    pub reason: String,
}

impl OptimizationSuggestion {
    fn new(kind: &'static str, table: &str, column: Option<&str>, reason: String) -> Self {
        Self {
            kind,
            table: table.to_string(),
            column: column.map(str::to_string),
            current: None,
            suggested: None,
            reason,
        }
    }

    fn retyped(mut self, current: &str, suggested: &str) -> Self {
        self.current = Some(current.to_string());
        self.suggested = Some(suggested.to_string());
        self
    }
}

/// Produce all suggestions in a fixed order: indexes, constraints,
/// normalization, data types.
pub fn suggest_optimizations(schema: &InspectedSchema) -> Vec<OptimizationSuggestion> {
    let mut suggestions = Vec::new();
    suggest_indexes(schema, &mut suggestions);
    suggest_constraints(schema, &mut suggestions);
    suggest_normalization(schema, &mut suggestions);
    suggest_data_types(schema, &mut suggestions);
    suggestions
}

fn suggest_indexes(schema: &InspectedSchema, out: &mut Vec<OptimizationSuggestion>) {
    for table in &schema.tables {
        for column in &table.columns {
            if schema.has_index(&table.name, &column.name) {
                continue;
            }
            let typ = column.sql_type.to_uppercase();
            let filterable = heuristics::is_filter_column(&column.name)
                || typ.contains("DATE")
                || typ.contains("TIMESTAMP")
                || typ.contains("BOOLEAN");
            if filterable {
                out.push(OptimizationSuggestion::new(
                    "filter_index",
                    &table.name,
                    Some(&column.name),
                    format!("column '{}' is a likely filter target", column.name),
                ));
            } else if heuristics::is_date_named(&column.name) {
                out.push(OptimizationSuggestion::new(
                    "sort_index",
                    &table.name,
                    Some(&column.name),
                    format!("column '{}' is a likely sort key", column.name),
                ));
            }
        }

        let fk_columns: Vec<&str> = schema
            .foreign_keys
            .iter()
            .filter(|fk| fk.table == table.name)
            .map(|fk| fk.column.as_str())
            .collect();
        if fk_columns.len() >= 2 {
            out.push(OptimizationSuggestion::new(
                "composite_index",
                &table.name,
                None,
                format!(
                    "columns ({}) are joined together and would benefit from a composite index",
                    fk_columns.join(", ")
                ),
            ));
        }
    }
}

fn suggest_constraints(schema: &InspectedSchema, out: &mut Vec<OptimizationSuggestion>) {
    const UNIQUE_FAMILY: &[&str] = &["email", "code", "reference", "numero", "siret"];

    for table in &schema.tables {
        for column in &table.columns {
            let name = column.name.to_lowercase();
            if UNIQUE_FAMILY.iter().any(|kw| name.contains(kw))
                && !schema.is_unique_column(&table.name, &column.name)
            {
                out.push(OptimizationSuggestion::new(
                    "unique_constraint",
                    &table.name,
                    Some(&column.name),
                    format!("column '{}' is usually unique per row", column.name),
                ));
            }
            if heuristics::is_price_column(&name) || name.contains("quantite") || name.contains("stock")
            {
                out.push(OptimizationSuggestion::new(
                    "check_constraint",
                    &table.name,
                    Some(&column.name),
                    format!("CHECK ({} >= 0) would reject negative values", column.name),
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
            out.push(OptimizationSuggestion::new(
                "not_null_constraint",
                &fk.table,
                Some(&fk.column),
                format!("foreign key column '{}' is nullable", fk.column),
            ));
        }
    }
}

fn suggest_normalization(schema: &InspectedSchema, out: &mut Vec<OptimizationSuggestion>) {
    const MULTIVALUE_FAMILY: &[&str] = &["list", "liste", "array", "tags", "csv"];
    const TRANSITIVE_FAMILIES: &[(&str, &[&str])] = &[
        ("date", &["date", "_at", "jour"]),
        ("status", &["status", "statut", "etat"]),
    ];

    for table in &schema.tables {
        // 1NF: a column that smells like it stores several values.
        for column in &table.columns {
            let name = column.name.to_lowercase();
            if MULTIVALUE_FAMILY.iter().any(|kw| name.contains(kw)) {
                out.push(OptimizationSuggestion::new(
                    "first_normal_form",
                    &table.name,
                    Some(&column.name),
                    format!(
                        "column '{}' looks multi-valued; split it into a child table",
                        column.name
                    ),
                ));
            }
        }

        let non_key: Vec<&crate::mld::Column> = table
            .columns
            .iter()
            .filter(|c| {
                !table.primary_key.contains(&c.name)
                    && !schema.is_fk_column(&table.name, &c.name)
            })
            .collect();

        // 2NF: with a composite key, a non-key column named after one key
        // part only depends on that part.
        if table.primary_key.len() >= 2 {
            for pk in &table.primary_key {
                let Some(prefix) = pk.split('_').next() else {
                    continue;
                };
                for column in &non_key {
                    if column.name.starts_with(prefix) && column.name.as_str() != pk.as_str() {
                        out.push(OptimizationSuggestion::new(
                            "second_normal_form",
                            &table.name,
                            Some(&column.name),
                            format!(
                                "column '{}' seems to depend on '{pk}' alone, not the full key",
                                column.name
                            ),
                        ));
                    }
                }
            }
        }

        // 3NF: several non-key columns in the same keyword family hint at
        // a transitive dependency worth extracting.
        for (family, keywords) in TRANSITIVE_FAMILIES {
            let members: Vec<&str> = non_key
                .iter()
                .filter(|c| {
                    let name = c.name.to_lowercase();
                    keywords.iter().any(|kw| name.contains(kw))
                        && !heuristics::is_audit_column(&name)
                })
                .map(|c| c.name.as_str())
                .collect();
            if members.len() >= 2 {
                out.push(OptimizationSuggestion::new(
                    "third_normal_form",
                    &table.name,
                    None,
                    format!(
                        "columns ({}) share the '{family}' family and may depend on each other",
                        members.join(", ")
                    ),
                ));
            }
        }
    }
}

fn suggest_data_types(schema: &InspectedSchema, out: &mut Vec<OptimizationSuggestion>) {
    for table in &schema.tables {
        for column in &table.columns {
            let name = column.name.to_lowercase();
            let typ = column.sql_type.to_uppercase();

            if let Some(size) = varchar_size(&typ) {
                if size > 255 {
                    out.push(
                        OptimizationSuggestion::new(
                            "data_type",
                            &table.name,
                            Some(&column.name),
                            format!("VARCHAR({size}) is large enough to warrant TEXT"),
                        )
                        .retyped(&typ, "TEXT"),
                    );
                }
            }
            if name == "id" && typ.starts_with("INT") {
                out.push(
                    OptimizationSuggestion::new(
                        "data_type",
                        &table.name,
                        Some(&column.name),
                        "BIGINT leaves headroom for identifier growth".to_string(),
                    )
                    .retyped(&typ, "BIGINT"),
                );
            }
            if heuristics::is_price_column(&name) && typ.contains("INT") {
                out.push(
                    OptimizationSuggestion::new(
                        "data_type",
                        &table.name,
                        Some(&column.name),
                        "monetary amounts need fixed-point precision".to_string(),
                    )
                    .retyped(&typ, "DECIMAL(10,2)"),
                );
            }
            if typ.contains("TIMESTAMP") && !heuristics::is_audit_column(&name) {
                out.push(
                    OptimizationSuggestion::new(
                        "data_type",
                        &table.name,
                        Some(&column.name),
                        format!("column '{}' may not need time-of-day precision", column.name),
                    )
                    .retyped(&typ, "DATE"),
                );
            }
        }
    }
}

fn varchar_size(typ: &str) -> Option<u32> {
    let rest = typ.strip_prefix("VARCHAR(")?;
    rest.strip_suffix(')')?.trim().parse().ok()
}
