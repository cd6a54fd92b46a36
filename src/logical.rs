//! Conceptual→logical conversion: entities become tables, associations
//! become foreign keys or junction tables depending on their cardinality
//! pair, inheritance becomes a unique foreign key on the child.

use crate::heuristics;
use crate::mcd::{Association, Attribute, AttributeType, BaseType, Cardinality, ConceptualSchema};
use crate::mld::{Column, ForeignKey, LogicalSchema, Table, UniqueConstraint};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The association's cardinality pair has no mapping rule. Reported
    /// explicitly so the relation cannot silently vanish from the logical
    /// schema.
    #[error(
        "association '{association}' has unsupported cardinality pair ({side1}, {side2})"
    )]
    UnsupportedCardinality {
        association: String,
        side1: Cardinality,
        side2: Cardinality,
    },
}

/// Map a conceptual attribute type to its SQL type string. Declared
/// sizes and precisions replace the placeholder defaults.
pub fn sql_type(typ: &AttributeType) -> String {
    match typ.base {
        BaseType::Varchar => match typ.size {
            Some(n) => format!("VARCHAR({n})"),
            None => "VARCHAR(255)".to_string(),
        },
        BaseType::Char => match typ.size {
            Some(n) => format!("CHAR({n})"),
            None => "CHAR(1)".to_string(),
        },
        BaseType::Integer => "INTEGER".to_string(),
        BaseType::Decimal => match typ.precision {
            Some((p, s)) => format!("DECIMAL({p},{s})"),
            None => "DECIMAL(10,2)".to_string(),
        },
        BaseType::Date => "DATE".to_string(),
        BaseType::DateTime => "TIMESTAMP".to_string(),
        BaseType::Boolean => "BOOLEAN".to_string(),
        BaseType::Text => "TEXT".to_string(),
    }
}

/// Convert a conceptual schema into a relational one. Only fails when an
/// association carries a cardinality pair outside the documented mapping
/// table; structural gaps (dangling associations, empty entities) never
/// abort the conversion.
pub fn to_logical(schema: &ConceptualSchema) -> Result<LogicalSchema, ConvertError> {
    let mut logical = LogicalSchema::default();

    for entity in &schema.entities {
        logical.tables.push(entity_table(entity, &mut logical.unique_constraints));
    }
    for association in &schema.associations {
        convert_association(association, &mut logical)?;
    }
    for (child, parent) in &schema.inheritance {
        convert_inheritance(child, parent, &mut logical);
    }

    Ok(logical)
}

fn entity_table(entity: &crate::mcd::Entity, uniques: &mut Vec<UniqueConstraint>) -> Table {
    let mut table = Table::new(&entity.name.to_lowercase());

    for attr in &entity.attributes {
        let mut column = Column::new(&attr.name, &sql_type(&attr.typ));
        column.nullable = attr.nullable;
        column.default = attr.default.clone();
        table.columns.push(column);

        if attr.is_unique() {
            uniques.push(UniqueConstraint {
                table: table.name.clone(),
                columns: vec![attr.name.clone()],
                name: Some(format!("uq_{}_{}", table.name, attr.name)),
            });
        }
    }

    table.primary_key = detect_primary_key(entity);
    if table.primary_key.is_empty() {
        // No candidate at all: synthesize a surrogate key.
        let id = Column {
            name: "id".to_string(),
            sql_type: "INTEGER".to_string(),
            nullable: false,
            auto_increment: true,
            default: None,
        };
        table.columns.insert(0, id);
        table.primary_key = vec!["id".to_string()];
    }
    for pk in table.primary_key.clone() {
        if let Some(column) = table.columns.iter_mut().find(|c| c.name == pk) {
            column.nullable = false;
        }
    }
    table
}

/// Primary-key detection: two or more foreign-key-shaped attributes mark
/// a junction-like entity and form a composite key; otherwise the first
/// identifier-like attribute wins; otherwise empty (caller synthesizes).
fn detect_primary_key(entity: &crate::mcd::Entity) -> Vec<String> {
    let fk_shaped: Vec<String> = entity
        .attributes
        .iter()
        .filter(|a| heuristics::is_fk_shaped(&a.name))
        .map(|a| a.name.clone())
        .collect();
    if fk_shaped.len() >= 2 {
        return fk_shaped;
    }

    entity
        .attributes
        .iter()
        .find(|a| heuristics::is_pk_candidate(a))
        .map(|a| vec![a.name.clone()])
        .unwrap_or_default()
}

fn convert_association(
    association: &Association,
    logical: &mut LogicalSchema,
) -> Result<(), ConvertError> {
    use Cardinality::{ExactlyOne, ZeroOrMany};

    let table1 = association.entity1.to_lowercase();
    let table2 = association.entity2.to_lowercase();
    if logical.table(&table1).is_none() || logical.table(&table2).is_none() {
        warn!(
            "association '{}' references a missing entity, skipped",
            association.name
        );
        return Ok(());
    }

    match (association.cardinality1, association.cardinality2) {
        // Side carrying (1,1) is the "one" side; the FK lands on the many
        // side and points back at it.
        (ExactlyOne, ZeroOrMany) => {
            add_foreign_key(logical, &table2, &table1, false);
        }
        (ZeroOrMany, ExactlyOne) => {
            add_foreign_key(logical, &table1, &table2, false);
        }
        (ZeroOrMany, ZeroOrMany) => {
            add_junction_table(logical, &table1, &table2, &association.attributes);
        }
        // 1-1: the FK side is arbitrary; side1 carries it, made unique to
        // keep the pairing one-to-one.
        (ExactlyOne, ExactlyOne) => {
            add_foreign_key(logical, &table1, &table2, true);
        }
        (side1, side2) => {
            return Err(ConvertError::UnsupportedCardinality {
                association: association.name.clone(),
                side1,
                side2,
            });
        }
    }
    Ok(())
}

/// Add `{referenced}_id` on `source` plus the FK constraint.
fn add_foreign_key(logical: &mut LogicalSchema, source: &str, referenced: &str, unique: bool) {
    let column_name = format!("{referenced}_id");
    let referenced_pk = primary_key_column(logical, referenced);

    let Some(source_table) = logical.table_mut(source) else {
        return;
    };
    if source_table.column(&column_name).is_none() {
        source_table
            .columns
            .push(Column::new(&column_name, "INTEGER").not_null());
    }

    logical
        .foreign_keys
        .push(ForeignKey::new(source, &column_name, referenced, &referenced_pk));
    if unique {
        logical.unique_constraints.push(UniqueConstraint {
            table: source.to_string(),
            columns: vec![column_name.clone()],
            name: Some(format!("uq_{source}_{column_name}")),
        });
    }
}

fn add_junction_table(
    logical: &mut LogicalSchema,
    table1: &str,
    table2: &str,
    attributes: &[Attribute],
) {
    let name = format!("{table1}_{table2}");
    let column1 = format!("{table1}_id");
    let column2 = format!("{table2}_id");

    let mut junction = Table::new(&name);
    junction.columns.push(Column::new(&column1, "INTEGER").not_null());
    junction.columns.push(Column::new(&column2, "INTEGER").not_null());
    for attr in attributes {
        let mut column = Column::new(&attr.name, &sql_type(&attr.typ));
        column.nullable = attr.nullable;
        column.default = attr.default.clone();
        junction.columns.push(column);
    }
    junction.primary_key = vec![column1.clone(), column2.clone()];

    let pk1 = primary_key_column(logical, table1);
    let pk2 = primary_key_column(logical, table2);
    logical.tables.push(junction);
    logical
        .foreign_keys
        .push(ForeignKey::new(&name, &column1, table1, &pk1));
    logical
        .foreign_keys
        .push(ForeignKey::new(&name, &column2, table2, &pk2));
}

/// Joined-table inheritance: `parent_id` on the child, unique so each
/// parent row specializes into at most one child row.
fn convert_inheritance(child: &str, parent: &str, logical: &mut LogicalSchema) {
    let child_table = child.to_lowercase();
    let parent_table = parent.to_lowercase();
    if logical.table(&child_table).is_none() || logical.table(&parent_table).is_none() {
        warn!("inheritance {child} -> {parent} references a missing entity, skipped");
        return;
    }

    let parent_pk = primary_key_column(logical, &parent_table);
    let Some(table) = logical.table_mut(&child_table) else {
        return;
    };
    if table.column("parent_id").is_none() {
        table
            .columns
            .push(Column::new("parent_id", "INTEGER").not_null());
    }

    logical.foreign_keys.push(ForeignKey::new(
        &child_table,
        "parent_id",
        &parent_table,
        &parent_pk,
    ));
    logical.unique_constraints.push(UniqueConstraint {
        table: child_table.clone(),
        columns: vec!["parent_id".to_string()],
        name: Some(format!("uq_{child_table}_parent_id")),
    });
}

fn primary_key_column(logical: &LogicalSchema, table: &str) -> String {
    logical
        .table(table)
        .and_then(|t| t.primary_key.first().cloned())
        .unwrap_or_else(|| "id".to_string())
}
