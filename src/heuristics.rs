//! Name-pattern heuristics shared by the converters and the inspector.
//!
//! Each heuristic is a named, independently testable function so callers
//! can swap or disable one without touching the conversion logic.

use crate::mcd::Attribute;

/// Column names commonly used in lookups; they get an automatic index at
/// the physical stage.
pub const SEARCHED_COLUMNS: &[&str] = &[
    "nom",
    "name",
    "code",
    "email",
    "date_creation",
    "created_at",
    "statut",
    "status",
    "reference",
    "telephone",
];

/// Keyword family marking a column as a likely filter target.
pub const FILTER_FAMILY: &[&str] = &["status", "statut", "etat", "type", "categorie", "category"];

/// Keyword family for monetary amounts.
pub const PRICE_FAMILY: &[&str] = &["prix", "montant", "cout", "price", "amount", "cost", "total"];

/// Keyword family for dates (name-based, independent of declared type).
pub const DATE_FAMILY: &[&str] = &["date", "_at", "jour"];

/// Audit timestamps that legitimately stay TIMESTAMP.
pub const AUDIT_COLUMNS: &[&str] = &[
    "created_at",
    "updated_at",
    "deleted_at",
    "date_creation",
    "date_modification",
];

/// Conceptual attribute that qualifies as a primary-key candidate: named
/// `id`, `code` or `numero`, or described as an identifier.
pub fn is_pk_candidate(attr: &Attribute) -> bool {
    matches!(attr.name.as_str(), "id" | "code" | "numero")
        || attr.description.to_lowercase().contains("identifiant")
}

/// Attribute shaped like a foreign key reference (`*_id`).
pub fn is_fk_shaped(name: &str) -> bool {
    name.len() > 3 && name.ends_with("_id")
}

/// Column worth an automatic index in the physical model.
pub fn is_searched_column(name: &str) -> bool {
    SEARCHED_COLUMNS.contains(&name.to_lowercase().as_str())
}

pub fn is_filter_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTER_FAMILY.iter().any(|kw| lower.contains(kw))
}

pub fn is_price_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    PRICE_FAMILY.iter().any(|kw| lower.contains(kw))
}

pub fn is_date_named(name: &str) -> bool {
    let lower = name.to_lowercase();
    DATE_FAMILY.iter().any(|kw| lower.contains(kw))
}

pub fn is_audit_column(name: &str) -> bool {
    AUDIT_COLUMNS.contains(&name.to_lowercase().as_str())
}

/// Strip an implicit-reference column name down to the entity it points
/// at: `client_id` / `id_client` / `client_code` / `client_ref` ->
/// `client`. Returns `None` when the name has no reference shape.
pub fn referenced_entity(column: &str) -> Option<&str> {
    let lower_len = column.len();
    for suffix in ["_id", "_code", "_ref"] {
        if lower_len > suffix.len() && column.ends_with(suffix) {
            return Some(&column[..lower_len - suffix.len()]);
        }
    }
    if let Some(rest) = column.strip_prefix("id_") {
        if !rest.is_empty() {
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcd::{AttributeType, BaseType};

    fn attr(name: &str, description: &str) -> Attribute {
        let mut a = Attribute::new(name, AttributeType::plain(BaseType::Varchar));
        a.description = description.to_string();
        a
    }

    #[test]
    fn test_pk_candidate() {
        assert!(is_pk_candidate(&attr("id", "")));
        assert!(is_pk_candidate(&attr("numero", "")));
        assert!(is_pk_candidate(&attr("ref", "identifiant unique du client")));
        assert!(!is_pk_candidate(&attr("nom", "nom du client")));
    }

    #[test]
    fn test_fk_shaped() {
        assert!(is_fk_shaped("client_id"));
        assert!(!is_fk_shaped("_id"));
        assert!(!is_fk_shaped("solid"));
    }

    #[test]
    fn test_referenced_entity() {
        assert_eq!(referenced_entity("client_id"), Some("client"));
        assert_eq!(referenced_entity("id_client"), Some("client"));
        assert_eq!(referenced_entity("produit_code"), Some("produit"));
        assert_eq!(referenced_entity("commande_ref"), Some("commande"));
        assert_eq!(referenced_entity("email"), None);
        assert_eq!(referenced_entity("id"), None);
    }

    #[test]
    fn test_families() {
        assert!(is_price_column("montant_total"));
        assert!(is_filter_column("statut"));
        assert!(is_date_named("date_commande"));
        assert!(is_date_named("created_at"));
        assert!(is_audit_column("updated_at"));
        assert!(!is_audit_column("date_commande"));
    }
}
