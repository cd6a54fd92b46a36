//! Markdown MCD parser.
//!
//! Line-oriented grammar: `## Name` opens an entity, `### A <-> B : Assoc`
//! opens an association, `- attr (type)` appends an attribute to whichever
//! is open, `Entity : 0,n` assigns one cardinality side, `**text**` sets
//! the association description. Inheritance is declared in the entity
//! header (`## Client hérite de Personne`) or as a standalone line.
//!
//! Parsing never fails; malformed lines are skipped and recorded as
//! warnings in the outcome.

use crate::mcd::{
    Association, Attribute, AttributeType, BaseType, Cardinality, ConceptualSchema, Entity,
    normalize_entity_name,
};
use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub schema: ConceptualSchema,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Context {
    Idle,
    InEntity(usize),
    InAssociation(usize),
}

struct Patterns {
    inheritance: Regex,
    association: Regex,
    cardinality_line: Regex,
    attr_type: Regex,
    attr_default: Regex,
}

impl Patterns {
    fn new() -> Self {
        Self {
            inheritance: Regex::new(
                r"(?i)(\w+)\s+(?:hérite\s+de|extends|est\s+un|spécialise)\s+(\w+)",
            )
            .unwrap(),
            association: Regex::new(r"(\w+)\s*(?:<->|-|\bet\b)\s*(\w+)\s*:\s*(\w+)").unwrap(),
            cardinality_line: Regex::new(r"^(\w+)\s*:\s*([0-9nN]+\s*,\s*[0-9nN]+)\s*$").unwrap(),
            attr_type: Regex::new(r"^(\w+)\s*(?:\((\w+)(?:\((\d+)(?:\s*,\s*(\d+))?\))?\))?")
                .unwrap(),
            attr_default: Regex::new(r#"(?i)DEFAULT\s+['"]?([^'":]+)['"]?"#).unwrap(),
        }
    }
}

/// Per-call parser state: the explicit FSM cursor plus the schema being
/// built. Nothing survives between `parse` calls.
struct Parser {
    entities: Vec<Entity>,
    associations: Vec<Association>,
    inheritance: Vec<(String, String)>,
    warnings: Vec<String>,
    context: Context,
    patterns: Patterns,
}

/// Parse markdown text into a conceptual schema plus a list of warnings
/// for every line that was skipped.
pub fn parse(text: &str) -> ParseOutcome {
    let mut parser = Parser {
        entities: Vec::new(),
        associations: Vec::new(),
        inheritance: Vec::new(),
        warnings: Vec::new(),
        context: Context::Idle,
        patterns: Patterns::new(),
    };

    for line in text.lines() {
        let line = line.trim();
        if !line.is_empty() {
            parser.line(line);
        }
    }
    parser.copy_inherited_attributes();

    let mut schema = ConceptualSchema {
        entities: parser.entities,
        associations: parser.associations,
        inheritance: parser.inheritance,
        precision: 0.0,
    };
    schema.precision = precision_score(&schema);
    ParseOutcome {
        schema,
        warnings: parser.warnings,
    }
}

/// Equally weighted pass/fail completeness checks, normalized to 0-100.
pub fn precision_score(schema: &ConceptualSchema) -> f32 {
    let mut passed = 0u32;
    let mut total = 0u32;

    for entity in &schema.entities {
        total += 1;
        if !entity.attributes.is_empty() {
            passed += 1;
        }
    }
    for association in &schema.associations {
        // Cardinalities are typed, so this check can only fail before
        // assignment; it is kept for its weight in the score.
        total += 1;
        passed += 1;

        total += 1;
        if schema.has_entity(&association.entity1) && schema.has_entity(&association.entity2) {
            passed += 1;
        }

        total += 1;
        if !association.is_reflexive() {
            passed += 1;
        }
    }
    if !schema.inheritance.is_empty() {
        total += 1;
        passed += 1;
    }
    total += 1;
    if !schema.associations.is_empty() {
        passed += 1;
    }

    if total == 0 {
        return 0.0;
    }
    (100.0 * passed as f32 / total as f32).min(100.0)
}

impl Parser {
    /// One FSM transition per input line.
    fn line(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("## ") {
            if rest.contains("<->") {
                self.association_header(rest);
            } else {
                self.entity_header(rest);
            }
        } else if let Some(rest) = line.strip_prefix("### ") {
            self.association_header(rest);
        } else if let Some(rest) = line.strip_prefix("- ") {
            self.attribute_line(rest);
        } else if line.starts_with("**") && line.ends_with("**") && line.len() > 4 {
            self.description_line(line.trim_matches('*').trim());
        } else if let Some(caps) = self.patterns.cardinality_line.captures(line) {
            let entity = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
            let token = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            self.cardinality_line(&entity, &token);
        } else if self.patterns.inheritance.is_match(line) {
            self.inheritance_line(line);
        }
        // Anything else (titles, prose) is ignored.
    }

    fn entity_header(&mut self, text: &str) {
        // `Child hérite de Parent` in the header both declares the child
        // and records the inheritance edge.
        if let Some(caps) = self.patterns.inheritance.captures(text) {
            let child = normalize_entity_name(&caps[1]);
            let parent = normalize_entity_name(&caps[2]);
            self.ensure_entity(&parent);
            let idx = self.ensure_entity(&child);
            self.entities[idx].parent = Some(parent.clone());
            self.record_inheritance(child, parent);
            self.context = Context::InEntity(idx);
            return;
        }

        let name = normalize_entity_name(text);
        if name.is_empty() {
            self.skip(format!("entity header without a usable name: '{text}'"));
            return;
        }
        let idx = self.ensure_entity(&name);
        self.context = Context::InEntity(idx);
    }

    fn association_header(&mut self, text: &str) {
        let parsed = self.patterns.association.captures(text).map(|caps| {
            (
                normalize_entity_name(&caps[1]),
                normalize_entity_name(&caps[2]),
                caps[3].trim().to_string(),
            )
        });
        let Some((entity1, entity2, name)) = parsed else {
            self.skip(format!("unrecognized association pattern: '{text}'"));
            return;
        };

        self.associations.push(Association {
            name,
            entity1,
            entity2,
            cardinality1: Cardinality::ExactlyOne,
            cardinality2: Cardinality::ExactlyOne,
            description: String::new(),
            attributes: Vec::new(),
        });
        self.context = Context::InAssociation(self.associations.len() - 1);
    }

    fn attribute_line(&mut self, text: &str) {
        let attribute = self.parse_attribute(text);
        match self.context {
            Context::InEntity(idx) => self.entities[idx].attributes.push(attribute),
            Context::InAssociation(idx) => self.associations[idx].attributes.push(attribute),
            Context::Idle => {
                self.skip(format!("attribute outside any entity or association: '{text}'"));
            }
        }
    }

    fn cardinality_line(&mut self, entity: &str, token: &str) {
        let Context::InAssociation(idx) = self.context else {
            self.skip(format!("cardinality line with no open association: '{entity} : {token}'"));
            return;
        };
        let Some(cardinality) = Cardinality::parse(token) else {
            self.skip(format!(
                "invalid cardinality '{token}' for '{entity}' (expected 0,1 | 1,1 | 0,n | 1,n)"
            ));
            return;
        };
        let name = normalize_entity_name(entity);
        let association = &mut self.associations[idx];
        if name == association.entity1 {
            association.cardinality1 = cardinality;
        } else if name == association.entity2 {
            association.cardinality2 = cardinality;
        } else {
            let association = association.name.clone();
            self.skip(format!(
                "cardinality for '{name}' which is not part of association '{association}'"
            ));
        }
    }

    fn description_line(&mut self, text: &str) {
        if let Context::InAssociation(idx) = self.context {
            self.associations[idx].description = text.to_string();
        } else {
            self.skip(format!("description with no open association: '{text}'"));
        }
    }

    fn inheritance_line(&mut self, line: &str) {
        let parsed = self
            .patterns
            .inheritance
            .captures(line)
            .map(|caps| (normalize_entity_name(&caps[1]), normalize_entity_name(&caps[2])));
        let Some((child, parent)) = parsed else {
            return;
        };
        self.ensure_entity(&parent);
        let idx = self.ensure_entity(&child);
        self.entities[idx].parent = Some(parent.clone());
        self.record_inheritance(child, parent);
    }

    fn parse_attribute(&mut self, text: &str) -> Attribute {
        let mut name = String::new();
        let mut typ = AttributeType::plain(BaseType::Varchar);

        if let Some(caps) = self.patterns.attr_type.captures(text) {
            name = caps[1].to_lowercase();
            if let Some(base_token) = caps.get(2) {
                match BaseType::parse(base_token.as_str()) {
                    Some(base) => {
                        typ.base = base;
                        typ.size = caps.get(3).and_then(|m| m.as_str().parse().ok());
                        if let (Some(p), Some(s)) = (typ.size, caps.get(4)) {
                            if let Ok(scale) = s.as_str().parse() {
                                typ.size = None;
                                typ.precision = Some((p, scale));
                            }
                        }
                    }
                    None => {
                        self.skip(format!(
                            "unknown attribute type '{}', defaulting to varchar",
                            base_token.as_str()
                        ));
                    }
                }
            }
        }

        let mut attribute = Attribute::new(&name, typ);
        let upper = text.to_uppercase();
        if upper.contains("NOT NULL") {
            attribute.nullable = false;
        }
        if upper.contains("UNIQUE") {
            attribute.constraints.push("UNIQUE".to_string());
        }
        if let Some(caps) = self.patterns.attr_default.captures(text) {
            attribute.default = Some(caps[1].trim().to_string());
        }
        if let Some(idx) = text.find(" : ") {
            attribute.description = text[idx + 3..].trim().to_string();
        }
        attribute
    }

    fn ensure_entity(&mut self, name: &str) -> usize {
        if let Some(idx) = self.entities.iter().position(|e| e.name == name) {
            idx
        } else {
            self.entities.push(Entity::new(name));
            self.entities.len() - 1
        }
    }

    fn record_inheritance(&mut self, child: String, parent: String) {
        if !self.inheritance.iter().any(|(c, _)| *c == child) {
            self.inheritance.push((child, parent));
        }
    }

    fn skip(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Copy every parent attribute not already present in the child,
    /// tagging its origin. Keys are not synthesized here.
    fn copy_inherited_attributes(&mut self) {
        for (child, parent) in self.inheritance.clone() {
            let Some(parent_idx) = self.entities.iter().position(|e| e.name == parent) else {
                continue;
            };
            let parent_attrs = self.entities[parent_idx].attributes.clone();
            let Some(child_idx) = self.entities.iter().position(|e| e.name == child) else {
                continue;
            };
            for attr in parent_attrs {
                let exists = self.entities[child_idx]
                    .attributes
                    .iter()
                    .any(|a| a.name == attr.name);
                if !exists {
                    let mut inherited = attr;
                    inherited.inherited_from = Some(parent.clone());
                    self.entities[child_idx].attributes.push(inherited);
                }
            }
        }
    }

}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Merise permits reflexive associations; the historical behavior is
    /// to reject them, so that stays the default.
    pub allow_reflexive: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            allow_reflexive: false,
        }
    }
}

/// Structural validation of a parsed schema. Returns human-readable
/// errors; an empty list means the schema is complete enough to convert.
pub fn validate(schema: &ConceptualSchema, options: &ValidateOptions) -> Vec<String> {
    let mut errors = Vec::new();

    if schema.entities.is_empty() {
        errors.push("no entities defined".to_string());
    }
    if schema.associations.is_empty() {
        errors.push("no associations defined".to_string());
    }

    let mut seen_entities: Vec<&str> = Vec::new();
    for entity in &schema.entities {
        if seen_entities.contains(&entity.name.as_str()) {
            errors.push(format!("duplicate entity '{}'", entity.name));
        }
        seen_entities.push(&entity.name);

        let mut seen_attrs: Vec<&str> = Vec::new();
        for attr in &entity.attributes {
            if seen_attrs.contains(&attr.name.as_str()) {
                errors.push(format!(
                    "duplicate attribute '{}' in entity '{}'",
                    attr.name, entity.name
                ));
            }
            seen_attrs.push(&attr.name);
        }
    }

    let mut seen_associations: Vec<&str> = Vec::new();
    for association in &schema.associations {
        if seen_associations.contains(&association.name.as_str()) {
            errors.push(format!("duplicate association '{}'", association.name));
        }
        seen_associations.push(&association.name);

        for entity in [&association.entity1, &association.entity2] {
            if !schema.has_entity(entity) {
                errors.push(format!(
                    "association '{}' references unknown entity '{}'",
                    association.name, entity
                ));
            }
        }
        if association.is_reflexive() && !options.allow_reflexive {
            errors.push(format!(
                "association '{}' links an entity to itself",
                association.name
            ));
        }
        // Only many-to-many associations may carry attributes: the carried
        // columns end up on the junction table and nowhere else.
        if !association.attributes.is_empty() {
            let many = |c: Cardinality| {
                matches!(c, Cardinality::ZeroOrMany | Cardinality::OneOrMany)
            };
            if !(many(association.cardinality1) && many(association.cardinality2)) {
                errors.push(format!(
                    "association '{}' carries attributes but is not many-to-many",
                    association.name
                ));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"# Gestion commerciale

## Client
- nom (varchar) : nom du client
- email (varchar) UNIQUE : adresse email

## Commande
- date_commande (date) : date de commande
- montant (decimal(10,2)) : montant total

### Client <-> Commande : Passe
**Un client peut passer plusieurs commandes**
Client : 1,1
Commande : 0,n
"#;

    #[test]
    fn test_parse_entities_and_attributes() {
        let outcome = parse(SHOP);
        let schema = &outcome.schema;

        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.entities[0].name, "Client");
        assert_eq!(schema.entities[0].attributes.len(), 2);
        assert_eq!(schema.entities[0].attributes[0].name, "nom");
        assert!(schema.entities[0].attributes[1].is_unique());

        let montant = &schema.entities[1].attributes[1];
        assert_eq!(montant.typ.base, BaseType::Decimal);
        assert_eq!(montant.typ.precision, Some((10, 2)));
    }

    #[test]
    fn test_parse_association_cardinalities() {
        let outcome = parse(SHOP);
        let association = &outcome.schema.associations[0];

        assert_eq!(association.name, "Passe");
        assert_eq!(association.entity1, "Client");
        assert_eq!(association.entity2, "Commande");
        assert_eq!(association.cardinality1, Cardinality::ExactlyOne);
        assert_eq!(association.cardinality2, Cardinality::ZeroOrMany);
        assert_eq!(association.description, "Un client peut passer plusieurs commandes");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_invalid_cardinality_is_skipped_with_warning() {
        let text = r#"
## Client
- nom (varchar)

## Commande
- montant (decimal)

### Client <-> Commande : Passe
Client : 2,3
Commande : 0,n
"#;
        let outcome = parse(text);
        let association = &outcome.schema.associations[0];

        // 2,3 never reaches the schema; the side keeps its default.
        assert_eq!(association.cardinality1, Cardinality::ExactlyOne);
        assert_eq!(association.cardinality2, Cardinality::ZeroOrMany);
        assert!(outcome.warnings.iter().any(|w| w.contains("2,3")));
    }

    #[test]
    fn test_inheritance_copies_attributes() {
        let text = r#"
## Personne
- nom (varchar) : nom complet

## Client hérite de Personne
- numero_client (varchar) : identifiant client
"#;
        let outcome = parse(text);
        let schema = &outcome.schema;

        assert_eq!(schema.inheritance, vec![("Client".to_string(), "Personne".to_string())]);
        let client = schema.entity("Client").unwrap();
        assert_eq!(client.parent.as_deref(), Some("Personne"));

        let names: Vec<&str> = client.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["numero_client", "nom"]);
        assert_eq!(client.attributes[1].inherited_from.as_deref(), Some("Personne"));
    }

    #[test]
    fn test_inheritance_creates_unseen_parent() {
        let outcome = parse("## Moto extends Vehicule\n- immatriculation (varchar)\n");
        let schema = &outcome.schema;

        assert!(schema.has_entity("Vehicule"));
        assert!(schema.has_entity("Moto"));
        assert_eq!(schema.inheritance.len(), 1);
    }

    #[test]
    fn test_association_attributes() {
        let text = r#"
## Etudiant
- nom (varchar)

## Cours
- titre (varchar)

### Etudiant <-> Cours : Inscription
- date_inscription (date) : date d'inscription
Etudiant : 0,n
Cours : 0,n
"#;
        let outcome = parse(text);
        let association = &outcome.schema.associations[0];

        assert_eq!(association.attributes.len(), 1);
        assert_eq!(association.attributes[0].name, "date_inscription");
        assert_eq!(association.attributes[0].typ.base, BaseType::Date);
    }

    #[test]
    fn test_attribute_modifiers() {
        let text = "## Produit\n- stock (integer) NOT NULL DEFAULT '0' : quantité en stock\n";
        let outcome = parse(text);
        let attr = &outcome.schema.entities[0].attributes[0];

        assert_eq!(attr.typ.base, BaseType::Integer);
        assert!(!attr.nullable);
        assert_eq!(attr.default.as_deref(), Some("0"));
        assert_eq!(attr.description, "quantité en stock");
    }

    #[test]
    fn test_attribute_outside_context_warns() {
        let outcome = parse("- orphan (varchar)\n");
        assert!(outcome.schema.entities.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_precision_empty_is_zero() {
        let outcome = parse("");
        assert_eq!(outcome.schema.precision, 0.0);
    }

    #[test]
    fn test_precision_monotonic() {
        let bare = parse("## Client\n## Commande\n");
        let with_attrs = parse("## Client\n- nom (varchar)\n## Commande\n- montant (decimal)\n");
        let complete = parse(SHOP);

        assert!(bare.schema.precision < with_attrs.schema.precision);
        assert!(with_attrs.schema.precision < complete.schema.precision);
        assert!(complete.schema.precision <= 100.0);
    }

    #[test]
    fn test_validate_empty_schema() {
        let outcome = parse("");
        let errors = validate(&outcome.schema, &ValidateOptions::default());

        assert!(errors.iter().any(|e| e.contains("no entities")));
        assert!(errors.iter().any(|e| e.contains("no associations")));
    }

    #[test]
    fn test_validate_reflexive_configurable() {
        let text = r#"
## Employe
- nom (varchar)

### Employe <-> Employe : Encadre
Employe : 0,n
"#;
        let outcome = parse(text);

        let strict = validate(&outcome.schema, &ValidateOptions::default());
        assert!(strict.iter().any(|e| e.contains("itself")));

        let relaxed = validate(
            &outcome.schema,
            &ValidateOptions {
                allow_reflexive: true,
            },
        );
        assert!(!relaxed.iter().any(|e| e.contains("itself")));
    }

    #[test]
    fn test_validate_dangling_association() {
        let text = r#"
## Client
- nom (varchar)

### Client <-> Facture : Recoit
Client : 1,1
"#;
        let outcome = parse(text);
        let errors = validate(&outcome.schema, &ValidateOptions::default());

        assert!(errors.iter().any(|e| e.contains("unknown entity 'Facture'")));
    }

    #[test]
    fn test_validate_carried_attributes_require_many_to_many() {
        let text = r#"
## Client
- nom (varchar)

## Commande
- montant (decimal)

### Client <-> Commande : Passe
- note (text)
Client : 1,1
Commande : 0,n
"#;
        let outcome = parse(text);
        let errors = validate(&outcome.schema, &ValidateOptions::default());

        assert!(errors.iter().any(|e| e.contains("not many-to-many")));
    }

    #[test]
    fn test_level_two_header_with_arrow_is_association() {
        let text = r#"
## Auteur
- nom (varchar)

## Livre
- titre (varchar)

## Auteur <-> Livre : Ecrit
Auteur : 1,n
Livre : 0,n
"#;
        let outcome = parse(text);
        assert_eq!(outcome.schema.entities.len(), 2);
        assert_eq!(outcome.schema.associations.len(), 1);
    }
}
