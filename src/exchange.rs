//! Canvas/API exchange format.
//!
//! The diagram canvas and the HTTP layer speak a flat JSON shape:
//! entities with typed attributes, associations with a per-entity
//! cardinality map, inheritance as parent/child pairs. This module only
//! translates that shape into and out of [`ConceptualSchema`]; transport
//! and storage live elsewhere.

use crate::heuristics;
use crate::logical::sql_type;
use crate::markdown;
use crate::mcd::{
    Association, Attribute, AttributeType, BaseType, Cardinality, ConceptualSchema, Entity,
    normalize_entity_name,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSchema {
    pub entities: Vec<ExchangeEntity>,
    #[serde(default)]
    pub associations: Vec<ExchangeAssociation>,
    #[serde(default)]
    pub inheritance: Vec<ExchangeInheritance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEntity {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<ExchangeAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeAssociation {
    pub name: String,
    /// Exactly two entries for the supported binary case.
    pub entities: Vec<String>,
    /// entity name -> "min,max" token.
    #[serde(default)]
    pub cardinalities: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInheritance {
    pub parent: String,
    pub child: String,
}

impl ExchangeSchema {
    pub fn from_conceptual(schema: &ConceptualSchema) -> Self {
        let entities = schema
            .entities
            .iter()
            .map(|entity| ExchangeEntity {
                name: entity.name.clone(),
                attributes: entity
                    .attributes
                    .iter()
                    .map(|attr| ExchangeAttribute {
                        name: attr.name.clone(),
                        typ: sql_type(&attr.typ),
                        is_primary_key: heuristics::is_pk_candidate(attr),
                        description: attr.description.clone(),
                    })
                    .collect(),
            })
            .collect();

        let associations = schema
            .associations
            .iter()
            .map(|association| {
                let mut cardinalities = BTreeMap::new();
                cardinalities.insert(
                    association.entity1.clone(),
                    association.cardinality1.as_str().to_string(),
                );
                cardinalities.insert(
                    association.entity2.clone(),
                    association.cardinality2.as_str().to_string(),
                );
                ExchangeAssociation {
                    name: association.name.clone(),
                    entities: vec![association.entity1.clone(), association.entity2.clone()],
                    cardinalities,
                }
            })
            .collect();

        let inheritance = schema
            .inheritance
            .iter()
            .map(|(child, parent)| ExchangeInheritance {
                parent: parent.clone(),
                child: child.clone(),
            })
            .collect();

        Self {
            entities,
            associations,
            inheritance,
        }
    }

    pub fn into_conceptual(self) -> ConceptualSchema {
        let mut entities: Vec<Entity> = Vec::new();
        for exchange_entity in self.entities {
            let mut entity = Entity::new(&normalize_entity_name(&exchange_entity.name));
            for attr in exchange_entity.attributes {
                let mut attribute = Attribute::new(&attr.name, parse_type_string(&attr.typ));
                attribute.description = attr.description;
                entity.attributes.push(attribute);
            }
            entities.push(entity);
        }

        let mut associations = Vec::new();
        for assoc in &self.associations {
            if assoc.entities.len() < 2 {
                continue;
            }
            let entity1 = normalize_entity_name(&assoc.entities[0]);
            let entity2 = normalize_entity_name(&assoc.entities[1]);
            let side = |raw: &str, name: &str, fallback: Cardinality| {
                assoc
                    .cardinalities
                    .get(raw)
                    .or_else(|| assoc.cardinalities.get(name))
                    .and_then(|token| Cardinality::parse(token))
                    .unwrap_or(fallback)
            };
            associations.push(Association {
                name: assoc.name.clone(),
                entity1: entity1.clone(),
                entity2: entity2.clone(),
                cardinality1: side(&assoc.entities[0], &entity1, Cardinality::ExactlyOne),
                cardinality2: side(&assoc.entities[1], &entity2, Cardinality::ZeroOrMany),
                description: String::new(),
                attributes: Vec::new(),
            });
        }

        let mut inheritance = Vec::new();
        for link in &self.inheritance {
            let child = normalize_entity_name(&link.child);
            let parent = normalize_entity_name(&link.parent);
            if let Some(entity) = entities.iter_mut().find(|e| e.name == child) {
                entity.parent = Some(parent.clone());
            }
            inheritance.push((child, parent));
        }

        let mut schema = ConceptualSchema {
            entities,
            associations,
            inheritance,
            precision: 0.0,
        };
        schema.precision = markdown::precision_score(&schema);
        schema
    }
}

/// Parse a canvas type string (`VARCHAR(50)`, `DECIMAL(10,2)`,
/// `INTEGER`, ...) back into an attribute type. Unknown names fall back
/// to plain varchar.
fn parse_type_string(s: &str) -> AttributeType {
    let trimmed = s.trim();
    let (name, args) = match trimmed.find('(') {
        Some(open) => {
            let name = &trimmed[..open];
            let args = trimmed[open + 1..].trim_end_matches(')');
            (name, Some(args))
        }
        None => (trimmed, None),
    };

    let base = BaseType::parse(name).unwrap_or(BaseType::Varchar);
    let mut typ = AttributeType::plain(base);
    if let Some(args) = args {
        let parts: Vec<u32> = args
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        match parts.as_slice() {
            [size] => typ.size = Some(*size),
            [precision, scale] => typ.precision = Some((*precision, *scale)),
            _ => {}
        }
    }
    typ
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_json() {
        let text = r#"
## Client
- nom (varchar(100)) : nom du client

## Commande
- montant (decimal(10,2))

### Client <-> Commande : Passe
Client : 1,1
Commande : 0,n
"#;
        let schema = markdown::parse(text).schema;
        let exchange = ExchangeSchema::from_conceptual(&schema);
        let json = serde_json::to_string(&exchange).unwrap();
        let back: ExchangeSchema = serde_json::from_str(&json).unwrap();
        let conceptual = back.into_conceptual();

        assert_eq!(conceptual.entities.len(), 2);
        assert_eq!(conceptual.entities[0].attributes[0].typ.size, Some(100));
        let association = &conceptual.associations[0];
        assert_eq!(association.cardinality1, Cardinality::ExactlyOne);
        assert_eq!(association.cardinality2, Cardinality::ZeroOrMany);
    }

    #[test]
    fn test_parse_type_string() {
        assert_eq!(parse_type_string("VARCHAR(50)").size, Some(50));
        assert_eq!(parse_type_string("DECIMAL(10,2)").precision, Some((10, 2)));
        assert_eq!(parse_type_string("INTEGER").base, BaseType::Integer);
        assert_eq!(parse_type_string("mystery").base, BaseType::Varchar);
    }

    #[test]
    fn test_inheritance_links() {
        let json = r#"{
            "entities": [
                {"name": "Personne", "attributes": [{"name": "nom", "type": "VARCHAR(255)"}]},
                {"name": "Client", "attributes": []}
            ],
            "associations": [],
            "inheritance": [{"parent": "Personne", "child": "Client"}]
        }"#;
        let exchange: ExchangeSchema = serde_json::from_str(json).unwrap();
        let schema = exchange.into_conceptual();

        assert_eq!(schema.inheritance, vec![("Client".to_string(), "Personne".to_string())]);
        assert_eq!(schema.entity("Client").unwrap().parent.as_deref(), Some("Personne"));
    }

    #[test]
    fn test_missing_cardinalities_use_defaults() {
        let json = r#"{
            "entities": [
                {"name": "A", "attributes": []},
                {"name": "B", "attributes": []}
            ],
            "associations": [{"name": "Lie", "entities": ["A", "B"]}]
        }"#;
        let exchange: ExchangeSchema = serde_json::from_str(json).unwrap();
        let schema = exchange.into_conceptual();
        let association = &schema.associations[0];

        assert_eq!(association.cardinality1, Cardinality::ExactlyOne);
        assert_eq!(association.cardinality2, Cardinality::ZeroOrMany);
    }
}
