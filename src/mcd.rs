//! Conceptual model (MCD) value types.
//!
//! By Merise convention no key notion exists at this level; primary and
//! foreign keys appear only once the schema is converted to the logical
//! model.

/// Merise cardinality, one per association side.
///
/// The four pairs below are the only legal values; any other token is
/// rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ZeroOrOne,  // 0,1
    ExactlyOne, // 1,1
    ZeroOrMany, // 0,n
    OneOrMany,  // 1,n
}

impl Cardinality {
    /// Parse a `min,max` token, case-insensitive, literal `n`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "0,1" => Some(Self::ZeroOrOne),
            "1,1" => Some(Self::ExactlyOne),
            "0,n" => Some(Self::ZeroOrMany),
            "1,n" => Some(Self::OneOrMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroOrOne => "0,1",
            Self::ExactlyOne => "1,1",
            Self::ZeroOrMany => "0,n",
            Self::OneOrMany => "1,n",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Varchar,
    Char,
    Integer,
    Decimal,
    Date,
    DateTime,
    Boolean,
    Text,
}

impl BaseType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "varchar" | "string" => Some(Self::Varchar),
            "char" => Some(Self::Char),
            "int" | "integer" => Some(Self::Integer),
            "decimal" | "numeric" | "float" => Some(Self::Decimal),
            "date" => Some(Self::Date),
            "datetime" | "timestamp" => Some(Self::DateTime),
            "bool" | "boolean" => Some(Self::Boolean),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Attribute type with optional size (varchar/char) or precision+scale
/// (decimal). Sizes declared in the source survive down to the generated
/// SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub base: BaseType,
    pub size: Option<u32>,
    pub precision: Option<(u32, u32)>,
}

impl AttributeType {
    pub fn plain(base: BaseType) -> Self {
        Self {
            base,
            size: None,
            precision: None,
        }
    }

    pub fn sized(base: BaseType, size: u32) -> Self {
        Self {
            base,
            size: Some(size),
            precision: None,
        }
    }

    pub fn precise(base: BaseType, precision: u32, scale: u32) -> Self {
        Self {
            base,
            size: None,
            precision: Some((precision, scale)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub typ: AttributeType,
    pub nullable: bool,
    pub default: Option<String>,
    /// Free-form constraint tags (e.g. "UNIQUE").
    pub constraints: Vec<String>,
    pub description: String,
    /// Set on attributes copied down from a parent entity.
    pub inherited_from: Option<String>,
}

impl Attribute {
    pub fn new(name: &str, typ: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            typ,
            nullable: true,
            default: None,
            constraints: Vec::new(),
            description: String::new(),
            inherited_from: None,
        }
    }

    pub fn is_unique(&self) -> bool {
        self.constraints.iter().any(|c| c.eq_ignore_ascii_case("unique"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Normalized: alphanumerics only, capitalized.
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub parent: Option<String>,
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            parent: None,
        }
    }
}

/// Binary association between two entities. Associations may carry their
/// own attributes (e.g. an enrollment date on an Inscription).
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub name: String,
    pub entity1: String,
    pub entity2: String,
    pub cardinality1: Cardinality,
    pub cardinality2: Cardinality,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Association {
    pub fn is_reflexive(&self) -> bool {
        self.entity1 == self.entity2
    }
}

/// Parsed conceptual schema. Built once per parse call and never mutated
/// afterwards; entity and association order is first-seen order so that
/// everything derived from it stays deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptualSchema {
    pub entities: Vec<Entity>,
    pub associations: Vec<Association>,
    /// child -> parent pairs, insertion order.
    pub inheritance: Vec<(String, String)>,
    /// Completeness score, 0-100.
    pub precision: f32,
}

impl ConceptualSchema {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }
}

/// Normalize an entity name: strip everything but alphanumerics, then
/// capitalize the first letter.
pub fn normalize_entity_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_parse() {
        assert_eq!(Cardinality::parse("1,1"), Some(Cardinality::ExactlyOne));
        assert_eq!(Cardinality::parse("0,N"), Some(Cardinality::ZeroOrMany));
        assert_eq!(Cardinality::parse(" 1,n "), Some(Cardinality::OneOrMany));
        assert_eq!(Cardinality::parse("2,3"), None);
        assert_eq!(Cardinality::parse("n,n"), None);
        assert_eq!(Cardinality::parse(""), None);
    }

    #[test]
    fn test_cardinality_round_trip() {
        for card in [
            Cardinality::ZeroOrOne,
            Cardinality::ExactlyOne,
            Cardinality::ZeroOrMany,
            Cardinality::OneOrMany,
        ] {
            assert_eq!(Cardinality::parse(card.as_str()), Some(card));
        }
    }

    #[test]
    fn test_normalize_entity_name() {
        assert_eq!(normalize_entity_name("client"), "Client");
        assert_eq!(normalize_entity_name("Commande !"), "Commande");
        assert_eq!(normalize_entity_name("LIGNE_COMMANDE"), "Lignecommande");
    }

    #[test]
    fn test_base_type_parse() {
        assert_eq!(BaseType::parse("varchar"), Some(BaseType::Varchar));
        assert_eq!(BaseType::parse("DATETIME"), Some(BaseType::DateTime));
        assert_eq!(BaseType::parse("blob"), None);
    }
}
