use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Person,
    Org,
    Date,
    Money,
    Gpe,
    Cardinal,
    Product,
    Event,
    Loc,
    Time,
    Other(String),
}

impl EntityCategory {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PERSON" => Self::Person,
            "ORG" => Self::Org,
            "DATE" => Self::Date,
            "MONEY" => Self::Money,
            "GPE" => Self::Gpe,
            "CARDINAL" => Self::Cardinal,
            "PRODUCT" => Self::Product,
            "EVENT" => Self::Event,
            "LOC" => Self::Loc,
            "TIME" => Self::Time,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Date => "DATE",
            Self::Money => "MONEY",
            Self::Gpe => "GPE",
            Self::Cardinal => "CARDINAL",
            Self::Product => "PRODUCT",
            Self::Event => "EVENT",
            Self::Loc => "LOC",
            Self::Time => "TIME",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One extracted entity as delivered by the search backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Identity used by relations to reference this entity. Falls back to the
    /// entity's position in the payload when the backend sends no `id`.
    pub key: String,
    pub text: String,
    pub category: EntityCategory,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub relation: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphPayload {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    /// Edge entries discarded while parsing because they were not well-formed.
    pub malformed_relations: usize,
    /// Message to show instead of a graph, e.g. a backend `error` field.
    pub notice: Option<String>,
}

impl GraphPayload {
    #[cfg(test)]
    pub fn empty_with_notice(notice: impl Into<String>) -> Self {
        Self {
            notice: Some(notice.into()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
