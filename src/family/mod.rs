//! Family data model: people, typed relations, and the snapshot that the
//! entity store exposes to collaborators.
//!
//! Person ids are normalized to `i64` at this boundary. Anything that arrives
//! as text (URL params, CLI args, loosely typed JSON) goes through
//! [`parse_person_id`] so the traversal code never compares ids of different
//! representations.

mod store;

pub use store::FamilyStore;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{KinshipError, Result};

/// Canonical person identifier.
pub type PersonId = i64;

/// Parse a person id from its textual form (`"42"`, `" 42 "`).
pub fn parse_person_id(raw: &str) -> Result<PersonId> {
    raw.trim()
        .parse::<PersonId>()
        .map_err(|_| KinshipError::InvalidInput(format!("invalid person id: {:?}", raw)))
}

/// Accepts `42` as well as `"42"`.
fn deserialize_person_id<'de, D>(deserializer: D) -> std::result::Result<PersonId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(PersonId),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => parse_person_id(&text).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "M" | "m" => Ok(Gender::Male),
            "F" | "f" => Ok(Gender::Female),
            other => Err(KinshipError::InvalidInput(format!(
                "invalid gender {:?} (expected M or F)",
                other
            ))),
        }
    }
}

/// A person in the family graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(deserialize_with = "deserialize_person_id")]
    pub id: PersonId,
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(alias = "genre")]
    pub gender: Gender,
    #[serde(default, alias = "dateNaissance")]
    pub birth_date: String,
    /// Opaque photo handle (URL, blob key); never interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Input for creating a person; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(alias = "genre")]
    pub gender: Gender,
    #[serde(default, alias = "dateNaissance")]
    pub birth_date: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>, gender: Gender, birth_date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gender,
            birth_date: birth_date.into(),
            photo: None,
            details: None,
        }
    }

    pub(crate) fn into_person(self, id: PersonId) -> Person {
        Person {
            id,
            name: self.name,
            gender: self.gender,
            birth_date: self.birth_date,
            photo: self.photo,
            details: self.details,
        }
    }
}

/// Partial update; only supplied fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl PersonUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.birth_date.is_none()
            && self.photo.is_none()
            && self.details.is_none()
    }
}

/// Relation type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    /// Symmetric marriage bond.
    Spouse,
    /// `from` is the parent, `to` is the child.
    Child,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Spouse => "spouse",
            RelationType::Child => "child",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spouse" => Ok(RelationType::Spouse),
            "child" => Ok(RelationType::Child),
            other => Err(KinshipError::InvalidInput(format!(
                "invalid relation type {:?} (expected spouse or child)",
                other
            ))),
        }
    }
}

/// A typed edge between two people (from --type--> to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    #[serde(alias = "from_person", deserialize_with = "deserialize_person_id")]
    pub from: PersonId,
    #[serde(alias = "to_person", deserialize_with = "deserialize_person_id")]
    pub to: PersonId,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
}

impl Relation {
    pub fn new(from: PersonId, to: PersonId, relation_type: RelationType) -> Self {
        Self { from, to, relation_type }
    }

    pub fn spouse(a: PersonId, b: PersonId) -> Self {
        Self::new(a, b, RelationType::Spouse)
    }

    pub fn child(parent: PersonId, child: PersonId) -> Self {
        Self::new(parent, child, RelationType::Child)
    }

    /// True if `id` is either endpoint.
    pub fn touches(&self, id: PersonId) -> bool {
        self.from == id || self.to == id
    }
}

/// Full dump of people and relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    #[serde(alias = "nodes")]
    pub people: Vec<Person>,
    #[serde(alias = "links")]
    pub relations: Vec<Relation>,
    /// Next id the store will assign. Absent in hand-written files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_person_id: Option<PersonId>,
}

impl FamilySnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_person_id() {
        assert_eq!(parse_person_id("42").unwrap(), 42);
        assert_eq!(parse_person_id(" 7 ").unwrap(), 7);
        assert!(matches!(
            parse_person_id("abc"),
            Err(KinshipError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_relation_accepts_string_and_numeric_ids() {
        let rel: Relation =
            serde_json::from_str(r#"{"from": "1", "to": 2, "type": "child"}"#).unwrap();
        assert_eq!(rel, Relation::child(1, 2));

        let rel: Relation =
            serde_json::from_str(r#"{"from_person": 3, "to_person": "4", "type": "spouse"}"#)
                .unwrap();
        assert_eq!(rel, Relation::spouse(3, 4));
    }

    #[test]
    fn test_relation_serializes_type_tag() {
        let json = serde_json::to_string(&Relation::child(1, 3)).unwrap();
        assert_eq!(json, r#"{"from":1,"to":3,"type":"child"}"#);
    }

    #[test]
    fn test_snapshot_accepts_nodes_links_aliases() {
        let json = r#"{
            "nodes": [{"id": "1", "name": "A", "gender": "F", "birth_date": "1950-01-01"}],
            "links": []
        }"#;
        let snapshot = FamilySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.people.len(), 1);
        assert_eq!(snapshot.people[0].id, 1);
        assert_eq!(snapshot.people[0].gender, Gender::Female);
        assert!(snapshot.people[0].photo.is_none());
        assert_eq!(snapshot.next_person_id, None);
    }

    #[test]
    fn test_snapshot_carries_next_person_id() {
        let json = r#"{"people": [], "relations": [], "next_person_id": 9}"#;
        let snapshot = FamilySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.next_person_id, Some(9));
        assert!(snapshot.to_json_pretty().unwrap().contains("\"next_person_id\": 9"));
    }

    #[test]
    fn test_person_accepts_legacy_field_names() {
        let json = r#"{"id": 5, "nom": "Awa", "genre": "F", "dateNaissance": "1990-02-03"}"#;
        let person: Person = serde_json::from_str(json).unwrap();
        assert_eq!(person.name, "Awa");
        assert_eq!(person.birth_date, "1990-02-03");
    }

    #[test]
    fn test_relation_type_from_str() {
        assert_eq!("Spouse".parse::<RelationType>().unwrap(), RelationType::Spouse);
        assert_eq!("child".parse::<RelationType>().unwrap(), RelationType::Child);
        assert!("sibling".parse::<RelationType>().is_err());
    }

    #[test]
    fn test_update_is_empty() {
        assert!(PersonUpdate::default().is_empty());
        let update = PersonUpdate {
            details: Some("x".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
