//! Entity store: the single source of truth for people and relations.
//!
//! Every mutation validates before it touches any state, so a rejected call
//! leaves the store exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use super::{FamilySnapshot, NewPerson, Person, PersonId, PersonUpdate, Relation, RelationType};
use crate::{KinshipError, Result};

/// Maximum number of `child` relations pointing at the same person.
pub const MAX_PARENTS: usize = 2;

#[derive(Debug, Clone)]
pub struct FamilyStore {
    people: BTreeMap<PersonId, Person>,
    relations: Vec<Relation>,
    next_id: PersonId,
    revision: u64,
}

impl Default for FamilyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FamilyStore {
    pub fn new() -> Self {
        Self {
            people: BTreeMap::new(),
            relations: Vec::new(),
            next_id: 1,
            revision: 0,
        }
    }

    /// Restore a store from a snapshot, re-checking every invariant.
    ///
    /// People keep their ids. The next assigned id is the larger of the
    /// recorded high-water mark and one past the largest id present.
    pub fn from_snapshot(snapshot: FamilySnapshot) -> Result<Self> {
        let mut store = Self::new();

        for person in snapshot.people {
            validate_name(&person.name)?;
            if person.id <= 0 {
                return Err(KinshipError::InvalidInput(format!(
                    "person id {} must be positive",
                    person.id
                )));
            }
            if store.people.contains_key(&person.id) {
                return Err(KinshipError::InvalidInput(format!(
                    "duplicate person id {} in snapshot",
                    person.id
                )));
            }
            let after = person.id.checked_add(1).ok_or_else(|| {
                KinshipError::InvalidInput(format!("person id {} leaves no room for new ids", person.id))
            })?;
            store.next_id = store.next_id.max(after);
            store.people.insert(person.id, person);
        }

        if let Some(next) = snapshot.next_person_id {
            if next <= 0 {
                return Err(KinshipError::InvalidInput(format!(
                    "next person id {} must be positive",
                    next
                )));
            }
            store.next_id = store.next_id.max(next);
        }

        for relation in snapshot.relations {
            store.validate_relation(&relation)?;
            store.relations.push(relation);
        }

        log::info!(
            "Restored family store: {} people, {} relations",
            store.people.len(),
            store.relations.len()
        );
        Ok(store)
    }

    /// Monotonic counter bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.people.contains_key(&id)
    }

    /// People in ascending id order.
    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    /// Relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn snapshot(&self) -> FamilySnapshot {
        FamilySnapshot {
            people: self.people.values().cloned().collect(),
            relations: self.relations.clone(),
            next_person_id: Some(self.next_id),
        }
    }

    pub fn add_person(&mut self, data: NewPerson) -> Result<Person> {
        validate_name(&data.name)?;
        let id = self.allocate_id()?;
        let person = data.into_person(id);
        self.people.insert(id, person.clone());
        self.bump();
        log::info!("Added person {} ({})", id, person.name);
        Ok(person)
    }

    pub fn update_person(&mut self, id: PersonId, update: PersonUpdate) -> Result<Person> {
        if let Some(ref name) = update.name {
            validate_name(name)?;
        }
        let person = self
            .people
            .get_mut(&id)
            .ok_or_else(|| KinshipError::NotFound(format!("person {}", id)))?;

        if let Some(name) = update.name {
            person.name = name;
        }
        if let Some(gender) = update.gender {
            person.gender = gender;
        }
        if let Some(birth_date) = update.birth_date {
            person.birth_date = birth_date;
        }
        if let Some(photo) = update.photo {
            person.photo = Some(photo);
        }
        if let Some(details) = update.details {
            person.details = Some(details);
        }

        let updated = person.clone();
        self.bump();
        log::info!("Updated person {}", id);
        Ok(updated)
    }

    /// Remove a person and every relation referencing them.
    pub fn remove_person(&mut self, id: PersonId) -> Result<Person> {
        let person = self
            .people
            .remove(&id)
            .ok_or_else(|| KinshipError::NotFound(format!("person {}", id)))?;

        let before = self.relations.len();
        self.relations.retain(|r| !r.touches(id));
        let dropped = before - self.relations.len();

        self.bump();
        log::info!("Removed person {} and {} relation(s)", id, dropped);
        Ok(person)
    }

    pub fn add_relation(
        &mut self,
        from: PersonId,
        to: PersonId,
        relation_type: RelationType,
    ) -> Result<Relation> {
        let relation = Relation::new(from, to, relation_type);
        self.validate_relation(&relation)?;
        self.relations.push(relation);
        self.bump();
        log::info!("Added relation {} -> {} ({})", from, to, relation_type);
        Ok(relation)
    }

    /// Remove a relation. Spouse relations match in either direction.
    pub fn remove_relation(
        &mut self,
        from: PersonId,
        to: PersonId,
        relation_type: RelationType,
    ) -> Result<()> {
        let wanted = Relation::new(from, to, relation_type);
        let position = self
            .relations
            .iter()
            .position(|r| same_relation(r, &wanted))
            .ok_or_else(|| {
                KinshipError::NotFound(format!("relation {} -> {} ({})", from, to, relation_type))
            })?;

        self.relations.remove(position);
        self.bump();
        log::info!("Removed relation {} -> {} ({})", from, to, relation_type);
        Ok(())
    }

    /// Create a person married to `spouse_of`.
    pub fn add_spouse(&mut self, data: NewPerson, spouse_of: PersonId) -> Result<(Person, Relation)> {
        validate_name(&data.name)?;
        if !self.contains(spouse_of) {
            return Err(KinshipError::NotFound(format!("person {}", spouse_of)));
        }

        let person = self.add_person(data)?;
        let relation = Relation::spouse(spouse_of, person.id);
        self.relations.push(relation);
        self.bump();
        log::info!("Added spouse {} for person {}", person.id, spouse_of);
        Ok((person, relation))
    }

    /// Create a child of one or two existing parents.
    pub fn add_child(
        &mut self,
        data: NewPerson,
        parent_ids: &[PersonId],
    ) -> Result<(Person, Vec<Relation>)> {
        validate_name(&data.name)?;
        if parent_ids.is_empty() || parent_ids.len() > MAX_PARENTS {
            return Err(KinshipError::InvalidInput(format!(
                "a child needs 1 to {} parents, got {}",
                MAX_PARENTS,
                parent_ids.len()
            )));
        }
        let distinct: BTreeSet<PersonId> = parent_ids.iter().copied().collect();
        if distinct.len() != parent_ids.len() {
            return Err(KinshipError::InvalidInput(
                "parent ids must be distinct".to_string(),
            ));
        }
        if let Some(missing) = parent_ids.iter().find(|id| !self.contains(**id)) {
            return Err(KinshipError::NotFound(format!("person {}", missing)));
        }

        let person = self.add_person(data)?;
        let relations: Vec<Relation> = parent_ids
            .iter()
            .map(|&parent| Relation::child(parent, person.id))
            .collect();
        self.relations.extend(relations.iter().copied());
        self.bump();
        log::info!("Added child {} of {:?}", person.id, parent_ids);
        Ok((person, relations))
    }

    pub fn parents_of(&self, id: PersonId) -> Result<Vec<&Person>> {
        self.require(id)?;
        Ok(self.resolve(
            self.relations
                .iter()
                .filter(|r| r.relation_type == RelationType::Child && r.to == id)
                .map(|r| r.from),
        ))
    }

    pub fn children_of(&self, id: PersonId) -> Result<Vec<&Person>> {
        self.require(id)?;
        Ok(self.resolve(
            self.relations
                .iter()
                .filter(|r| r.relation_type == RelationType::Child && r.from == id)
                .map(|r| r.to),
        ))
    }

    pub fn spouses_of(&self, id: PersonId) -> Result<Vec<&Person>> {
        self.require(id)?;
        Ok(self.resolve(
            self.relations
                .iter()
                .filter(|r| r.relation_type == RelationType::Spouse && r.touches(id))
                .map(|r| if r.from == id { r.to } else { r.from }),
        ))
    }

    /// People sharing at least one parent with `id`. Siblinghood is derived,
    /// never stored.
    pub fn siblings_of(&self, id: PersonId) -> Result<Vec<&Person>> {
        self.require(id)?;
        let parents: BTreeSet<PersonId> = self
            .relations
            .iter()
            .filter(|r| r.relation_type == RelationType::Child && r.to == id)
            .map(|r| r.from)
            .collect();

        Ok(self.resolve(
            self.relations
                .iter()
                .filter(|r| {
                    r.relation_type == RelationType::Child
                        && parents.contains(&r.from)
                        && r.to != id
                })
                .map(|r| r.to),
        ))
    }

    pub fn is_married(&self, a: PersonId, b: PersonId) -> bool {
        self.relations
            .iter()
            .any(|r| same_relation(r, &Relation::spouse(a, b)))
    }

    /// Case-insensitive substring search on display names.
    pub fn search_people(&self, query: &str) -> Vec<&Person> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.people
            .values()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect()
    }

    fn validate_relation(&self, relation: &Relation) -> Result<()> {
        let Relation { from, to, relation_type } = *relation;

        if !self.contains(from) || !self.contains(to) {
            return Err(KinshipError::InvalidEndpoint { from, to });
        }
        if from == to {
            return Err(KinshipError::SelfRelation(from));
        }
        if self.relations.iter().any(|r| same_relation(r, relation)) {
            return Err(KinshipError::DuplicateRelation { from, to, relation_type });
        }
        if relation_type == RelationType::Child {
            let parents = self
                .relations
                .iter()
                .filter(|r| r.relation_type == RelationType::Child && r.to == to)
                .count();
            if parents >= MAX_PARENTS {
                return Err(KinshipError::TooManyParents(to));
            }
        }
        Ok(())
    }

    fn require(&self, id: PersonId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(KinshipError::UnknownPerson(id))
        }
    }

    /// Dedupe, sort by id, and look up people.
    fn resolve(&self, ids: impl Iterator<Item = PersonId>) -> Vec<&Person> {
        let ids: BTreeSet<PersonId> = ids.collect();
        ids.into_iter().filter_map(|id| self.people.get(&id)).collect()
    }

    fn allocate_id(&mut self) -> Result<PersonId> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| KinshipError::InvalidInput("person id space exhausted".to_string()))?;
        Ok(id)
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

/// Equality on (from, to, type), with spouse relations compared unordered.
fn same_relation(a: &Relation, b: &Relation) -> bool {
    if a.relation_type != b.relation_type {
        return false;
    }
    match a.relation_type {
        RelationType::Spouse => {
            (a.from == b.from && a.to == b.to) || (a.from == b.to && a.to == b.from)
        }
        RelationType::Child => a.from == b.from && a.to == b.to,
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(KinshipError::InvalidInput("person name is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Gender;

    fn person(name: &str) -> NewPerson {
        NewPerson::new(name, Gender::Male, "1970-01-01")
    }

    /// 1 and 2 are married parents of 3 and 4.
    fn sample_store() -> FamilyStore {
        let mut store = FamilyStore::new();
        for name in ["A", "B", "C", "D"] {
            store.add_person(person(name)).unwrap();
        }
        store.add_relation(1, 2, RelationType::Spouse).unwrap();
        store.add_relation(1, 3, RelationType::Child).unwrap();
        store.add_relation(1, 4, RelationType::Child).unwrap();
        store.add_relation(2, 3, RelationType::Child).unwrap();
        store.add_relation(2, 4, RelationType::Child).unwrap();
        store
    }

    fn ids(people: Vec<&Person>) -> Vec<PersonId> {
        people.into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_add_person_assigns_monotonic_ids() {
        let mut store = FamilyStore::new();
        let a = store.add_person(person("A")).unwrap();
        let b = store.add_person(person("B")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        store.remove_person(b.id).unwrap();
        let c = store.add_person(person("C")).unwrap();
        assert_eq!(c.id, 3, "ids are never reused");
    }

    #[test]
    fn test_add_person_requires_name() {
        let mut store = FamilyStore::new();
        let err = store.add_person(person("   ")).unwrap_err();
        assert!(matches!(err, KinshipError::InvalidInput(_)));
        assert_eq!(store.person_count(), 0);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_update_person_applies_only_supplied_fields() {
        let mut store = sample_store();
        let updated = store
            .update_person(
                3,
                PersonUpdate {
                    details: Some("eldest".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, 3);
        assert_eq!(updated.name, "C");
        assert_eq!(updated.details.as_deref(), Some("eldest"));
    }

    #[test]
    fn test_update_unknown_person() {
        let mut store = sample_store();
        let err = store.update_person(99, PersonUpdate::default()).unwrap_err();
        assert!(matches!(err, KinshipError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_relation_rejected() {
        let mut store = sample_store();
        let before = store.relation_count();
        let err = store.add_relation(1, 3, RelationType::Child).unwrap_err();
        assert!(matches!(err, KinshipError::DuplicateRelation { .. }));
        assert_eq!(store.relation_count(), before);
    }

    #[test]
    fn test_reversed_spouse_is_duplicate() {
        let mut store = sample_store();
        let err = store.add_relation(2, 1, RelationType::Spouse).unwrap_err();
        assert!(matches!(err, KinshipError::DuplicateRelation { .. }));
    }

    #[test]
    fn test_self_relation_rejected() {
        let mut store = sample_store();
        let err = store.add_relation(3, 3, RelationType::Spouse).unwrap_err();
        assert!(matches!(err, KinshipError::SelfRelation(3)));
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let mut store = sample_store();
        let err = store.add_relation(1, 42, RelationType::Child).unwrap_err();
        assert!(matches!(err, KinshipError::InvalidEndpoint { from: 1, to: 42 }));
    }

    #[test]
    fn test_third_parent_rejected() {
        let mut store = sample_store();
        let e = store.add_person(person("E")).unwrap();
        let revision = store.revision();
        let err = store.add_relation(e.id, 3, RelationType::Child).unwrap_err();
        assert!(matches!(err, KinshipError::TooManyParents(3)));
        assert_eq!(store.revision(), revision);
        assert_eq!(store.relation_count(), 5);
    }

    #[test]
    fn test_remove_person_cascades() {
        let mut store = sample_store();
        store.remove_person(2).unwrap();
        assert_eq!(store.relation_count(), 2);
        assert!(store.relations().iter().all(|r| !r.touches(2)));
        assert_eq!(
            store.relations(),
            &[Relation::child(1, 3), Relation::child(1, 4)]
        );
    }

    #[test]
    fn test_remove_unknown_person() {
        let mut store = sample_store();
        assert!(matches!(store.remove_person(9), Err(KinshipError::NotFound(_))));
    }

    #[test]
    fn test_remove_relation() {
        let mut store = sample_store();
        store.remove_relation(2, 1, RelationType::Spouse).unwrap();
        assert!(!store.is_married(1, 2));
        let err = store.remove_relation(1, 2, RelationType::Spouse).unwrap_err();
        assert!(matches!(err, KinshipError::NotFound(_)));
        let err = store.remove_relation(3, 1, RelationType::Child).unwrap_err();
        assert!(matches!(err, KinshipError::NotFound(_)));
    }

    #[test]
    fn test_add_spouse_is_atomic() {
        let mut store = sample_store();
        let err = store.add_spouse(person("X"), 77).unwrap_err();
        assert!(matches!(err, KinshipError::NotFound(_)));
        assert_eq!(store.person_count(), 4);

        let (spouse, relation) = store.add_spouse(person("E"), 3).unwrap();
        assert_eq!(relation, Relation::spouse(3, spouse.id));
        assert!(store.is_married(spouse.id, 3));
    }

    #[test]
    fn test_add_child_validates_parents() {
        let mut store = sample_store();
        assert!(matches!(
            store.add_child(person("X"), &[]),
            Err(KinshipError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_child(person("X"), &[1, 2, 3]),
            Err(KinshipError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_child(person("X"), &[1, 1]),
            Err(KinshipError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_child(person("X"), &[1, 50]),
            Err(KinshipError::NotFound(_))
        ));
        assert_eq!(store.person_count(), 4);

        let (child, relations) = store.add_child(person("E"), &[1, 2]).unwrap();
        assert_eq!(relations.len(), 2);
        assert_eq!(ids(store.parents_of(child.id).unwrap()), vec![1, 2]);
    }

    #[test]
    fn test_derived_queries() {
        let store = sample_store();
        assert_eq!(ids(store.children_of(1).unwrap()), vec![3, 4]);
        assert_eq!(ids(store.parents_of(4).unwrap()), vec![1, 2]);
        assert_eq!(ids(store.spouses_of(2).unwrap()), vec![1]);
        assert_eq!(ids(store.siblings_of(3).unwrap()), vec![4]);
        assert!(store.siblings_of(1).unwrap().is_empty());
        assert!(store.is_married(2, 1));
        assert!(!store.is_married(3, 4));
        assert!(matches!(store.siblings_of(8), Err(KinshipError::UnknownPerson(8))));
    }

    #[test]
    fn test_search_people() {
        let mut store = FamilyStore::new();
        store.add_person(person("Marie Curie")).unwrap();
        store.add_person(person("Pierre Curie")).unwrap();
        store.add_person(person("Irène")).unwrap();
        assert_eq!(ids(store.search_people("curie")), vec![1, 2]);
        assert_eq!(ids(store.search_people("IRÈNE")), vec![3]);
        assert!(store.search_people("  ").is_empty());
    }

    #[test]
    fn test_snapshot_restore_keeps_ids() {
        let mut store = sample_store();
        store.remove_person(1).unwrap();
        let restored = FamilyStore::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(restored.person_count(), 3);
        assert_eq!(restored.relations(), store.relations());

        let mut restored = restored;
        let next = restored.add_person(person("E")).unwrap();
        assert_eq!(next.id, 5);
    }

    #[test]
    fn test_snapshot_restore_never_reuses_removed_max_id() {
        let mut store = FamilyStore::new();
        store.add_person(person("A")).unwrap();
        let b = store.add_person(person("B")).unwrap();
        store.remove_person(b.id).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.next_person_id, Some(3));

        let mut restored = FamilyStore::from_snapshot(snapshot).unwrap();
        let c = restored.add_person(person("C")).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_snapshot_restore_without_high_water_mark() {
        let mut snapshot = sample_store().snapshot();
        snapshot.next_person_id = None;
        let mut restored = FamilyStore::from_snapshot(snapshot).unwrap();
        assert_eq!(restored.add_person(person("E")).unwrap().id, 5);

        // A stale mark never drags the counter below the ids present.
        let mut snapshot = sample_store().snapshot();
        snapshot.next_person_id = Some(2);
        let mut restored = FamilyStore::from_snapshot(snapshot).unwrap();
        assert_eq!(restored.add_person(person("E")).unwrap().id, 5);
    }

    #[test]
    fn test_snapshot_restore_rejects_out_of_range_ids() {
        for id in [0, -3, i64::MAX] {
            let snapshot = FamilySnapshot {
                people: vec![person("A").into_person(id)],
                ..Default::default()
            };
            let err = FamilyStore::from_snapshot(snapshot).unwrap_err();
            assert!(matches!(err, KinshipError::InvalidInput(_)), "id {}", id);
        }

        let snapshot = FamilySnapshot {
            next_person_id: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            FamilyStore::from_snapshot(snapshot),
            Err(KinshipError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_add_person_fails_cleanly_when_ids_run_out() {
        let snapshot = FamilySnapshot {
            people: vec![person("Old").into_person(1)],
            relations: Vec::new(),
            next_person_id: Some(i64::MAX),
        };
        let mut store = FamilyStore::from_snapshot(snapshot).unwrap();
        let revision = store.revision();

        let err = store.add_person(person("New")).unwrap_err();
        assert!(matches!(err, KinshipError::InvalidInput(_)));
        assert_eq!(store.person_count(), 1);
        assert_eq!(store.person(1).unwrap().name, "Old");
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_snapshot_restore_rejects_dangling_relation() {
        let mut snapshot = sample_store().snapshot();
        snapshot.relations.push(Relation::child(1, 99));
        let err = FamilyStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, KinshipError::InvalidEndpoint { .. }));
    }
}
