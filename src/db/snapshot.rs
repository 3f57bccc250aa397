//! Whole-snapshot reads and writes.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::Db;
use crate::error::Result;
use crate::family::{FamilySnapshot, Gender, Person, Relation, RelationType};

const NEXT_PERSON_ID: &str = "next_person_id";

/// Row counts written by [`save_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStats {
    pub people: usize,
    pub relations: usize,
}

/// Replace the stored family with `snapshot` in a single transaction.
///
/// The id high-water mark only ever grows, so ids of people deleted before
/// the save are not handed out again after a reload.
pub async fn save_snapshot(db: &Db, snapshot: FamilySnapshot) -> Result<SnapshotStats> {
    let updated_at = Utc::now().to_rfc3339();

    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM relations", [])?;
        tx.execute("DELETE FROM persons", [])?;

        {
            let mut insert_person = tx.prepare(
                "INSERT INTO persons (id, name, gender, birth_date, photo, details, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for person in &snapshot.people {
                insert_person.execute(params![
                    person.id,
                    person.name,
                    person.gender.as_str(),
                    person.birth_date,
                    person.photo,
                    person.details,
                    updated_at,
                ])?;
            }

            let mut insert_relation = tx.prepare(
                "INSERT INTO relations (from_person, to_person, type, position) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, relation) in snapshot.relations.iter().enumerate() {
                insert_relation.execute(params![
                    relation.from,
                    relation.to,
                    relation.relation_type.as_str(),
                    position as i64,
                ])?;
            }
        }

        if let Some(next) = snapshot.next_person_id {
            tx.execute(
                "INSERT INTO family_meta (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
                params![NEXT_PERSON_ID, next],
            )?;
        }

        tx.commit()?;
        log::debug!(
            "Saved snapshot: {} people, {} relations",
            snapshot.people.len(),
            snapshot.relations.len()
        );
        Ok(SnapshotStats {
            people: snapshot.people.len(),
            relations: snapshot.relations.len(),
        })
    })
    .await
}

/// Read the stored family. People come back in id order, relations in the
/// order they were saved.
pub async fn load_snapshot(db: &Db) -> Result<FamilySnapshot> {
    db.with_connection(|conn| {
        let person_rows = {
            let mut stmt = conn.prepare(
                "SELECT id, name, gender, birth_date, photo, details FROM persons ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            rows
        };

        let mut people = Vec::with_capacity(person_rows.len());
        for (id, name, gender, birth_date, photo, details) in person_rows {
            people.push(Person {
                id,
                name,
                gender: gender.parse::<Gender>()?,
                birth_date,
                photo,
                details,
            });
        }

        let relation_rows = {
            let mut stmt = conn.prepare(
                "SELECT from_person, to_person, type FROM relations ORDER BY position, id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            rows
        };

        let mut relations = Vec::with_capacity(relation_rows.len());
        for (from, to, relation_type) in relation_rows {
            relations.push(Relation::new(from, to, relation_type.parse::<RelationType>()?));
        }

        let next_person_id = conn
            .query_row(
                "SELECT value FROM family_meta WHERE key = ?1",
                params![NEXT_PERSON_ID],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(FamilySnapshot {
            people,
            relations,
            next_person_id,
        })
    })
    .await
}

/// Timestamp of the most recent save, if anything was ever saved.
pub async fn last_saved_at(db: &Db) -> Result<Option<String>> {
    db.with_connection(|conn| {
        let latest = conn
            .query_row("SELECT MAX(updated_at) FROM persons", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten();
        Ok(latest)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::family::{FamilyStore, NewPerson};
    use crate::KinshipError;
    use tempfile::TempDir;

    async fn setup_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("family.db"));
        db.with_connection(|conn| migrate::run_embedded_migrations(conn))
            .await
            .unwrap();
        (db, temp_dir)
    }

    fn sample_snapshot() -> FamilySnapshot {
        let mut store = FamilyStore::new();
        for (name, gender) in [("A", Gender::Male), ("B", Gender::Female), ("C", Gender::Female)] {
            let mut data = NewPerson::new(name, gender, "2000-01-01");
            data.photo = Some(format!("photos/{}.jpg", name));
            store.add_person(data).unwrap();
        }
        store.add_relation(2, 1, RelationType::Spouse).unwrap();
        store.add_relation(1, 3, RelationType::Child).unwrap();
        store.add_relation(2, 3, RelationType::Child).unwrap();
        store.snapshot()
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_snapshot() {
        let (db, _temp) = setup_db().await;
        let snapshot = sample_snapshot();

        let stats = save_snapshot(&db, snapshot.clone()).await.unwrap();
        assert_eq!(stats, SnapshotStats { people: 3, relations: 3 });

        let loaded = load_snapshot(&db).await.unwrap();
        assert_eq!(loaded, snapshot);
        assert!(last_saved_at(&db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_contents() {
        let (db, _temp) = setup_db().await;
        save_snapshot(&db, sample_snapshot()).await.unwrap();

        let mut store = FamilyStore::from_snapshot(sample_snapshot()).unwrap();
        store.remove_person(2).unwrap();
        save_snapshot(&db, store.snapshot()).await.unwrap();

        let loaded = load_snapshot(&db).await.unwrap();
        assert_eq!(loaded.people.len(), 2);
        assert_eq!(loaded.relations, vec![Relation::child(1, 3)]);
    }

    #[tokio::test]
    async fn test_reload_does_not_reuse_deleted_max_id() {
        let (db, _temp) = setup_db().await;
        let mut store = FamilyStore::from_snapshot(sample_snapshot()).unwrap();
        store.remove_person(3).unwrap();
        save_snapshot(&db, store.snapshot()).await.unwrap();

        let loaded = load_snapshot(&db).await.unwrap();
        assert_eq!(loaded.next_person_id, Some(4));

        let mut restored = FamilyStore::from_snapshot(loaded).unwrap();
        let added = restored.add_person(NewPerson::new("D", Gender::Male, "")).unwrap();
        assert_eq!(added.id, 4);
    }

    #[tokio::test]
    async fn test_id_high_water_mark_never_shrinks() {
        let (db, _temp) = setup_db().await;
        save_snapshot(&db, sample_snapshot()).await.unwrap();

        let snapshot = FamilySnapshot {
            next_person_id: Some(2),
            ..Default::default()
        };
        save_snapshot(&db, snapshot).await.unwrap();
        assert_eq!(load_snapshot(&db).await.unwrap().next_person_id, Some(4));
    }

    #[tokio::test]
    async fn test_empty_database_loads_empty_snapshot() {
        let (db, _temp) = setup_db().await;
        let loaded = load_snapshot(&db).await.unwrap();
        assert_eq!(loaded, FamilySnapshot::default());
        assert!(last_saved_at(&db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schema_rejects_dangling_relation() {
        let (db, _temp) = setup_db().await;
        let snapshot = FamilySnapshot {
            people: Vec::new(),
            relations: vec![Relation::child(1, 2)],
            next_person_id: None,
        };
        let err = save_snapshot(&db, snapshot).await.unwrap_err();
        assert!(matches!(err, KinshipError::Database(_)));
        assert_eq!(load_snapshot(&db).await.unwrap(), FamilySnapshot::default());
    }
}
