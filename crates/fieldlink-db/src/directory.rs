use rusqlite::{Connection, OptionalExtension, params};

use fieldlink_types::error::ChatError;
use fieldlink_types::models::{Group, Technician};

use crate::models::TechnicianRow;
use crate::{Database, StoreResultExt};

impl Database {
    // -- Technicians --

    /// Create a technician. Fails with `DuplicateIdentity` when the display
    /// name or email is already taken.
    pub fn create_technician(
        &self,
        name: &str,
        role: &str,
        contact: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, ChatError> {
        self.with_conn(|conn| {
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT id FROM technicians WHERE name = ?1 OR email = ?2",
                    params![name, email],
                    |row| row.get(0),
                )
                .optional()
                .store()?;

            if taken.is_some() {
                return Err(ChatError::DuplicateIdentity(format!(
                    "a technician named '{name}' or using '{email}' already exists"
                )));
            }

            conn.execute(
                "INSERT INTO technicians (name, role, contact, email, password)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, role, contact, email, password_hash],
            )
            .store()?;

            Ok(conn.last_insert_rowid())
        })
    }

    pub fn technician_by_name(&self, name: &str) -> Result<Option<TechnicianRow>, ChatError> {
        self.with_conn(|conn| query_technician(conn, "name = ?1", params![name]))
    }

    pub fn technician_by_id(&self, id: i64) -> Result<Option<TechnicianRow>, ChatError> {
        self.with_conn(|conn| query_technician(conn, "id = ?1", params![id]))
    }

    pub fn list_technicians(&self) -> Result<Vec<Technician>, ChatError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, role, contact, email, password, photo
                     FROM technicians ORDER BY id",
                )
                .store()?;

            let rows = stmt
                .query_map([], map_technician_row)
                .store()?
                .collect::<Result<Vec<_>, _>>()
                .store()?;

            Ok(rows.into_iter().map(Technician::from).collect())
        })
    }

    /// Partial update of the mutable profile fields. Only supplied fields
    /// change. Returns false when no such technician exists.
    pub fn update_technician(
        &self,
        id: i64,
        email: Option<&str>,
        contact: Option<&str>,
        role: Option<&str>,
        photo: Option<&str>,
    ) -> Result<bool, ChatError> {
        let mut fields: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

        if let Some(email) = &email {
            fields.push("email = ?");
            values.push(email);
        }
        if let Some(contact) = &contact {
            fields.push("contact = ?");
            values.push(contact);
        }
        if let Some(role) = &role {
            fields.push("role = ?");
            values.push(role);
        }
        if let Some(photo) = &photo {
            fields.push("photo = ?");
            values.push(photo);
        }

        if fields.is_empty() {
            return Err(ChatError::Validation(
                "no updatable fields supplied".to_string(),
            ));
        }

        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE technicians SET {} WHERE id = ?",
                fields.join(", ")
            );
            values.push(&id);
            let changed = conn.execute(&sql, values.as_slice()).store()?;
            Ok(changed > 0)
        })
    }

    /// Delete a technician. Membership rows cascade; message and report
    /// sender references are nulled by the schema's FK actions.
    pub fn delete_technician(&self, id: i64) -> Result<bool, ChatError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM technicians WHERE id = ?1", params![id])
                .store()?;
            Ok(changed > 0)
        })
    }

    // -- Groups --

    /// Create a group with an initial member set. The creator is always
    /// inserted into membership, whether or not the supplied list names
    /// them. Fails with `Validation` on an empty name or member list.
    pub fn create_group(
        &self,
        name: &str,
        creator_id: i64,
        member_ids: &[i64],
    ) -> Result<Group, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::Validation("group name is required".to_string()));
        }
        if member_ids.is_empty() {
            return Err(ChatError::Validation(
                "at least one group member is required".to_string(),
            ));
        }

        let created_at = fieldlink_types::models::timestamp_now();

        self.with_conn(|conn| {
            let tx = conn.transaction().store()?;

            tx.execute(
                "INSERT INTO groups (name, creator_id, created_at) VALUES (?1, ?2, ?3)",
                params![name, creator_id, created_at],
            )
            .store()?;
            let group_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT OR IGNORE INTO group_members (group_id, technician_id) VALUES (?1, ?2)",
                params![group_id, creator_id],
            )
            .store()?;
            for member_id in member_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO group_members (group_id, technician_id) VALUES (?1, ?2)",
                    params![group_id, member_id],
                )
                .store()?;
            }

            tx.commit().store()?;

            Ok(Group {
                id: group_id,
                name: name.to_string(),
                creator_id: Some(creator_id),
                created_at,
            })
        })
    }

    /// Groups the technician belongs to (inner join through membership).
    pub fn groups_for_technician(&self, technician_id: i64) -> Result<Vec<Group>, ChatError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT g.id, g.name, g.creator_id, g.created_at
                     FROM groups g
                     JOIN group_members gm ON g.id = gm.group_id
                     WHERE gm.technician_id = ?1
                     ORDER BY g.id",
                )
                .store()?;

            let groups = stmt
                .query_map(params![technician_id], |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        creator_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .store()?
                .collect::<Result<Vec<_>, _>>()
                .store()?;

            Ok(groups)
        })
    }
}

fn query_technician(
    conn: &Connection,
    predicate: &str,
    args: impl rusqlite::Params,
) -> Result<Option<TechnicianRow>, ChatError> {
    let sql = format!(
        "SELECT id, name, role, contact, email, password, photo
         FROM technicians WHERE {predicate}"
    );
    conn.query_row(&sql, args, map_technician_row)
        .optional()
        .store()
}

fn map_technician_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TechnicianRow> {
    Ok(TechnicianRow {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        contact: row.get(3)?,
        email: row.get(4)?,
        password: row.get(5)?,
        photo: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_tech(db: &Database, name: &str, email: &str) -> i64 {
        db.create_technician(name, "Network Engineer", "0977001122", email, "hash")
            .unwrap()
    }

    #[test]
    fn duplicate_name_or_email_is_rejected() {
        let db = db();
        add_tech(&db, "Alice Mwansa", "alice@techcorp.com");

        let same_name =
            db.create_technician("Alice Mwansa", "r", "c", "other@techcorp.com", "hash");
        assert!(matches!(same_name, Err(ChatError::DuplicateIdentity(_))));

        let same_email = db.create_technician("Someone Else", "r", "c", "alice@techcorp.com", "hash");
        assert!(matches!(same_email, Err(ChatError::DuplicateIdentity(_))));
    }

    #[test]
    fn update_touches_only_supplied_fields() {
        let db = db();
        let id = add_tech(&db, "Brian Zulu", "brian@techcorp.com");

        assert!(db
            .update_technician(id, Some("zulu@techcorp.com"), None, None, Some("brian.png"))
            .unwrap());

        let row = db.technician_by_id(id).unwrap().unwrap();
        assert_eq!(row.email.as_deref(), Some("zulu@techcorp.com"));
        assert_eq!(row.photo.as_deref(), Some("brian.png"));
        assert_eq!(row.contact.as_deref(), Some("0977001122"));
        assert_eq!(row.role.as_deref(), Some("Network Engineer"));
    }

    #[test]
    fn update_with_no_fields_is_a_validation_error() {
        let db = db();
        let id = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        let result = db.update_technician(id, None, None, None, None);
        assert!(matches!(result, Err(ChatError::Validation(_))));
    }

    #[test]
    fn create_group_always_includes_the_creator() {
        let db = db();
        let creator = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        let c = add_tech(&db, "Chipo Banda", "chipo@techcorp.com");

        let group = db.create_group("Ops", creator, &[b, c]).unwrap();

        for id in [creator, b, c] {
            let groups = db.groups_for_technician(id).unwrap();
            assert_eq!(groups.len(), 1, "technician {id} should be in Ops");
            assert_eq!(groups[0].name, "Ops");
            assert_eq!(groups[0].id, group.id);
        }
    }

    #[test]
    fn create_group_tolerates_creator_in_member_list() {
        let db = db();
        let creator = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");

        db.create_group("Ops", creator, &[creator, b]).unwrap();
        assert_eq!(db.groups_for_technician(creator).unwrap().len(), 1);
    }

    #[test]
    fn create_group_validates_inputs() {
        let db = db();
        let creator = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");

        assert!(matches!(
            db.create_group("  ", creator, &[creator]),
            Err(ChatError::Validation(_))
        ));
        assert!(matches!(
            db.create_group("Ops", creator, &[]),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn deleting_a_technician_cascades_membership() {
        let db = db();
        let creator = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        db.create_group("Ops", creator, &[b]).unwrap();

        assert!(db.delete_technician(b).unwrap());
        assert!(db.groups_for_technician(b).unwrap().is_empty());
        // Group itself survives with the remaining member.
        assert_eq!(db.groups_for_technician(creator).unwrap().len(), 1);
    }
}
