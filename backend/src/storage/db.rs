use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{migrate::MigrateDatabase, sqlite::SqliteRow, Row, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::{AttendanceStorage, MinistryStorage, PersonStorage, RegistrationOutcome};
use shared::{AttendanceRecord, Ministry, PersonRef};

/// DbConnection manages the SQLite pool and implements every storage trait
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection, creating the database file when missing
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url)
                .await
                .with_context(|| format!("Failed to create database at {}", url))?;
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a private in-memory database for tests
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // A single connection that never expires keeps the in-memory database alive
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persons (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                first_name_key TEXT NOT NULL,
                last_name_key TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_persons_name_key
            ON persons(first_name_key, last_name_key);
            "#,
        )
        .execute(pool)
        .await?;

        // person_id is not a foreign key: records outlive directory entries
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id TEXT PRIMARY KEY,
                person_id TEXT NOT NULL,
                service_date TEXT NOT NULL,
                check_in_time TEXT NOT NULL,
                is_first_time_visitor BOOLEAN NOT NULL DEFAULT FALSE,
                ministry_id TEXT,
                UNIQUE (person_id, service_date)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_attendance_service_date
            ON attendance(service_date, check_in_time DESC);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ministries (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn name_key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    fn person_from_row(row: &SqliteRow) -> PersonRef {
        PersonRef {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            phone: row.get("phone"),
        }
    }

    fn ministry_from_row(row: &SqliteRow) -> Ministry {
        Ministry {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
        }
    }

    fn attendance_from_row(row: &SqliteRow) -> Result<AttendanceRecord> {
        let check_in_time: String = row.get("check_in_time");
        let check_in_time = DateTime::parse_from_rfc3339(&check_in_time)
            .with_context(|| format!("Invalid check-in time: {}", check_in_time))?
            .with_timezone(&Utc);

        let joined_id: Option<String> = row.get("joined_person_id");
        let person = joined_id.map(|id| PersonRef {
            id,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            phone: row.get("phone"),
        });

        Ok(AttendanceRecord {
            id: row.get("id"),
            person_id: row.get("person_id"),
            check_in_time,
            is_first_time_visitor: row.get("is_first_time_visitor"),
            ministry_id: row.get("ministry_id"),
            person,
        })
    }

    fn is_unique_violation(error: &sqlx::Error) -> bool {
        matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
    }

    /// Body of `register_and_store_attendance`; the caller commits or rolls back.
    async fn register_in_transaction(
        conn: &mut SqliteConnection,
        person: &PersonRef,
        record: &AttendanceRecord,
        service_date: NaiveDate,
    ) -> Result<RegistrationOutcome> {
        let first_name_key = Self::name_key(&person.first_name);
        let last_name_key = Self::name_key(&person.last_name);

        // A write is the first statement so the transaction holds the write lock
        // before the name check; a concurrent registration waits behind it.
        let inserted = sqlx::query(
            r#"
            INSERT INTO persons (id, first_name, last_name, first_name_key, last_name_key, email, phone, created_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM persons WHERE first_name_key = ? AND last_name_key = ?
            )
            "#,
        )
        .bind(&person.id)
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(&first_name_key)
        .bind(&last_name_key)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(record.check_in_time.to_rfc3339())
        .bind(&first_name_key)
        .bind(&last_name_key)
        .execute(&mut *conn)
        .await?
        .rows_affected()
            > 0;

        let (owner, stored) = if inserted {
            (person.clone(), record.clone())
        } else {
            let row = sqlx::query(
                r#"
                SELECT id, first_name, last_name, email, phone
                FROM persons
                WHERE first_name_key = ? AND last_name_key = ?
                ORDER BY created_at ASC, ROWID ASC
                LIMIT 1
                "#,
            )
            .bind(&first_name_key)
            .bind(&last_name_key)
            .fetch_one(&mut *conn)
            .await?;
            let existing = Self::person_from_row(&row);
            debug!("{} was registered concurrently as {}", existing.full_name(), existing.id);

            let stored = AttendanceRecord {
                person_id: existing.id.clone(),
                is_first_time_visitor: false,
                person: Some(existing.clone()),
                ..record.clone()
            };
            (existing, stored)
        };

        let result = sqlx::query(
            r#"
            INSERT INTO attendance (id, person_id, service_date, check_in_time, is_first_time_visitor, ministry_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.person_id)
        .bind(service_date.to_string())
        .bind(stored.check_in_time.to_rfc3339())
        .bind(stored.is_first_time_visitor)
        .bind(&stored.ministry_id)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) if inserted => Ok(RegistrationOutcome::Registered),
            Ok(_) => Ok(RegistrationOutcome::CheckedInExisting {
                person: owner,
                record: stored,
            }),
            Err(e) if Self::is_unique_violation(&e) => {
                debug!("Attendance for {} on {} already stored", owner.id, service_date);
                Ok(RegistrationOutcome::Duplicate(owner))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PersonStorage for DbConnection {
    async fn store_person(&self, person: &PersonRef) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO persons (id, first_name, last_name, first_name_key, last_name_key, email, phone, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&person.id)
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(Self::name_key(&person.first_name))
        .bind(Self::name_key(&person.last_name))
        .bind(&person.email)
        .bind(&person.phone)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get_person(&self, person_id: &str) -> Result<Option<PersonRef>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone
            FROM persons
            WHERE id = ?
            "#,
        )
        .bind(person_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.as_ref().map(Self::person_from_row))
    }

    async fn find_people_by_name(&self, first_name: &str, last_name: &str) -> Result<Vec<PersonRef>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone
            FROM persons
            WHERE first_name_key = ? AND last_name_key = ?
            ORDER BY created_at ASC, ROWID ASC
            "#,
        )
        .bind(Self::name_key(first_name))
        .bind(Self::name_key(last_name))
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.iter().map(Self::person_from_row).collect())
    }
}

#[async_trait]
impl AttendanceStorage for DbConnection {
    async fn try_store_attendance(&self, record: &AttendanceRecord, service_date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (id, person_id, service_date, check_in_time, is_first_time_visitor, ministry_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.person_id)
        .bind(service_date.to_string())
        .bind(record.check_in_time.to_rfc3339())
        .bind(record.is_first_time_visitor)
        .bind(&record.ministry_id)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if Self::is_unique_violation(&e) => {
                debug!("Attendance for {} on {} already stored", record.person_id, service_date);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn register_and_store_attendance(
        &self,
        person: &PersonRef,
        record: &AttendanceRecord,
        service_date: NaiveDate,
    ) -> Result<RegistrationOutcome> {
        let mut tx = self.pool.begin().await?;

        match Self::register_in_transaction(&mut tx, person, record, service_date).await {
            Ok(RegistrationOutcome::Duplicate(existing)) => {
                tx.rollback().await?;
                Ok(RegistrationOutcome::Duplicate(existing))
            }
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Failed to roll back registration of {}: {}", person.id, rollback);
                }
                Err(e)
            }
        }
    }

    async fn has_attendance_on(&self, person_id: &str, service_date: NaiveDate) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM attendance
            WHERE person_id = ? AND service_date = ?
            "#,
        )
        .bind(person_id)
        .bind(service_date.to_string())
        .fetch_one(&*self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn list_attendance_on(&self, service_date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.person_id, a.check_in_time, a.is_first_time_visitor, a.ministry_id,
                   p.id AS joined_person_id, p.first_name, p.last_name, p.email, p.phone
            FROM attendance a
            LEFT JOIN persons p ON p.id = a.person_id
            WHERE a.service_date = ?
            ORDER BY a.check_in_time DESC, a.ROWID DESC
            "#,
        )
        .bind(service_date.to_string())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(Self::attendance_from_row).collect()
    }
}

#[async_trait]
impl MinistryStorage for DbConnection {
    async fn store_ministry(&self, ministry: &Ministry) -> Result<()> {
        sqlx::query("INSERT INTO ministries (id, name, description) VALUES (?, ?, ?)")
            .bind(&ministry.id)
            .bind(&ministry.name)
            .bind(&ministry.description)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn get_ministry(&self, ministry_id: &str) -> Result<Option<Ministry>> {
        let row = sqlx::query("SELECT id, name, description FROM ministries WHERE id = ?")
            .bind(ministry_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(Self::ministry_from_row))
    }

    async fn find_ministry_by_name(&self, name: &str) -> Result<Option<Ministry>> {
        let row = sqlx::query("SELECT id, name, description FROM ministries WHERE name = ?")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(Self::ministry_from_row))
    }

    async fn list_ministries(&self, offset: u32, limit: u32) -> Result<(Vec<Ministry>, u64)> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description
            FROM ministries
            ORDER BY name ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&*self.pool)
        .await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM ministries")
            .fetch_one(&*self.pool)
            .await?
            .get("count");

        Ok((
            rows.iter().map(Self::ministry_from_row).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn setup_test() -> DbConnection {
        DbConnection::init_test().await.expect("Failed to create test database")
    }

    fn person(first: &str, last: &str) -> PersonRef {
        PersonRef {
            id: PersonRef::generate_id(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: Some(format!("{}@example.com", first.to_lowercase())),
            phone: None,
        }
    }

    fn record_for(person_id: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: AttendanceRecord::generate_id(),
            person_id: person_id.to_string(),
            check_in_time: Utc::now(),
            is_first_time_visitor: false,
            ministry_id: None,
            person: None,
        }
    }

    #[tokio::test]
    async fn test_find_people_by_name_is_case_insensitive() {
        let db = setup_test().await;
        let jane = person("Jane", "Doe");
        db.store_person(&jane).await.unwrap();

        let found = db.find_people_by_name("  jANE ", "doe").await.unwrap();
        assert_eq!(found, vec![jane]);

        let missing = db.find_people_by_name("Jane", "Smith").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_second_attendance_same_day_is_rejected() {
        let db = setup_test().await;
        let jane = person("Jane", "Doe");
        db.store_person(&jane).await.unwrap();
        let today = Utc::now().date_naive();

        assert!(db.try_store_attendance(&record_for(&jane.id), today).await.unwrap());
        assert!(!db.try_store_attendance(&record_for(&jane.id), today).await.unwrap());

        let records = db.list_attendance_on(today).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].person.as_ref(), Some(&jane));
    }

    #[tokio::test]
    async fn test_attendance_on_another_day_is_independent() {
        let db = setup_test().await;
        let jane = person("Jane", "Doe");
        db.store_person(&jane).await.unwrap();
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);

        assert!(db.try_store_attendance(&record_for(&jane.id), yesterday).await.unwrap());
        assert!(!db.has_attendance_on(&jane.id, today).await.unwrap());
        assert!(db.try_store_attendance(&record_for(&jane.id), today).await.unwrap());
        assert_eq!(db.list_attendance_on(today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_and_store_attendance_is_atomic() {
        let db = setup_test().await;
        let visitor = person("New", "Visitor");
        let today = Utc::now().date_naive();
        let mut record = record_for(&visitor.id);
        record.is_first_time_visitor = true;

        let outcome = db.register_and_store_attendance(&visitor, &record, today).await.unwrap();
        assert_eq!(outcome, RegistrationOutcome::Registered);
        assert_eq!(db.get_person(&visitor.id).await.unwrap(), Some(visitor.clone()));

        let records = db.list_attendance_on(today).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_first_time_visitor);
    }

    #[tokio::test]
    async fn test_registering_same_name_twice_is_duplicate() {
        let db = setup_test().await;
        let today = Utc::now().date_naive();
        let first = person("New", "Visitor");
        db.register_and_store_attendance(&first, &record_for(&first.id), today)
            .await
            .unwrap();

        // Same visitor typed at another kiosk, different casing
        let second = person(" new ", "VISITOR");
        let outcome = db
            .register_and_store_attendance(&second, &record_for(&second.id), today)
            .await
            .unwrap();

        assert_eq!(outcome, RegistrationOutcome::Duplicate(first.clone()));
        assert_eq!(db.get_person(&second.id).await.unwrap(), None);
        assert_eq!(db.find_people_by_name("New", "Visitor").await.unwrap(), vec![first]);
        assert_eq!(db.list_attendance_on(today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_registering_known_name_checks_in_existing_person() {
        let db = setup_test().await;
        let today = Utc::now().date_naive();
        let jane = person("Jane", "Doe");
        db.store_person(&jane).await.unwrap();

        let again = person("Jane", "Doe");
        let mut record = record_for(&again.id);
        record.is_first_time_visitor = true;
        let outcome = db.register_and_store_attendance(&again, &record, today).await.unwrap();

        match outcome {
            RegistrationOutcome::CheckedInExisting { person, record } => {
                assert_eq!(person, jane);
                assert_eq!(record.person_id, jane.id);
                assert!(!record.is_first_time_visitor);
            }
            other => panic!("Expected check-in of the existing person, got {:?}", other),
        }

        let records = db.list_attendance_on(today).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].person_id, jane.id);
        assert_eq!(db.find_people_by_name("Jane", "Doe").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_person_leaves_record_without_reference() {
        let db = setup_test().await;
        let jane = person("Jane", "Doe");
        db.store_person(&jane).await.unwrap();
        let today = Utc::now().date_naive();
        db.try_store_attendance(&record_for(&jane.id), today).await.unwrap();

        sqlx::query("DELETE FROM persons WHERE id = ?")
            .bind(&jane.id)
            .execute(&*db.pool)
            .await
            .unwrap();

        let records = db.list_attendance_on(today).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].person.is_none());
        assert_eq!(records[0].display_name(), "Unknown");
    }

    #[tokio::test]
    async fn test_list_ministries_pages_by_name() {
        let db = setup_test().await;
        for name in ["Youth", "Choir", "Ushers"] {
            db.store_ministry(&Ministry {
                id: Ministry::generate_id(),
                name: name.to_string(),
                description: None,
            })
            .await
            .unwrap();
        }

        let (first_page, total) = db.list_ministries(0, 2).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = first_page.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Choir", "Ushers"]);

        let (second_page, _) = db.list_ministries(2, 2).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].name, "Youth");
    }
}
