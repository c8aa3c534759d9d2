//! Persistent profile storage backed by SQLite.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use vetclaims_types::{JsonMap, ProfileFields, ProfileId, VeteranProfile};

/// Record store for veteran profiles.
///
/// Implementations must enforce one record per email and reject a write that
/// would violate it with `StorageError::Conflict`.
pub trait ProfileStore: Send + Sync {
    /// Looks up a profile by its identity key.
    fn find_by_id(&self, id: &ProfileId) -> StorageResult<Option<VeteranProfile>>;

    /// Looks up a profile by email.
    fn find_by_email(&self, email: &str) -> StorageResult<Option<VeteranProfile>>;

    /// Inserts a new profile. Fails with `Conflict` if the email or id is taken.
    fn insert(&self, profile: &VeteranProfile) -> StorageResult<()>;

    /// Replaces the record currently keyed by `current_id` with `profile`.
    ///
    /// `profile.id` may differ from `current_id`, which re-keys the record.
    /// Fails with `NotFound` if no record has `current_id`.
    fn update(&self, current_id: &ProfileId, profile: &VeteranProfile) -> StorageResult<()>;

    /// Sets whichever status flags are `Some` on the record with `email`,
    /// leaving every other column untouched.
    ///
    /// Fails with `NotFound` if no record has `email`.
    fn update_flags(
        &self,
        email: &str,
        has_signed_up: Option<bool>,
        has_paid: Option<bool>,
    ) -> StorageResult<()>;

    /// Returns every profile that carries an encrypted SSN.
    fn find_with_ssn(&self) -> StorageResult<Vec<VeteranProfile>>;

    /// Swaps the SSN ciphertext of `id` from `expected` to `replacement`.
    ///
    /// Returns `false` without writing if the stored ciphertext is no longer
    /// `expected`.
    fn replace_ssn(&self, id: &ProfileId, expected: &[u8], replacement: &[u8])
    -> StorageResult<bool>;

    /// Returns the number of stored profiles.
    fn count(&self) -> StorageResult<usize>;
}

const SELECT_COLUMNS: &str = "id, email, first_name, middle_initial, last_name, ssn_encrypted, \
     phone, date_of_birth, file_number, veterans_service_number, military_service, claim_info, \
     address, claim_statement, has_signed_up, has_paid, claimed, created_at, updated_at";

/// `ProfileStore` over a single SQLite connection.
pub struct SqliteProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    /// Opens (or creates) a profile store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory profile store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS veteran_profiles (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                middle_initial TEXT,
                last_name TEXT NOT NULL,
                ssn_encrypted BLOB,
                phone TEXT,
                date_of_birth TEXT,
                file_number TEXT,
                veterans_service_number TEXT,
                military_service TEXT NOT NULL DEFAULT '{}',
                claim_info TEXT NOT NULL DEFAULT '{}',
                address TEXT NOT NULL DEFAULT '{}',
                claim_statement TEXT,
                has_signed_up INTEGER NOT NULL DEFAULT 0,
                has_paid INTEGER NOT NULL DEFAULT 0,
                claimed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn find_one(&self, column: &str, value: &str) -> StorageResult<Option<VeteranProfile>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM veteran_profiles WHERE {column} = ?1");
        let raw = conn
            .query_row(&sql, params![value], RawProfile::from_row)
            .optional()?;
        raw.map(RawProfile::into_profile).transpose()
    }
}

impl ProfileStore for SqliteProfileStore {
    fn find_by_id(&self, id: &ProfileId) -> StorageResult<Option<VeteranProfile>> {
        self.find_one("id", &id.to_string())
    }

    fn find_by_email(&self, email: &str) -> StorageResult<Option<VeteranProfile>> {
        self.find_one("email", email)
    }

    fn insert(&self, profile: &VeteranProfile) -> StorageResult<()> {
        let json = JsonColumns::encode(&profile.fields)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let f = &profile.fields;
        tx.execute(
            "INSERT INTO veteran_profiles (
                id, email, first_name, middle_initial, last_name, ssn_encrypted,
                phone, date_of_birth, file_number, veterans_service_number,
                military_service, claim_info, address, claim_statement,
                has_signed_up, has_paid, claimed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                profile.id.to_string(),
                f.email,
                f.first_name,
                f.middle_initial,
                f.last_name,
                profile.ssn_encrypted,
                f.phone,
                f.date_of_birth,
                f.file_number,
                f.veterans_service_number,
                json.military_service,
                json.claim_info,
                json.address,
                f.claim_statement,
                f.has_signed_up,
                f.has_paid,
                profile.claimed,
                profile.created_at.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| constraint_to_conflict(e, profile))?;
        tx.commit()?;
        debug!("Inserted profile {}", profile.id);
        Ok(())
    }

    fn update(&self, current_id: &ProfileId, profile: &VeteranProfile) -> StorageResult<()> {
        let json = JsonColumns::encode(&profile.fields)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let f = &profile.fields;
        let changed = tx
            .execute(
                "UPDATE veteran_profiles SET
                    id = ?1, email = ?2, first_name = ?3, middle_initial = ?4, last_name = ?5,
                    ssn_encrypted = ?6, phone = ?7, date_of_birth = ?8, file_number = ?9,
                    veterans_service_number = ?10, military_service = ?11, claim_info = ?12,
                    address = ?13, claim_statement = ?14, has_signed_up = ?15, has_paid = ?16,
                    claimed = ?17, updated_at = ?18
                 WHERE id = ?19",
                params![
                    profile.id.to_string(),
                    f.email,
                    f.first_name,
                    f.middle_initial,
                    f.last_name,
                    profile.ssn_encrypted,
                    f.phone,
                    f.date_of_birth,
                    f.file_number,
                    f.veterans_service_number,
                    json.military_service,
                    json.claim_info,
                    json.address,
                    f.claim_statement,
                    f.has_signed_up,
                    f.has_paid,
                    profile.claimed,
                    profile.updated_at.to_rfc3339(),
                    current_id.to_string(),
                ],
            )
            .map_err(|e| constraint_to_conflict(e, profile))?;

        // Dropping `tx` without commit rolls back.
        if changed == 0 {
            return Err(StorageError::NotFound(current_id.to_string()));
        }
        tx.commit()?;
        if current_id != &profile.id {
            debug!("Re-keyed profile {} -> {}", current_id, profile.id);
        }
        Ok(())
    }

    fn update_flags(
        &self,
        email: &str,
        has_signed_up: Option<bool>,
        has_paid: Option<bool>,
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE veteran_profiles SET
                has_signed_up = COALESCE(?1, has_signed_up),
                has_paid = COALESCE(?2, has_paid),
                updated_at = ?3
             WHERE email = ?4",
            params![has_signed_up, has_paid, Utc::now().to_rfc3339(), email],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(email.to_string()));
        }
        debug!("Updated status flags for {}", email);
        Ok(())
    }

    fn find_with_ssn(&self) -> StorageResult<Vec<VeteranProfile>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM veteran_profiles WHERE ssn_encrypted IS NOT NULL"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RawProfile::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawProfile::into_profile).collect()
    }

    fn replace_ssn(
        &self,
        id: &ProfileId,
        expected: &[u8],
        replacement: &[u8],
    ) -> StorageResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE veteran_profiles SET ssn_encrypted = ?1 WHERE id = ?2 AND ssn_encrypted = ?3",
            params![replacement, id.to_string(), expected],
        )?;
        Ok(changed == 1)
    }

    fn count(&self) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM veteran_profiles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn constraint_to_conflict(err: rusqlite::Error, profile: &VeteranProfile) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY {
                StorageError::Conflict(format!("profile id {} already exists", profile.id))
            } else {
                StorageError::Conflict("profile with this email already exists".to_string())
            }
        }
        _ => err.into(),
    }
}

struct JsonColumns {
    military_service: String,
    claim_info: String,
    address: String,
}

impl JsonColumns {
    fn encode(fields: &ProfileFields) -> StorageResult<Self> {
        Ok(Self {
            military_service: serde_json::to_string(&fields.military_service)?,
            claim_info: serde_json::to_string(&fields.claim_info)?,
            address: serde_json::to_string(&fields.address)?,
        })
    }
}

/// Row as read from SQLite, before id/JSON/timestamp parsing.
struct RawProfile {
    id: String,
    email: String,
    first_name: String,
    middle_initial: Option<String>,
    last_name: String,
    ssn_encrypted: Option<Vec<u8>>,
    phone: Option<String>,
    date_of_birth: Option<String>,
    file_number: Option<String>,
    veterans_service_number: Option<String>,
    military_service: Option<String>,
    claim_info: Option<String>,
    address: Option<String>,
    claim_statement: Option<String>,
    has_signed_up: bool,
    has_paid: bool,
    claimed: bool,
    created_at: String,
    updated_at: String,
}

impl RawProfile {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            middle_initial: row.get(3)?,
            last_name: row.get(4)?,
            ssn_encrypted: row.get(5)?,
            phone: row.get(6)?,
            date_of_birth: row.get(7)?,
            file_number: row.get(8)?,
            veterans_service_number: row.get(9)?,
            military_service: row.get(10)?,
            claim_info: row.get(11)?,
            address: row.get(12)?,
            claim_statement: row.get(13)?,
            has_signed_up: row.get(14)?,
            has_paid: row.get(15)?,
            claimed: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }

    fn into_profile(self) -> StorageResult<VeteranProfile> {
        let id = ProfileId::parse(&self.id)
            .map_err(|e| StorageError::InvalidData(format!("invalid profile id: {e}")))?;

        Ok(VeteranProfile {
            id,
            fields: ProfileFields {
                email: self.email,
                first_name: self.first_name,
                middle_initial: self.middle_initial,
                last_name: self.last_name,
                phone: self.phone,
                date_of_birth: self.date_of_birth,
                file_number: self.file_number,
                veterans_service_number: self.veterans_service_number,
                military_service: parse_map(self.military_service)?,
                claim_info: parse_map(self.claim_info)?,
                address: parse_map(self.address)?,
                claim_statement: self.claim_statement,
                has_signed_up: self.has_signed_up,
                has_paid: self.has_paid,
            },
            ssn_encrypted: self.ssn_encrypted,
            claimed: self.claimed,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_map(raw: Option<String>) -> StorageResult<JsonMap> {
    match raw {
        Some(s) if !s.is_empty() => Ok(serde_json::from_str::<Option<JsonMap>>(&s)?.unwrap_or_default()),
        _ => Ok(JsonMap::new()),
    }
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("invalid timestamp {raw:?}: {e}")))
}
