// crates/ca-ledger-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite CA Store
// Description: Durable CaStorage backed by an embedded SQLite database.
// Purpose: Persist pending requests and issued certificates in a fixed schema.
// Dependencies: ca-ledger-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteCaStorage`] implements [`CaStorage`] over two tables,
//! `CertRequests` and `IssuedCerts`, each with unique indices on the
//! identifier and key name columns. The schema is applied with
//! `IF NOT EXISTS` on every open and is never altered, so databases written
//! by earlier CA deployments keep working.
//!
//! The per-table indices cannot express the cross-table rule that a key name
//! is held by at most one request or certificate; every insert path queries
//! both tables inside the same transaction before writing. Each operation
//! runs in one transaction under the instance mutex. Database contents are
//! untrusted: names and challenge secrets are re-validated on every read and
//! undecodable rows surface as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use ca_ledger_core::CaStorage;
use ca_ledger_core::CertId;
use ca_ledger_core::Certificate;
use ca_ledger_core::CertificateRequest;
use ca_ledger_core::ChallengeSecrets;
use ca_ledger_core::ChallengeType;
use ca_ledger_core::IssuedCertificate;
use ca_ledger_core::Name;
use ca_ledger_core::RegistryError;
use ca_ledger_core::RequestId;
use ca_ledger_core::RequestStatus;
use ca_ledger_core::StorageError;
use ca_ledger_core::StorageRegistry;
use ca_ledger_core::decode_challenge_secrets;
use ca_ledger_core::encode_challenge_secrets;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registry name of the `SQLite` backend.
pub const STORAGE_TYPE: &str = "ca-storage-sqlite3";
/// Directory created under the home directory when no location is given.
pub const DEFAULT_DIRECTORY_NAME: &str = ".ca-ledger";
/// Database file name inside the resolved directory.
pub const DATABASE_FILE_NAME: &str = "ca-ledger.db";
/// Default busy timeout for `SQLite` connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Schema shared with existing CA databases. Must not change.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS
  CertRequests(
    id INTEGER PRIMARY KEY,
    request_id TEXT NOT NULL,
    ca_name BLOB NOT NULL,
    status TEXT NOT NULL,
    cert_key_name BLOB NOT NULL,
    cert_request BLOB NOT NULL,
    challenge_type TEXT,
    challenge_secrets TEXT
  );
CREATE UNIQUE INDEX IF NOT EXISTS
  CertRequestIdIndex ON CertRequests(request_id);
CREATE UNIQUE INDEX IF NOT EXISTS
  CertRequestKeyNameIndex ON CertRequests(cert_key_name);

CREATE TABLE IF NOT EXISTS
  IssuedCerts(
    id INTEGER PRIMARY KEY,
    cert_id TEXT NOT NULL,
    cert_key_name BLOB NOT NULL,
    cert BLOB NOT NULL
  );
CREATE UNIQUE INDEX IF NOT EXISTS
  IssuedCertRequestIdIndex ON IssuedCerts(cert_id);
CREATE UNIQUE INDEX IF NOT EXISTS
  IssuedCertKeyNameIndex ON IssuedCerts(cert_key_name);
";

/// Column list for request reads.
const REQUEST_COLUMNS: &str = "request_id, ca_name, status, cert_key_name, cert_request, \
                               challenge_type, challenge_secrets";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode, for file systems without shared memory support.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` CA store.
///
/// # Invariants
/// - `path` names the database file, not its directory.
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for the database file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }

    /// Creates a configuration from a registry location hint.
    ///
    /// A non-empty `location` names the directory holding the database.
    /// Otherwise the directory is [`DEFAULT_DIRECTORY_NAME`] under `$HOME`,
    /// or under the working directory when `$HOME` is unset.
    #[must_use]
    pub fn for_location(location: &str) -> Self {
        let home = env::var_os("HOME").filter(|value| !value.is_empty()).map(PathBuf::from);
        Self::new(resolve_database_dir(location, home.as_deref()).join(DATABASE_FILE_NAME))
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Resolves the database directory from a location hint and home directory.
fn resolve_database_dir(location: &str, home: Option<&Path>) -> PathBuf {
    if !location.is_empty() {
        return PathBuf::from(location);
    }
    home.map_or_else(|| Path::new(".").join(DEFAULT_DIRECTORY_NAME), |home| {
        home.join(DEFAULT_DIRECTORY_NAME)
    })
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding certificate or challenge secret payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Invalid store input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Row collides with an existing identifier or key name.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// No row matches the identifier.
    #[error("sqlite store record not found: {0}")]
    NotFound(String),
}

impl From<SqliteStoreError> for StorageError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
        }
    }
}

impl From<StorageError> for SqliteStoreError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(message) => Self::NotFound(message),
            StorageError::Conflict(message) => Self::Conflict(message),
            StorageError::Invalid(message) => Self::Invalid(message),
            StorageError::Corrupt(message) => Self::Corrupt(message),
            StorageError::Io(message) => Self::Io(message),
            StorageError::Store(message) | StorageError::Init(message) => Self::Db(message),
        }
    }
}

/// Maps `SQLite` errors, reporting unique index violations as conflicts.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            SqliteStoreError::Conflict(format!("unique constraint violated: {failure}"))
        }
        other => SqliteStoreError::Db(other.to_string()),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed CA storage.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - Every operation commits or rolls back as one transaction.
#[derive(Clone)]
pub struct SqliteCaStorage {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCaStorage {
    /// Opens the store at a registry location hint.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the directory, database, or schema
    /// cannot be created.
    pub fn open(location: &str) -> Result<Self, SqliteStoreError> {
        Self::new(SqliteStoreConfig::for_location(location))
    }

    /// Opens an `SQLite`-backed CA store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        debug!(path = %config.path.display(), "opened sqlite ca store");
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Runs `op` inside one transaction, committing on success.
    fn with_transaction<T>(
        &self,
        behavior: TransactionBehavior,
        op: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(behavior).map_err(db_error)?;
        let value = op(&tx)?;
        tx.commit().map_err(db_error)?;
        Ok(value)
    }

    /// Runs a read-only operation.
    fn read<T>(
        &self,
        op: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, StorageError> {
        Ok(self.with_transaction(TransactionBehavior::Deferred, op)?)
    }

    /// Runs a mutating operation holding the database write lock throughout.
    fn write<T>(
        &self,
        op: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, StorageError> {
        Ok(self.with_transaction(TransactionBehavior::Immediate, op)?)
    }
}

impl CaStorage for SqliteCaStorage {
    fn get_request(&self, request_id: &RequestId) -> Result<CertificateRequest, StorageError> {
        self.read(|tx| {
            fetch_request(tx, request_id)?
                .ok_or_else(|| SqliteStoreError::NotFound(format!("request {request_id}")))
        })
    }

    fn add_request(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        self.write(|tx| insert_request(tx, request))?;
        debug!(request_id = %request.request_id(), "stored certificate request");
        Ok(())
    }

    fn update_request(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        self.write(|tx| {
            let secrets = encode_challenge_secrets(request.challenge_secrets())?;
            let changed = tx
                .execute(
                    "UPDATE CertRequests SET status = ?1, challenge_type = ?2, \
                     challenge_secrets = ?3 WHERE request_id = ?4",
                    params![
                        request.status().as_str(),
                        request.challenge_type().as_str(),
                        secrets,
                        request.request_id().as_str(),
                    ],
                )
                .map_err(db_error)?;
            if changed == 0 {
                return insert_request(tx, request);
            }
            Ok(())
        })?;
        debug!(
            request_id = %request.request_id(),
            status = %request.status(),
            "updated certificate request"
        );
        Ok(())
    }

    fn delete_request(&self, request_id: &RequestId) -> Result<(), StorageError> {
        self.write(|tx| {
            tx.execute("DELETE FROM CertRequests WHERE request_id = ?1", params![
                request_id.as_str()
            ])
            .map_err(db_error)?;
            Ok(())
        })
    }

    fn get_certificate(&self, cert_id: &CertId) -> Result<IssuedCertificate, StorageError> {
        self.read(|tx| {
            let row = tx
                .query_row(
                    "SELECT cert_key_name, cert FROM IssuedCerts WHERE cert_id = ?1",
                    params![cert_id.as_str()],
                    |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)),
                )
                .optional()
                .map_err(db_error)?;
            let Some((key_name, encoded)) = row else {
                return Err(SqliteStoreError::NotFound(format!("certificate {cert_id}")));
            };
            let certificate = Certificate::new(decode_name("cert_key_name", &key_name)?, encoded);
            Ok(IssuedCertificate::new(cert_id.clone(), certificate))
        })
    }

    fn add_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        self.write(|tx| insert_certificate(tx, cert_id, certificate))?;
        debug!(cert_id = %cert_id, "stored issued certificate");
        Ok(())
    }

    fn update_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        self.write(|tx| {
            let current_key: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT cert_key_name FROM IssuedCerts WHERE cert_id = ?1",
                    params![cert_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?;
            let Some(current_key) = current_key else {
                return insert_certificate(tx, cert_id, certificate);
            };
            let key_name = certificate.key_name();
            let key_bytes = name_bytes(key_name);
            if current_key != key_bytes && request_key_exists(tx, &key_bytes)? {
                return Err(SqliteStoreError::Conflict(format!(
                    "pending request for {key_name} exists"
                )));
            }
            tx.execute(
                "UPDATE IssuedCerts SET cert_key_name = ?1, cert = ?2 WHERE cert_id = ?3",
                params![key_bytes, certificate.encoded(), cert_id.as_str()],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        debug!(cert_id = %cert_id, "updated issued certificate");
        Ok(())
    }

    fn delete_certificate(&self, cert_id: &CertId) -> Result<(), StorageError> {
        self.write(|tx| {
            tx.execute("DELETE FROM IssuedCerts WHERE cert_id = ?1", params![cert_id.as_str()])
                .map_err(db_error)?;
            Ok(())
        })
    }

    fn promote_request(
        &self,
        request_id: &RequestId,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        self.write(|tx| {
            let Some(request) = fetch_request(tx, request_id)? else {
                return Err(SqliteStoreError::NotFound(format!("request {request_id}")));
            };
            if request.key_name() != certificate.key_name() {
                return Err(SqliteStoreError::Invalid(format!(
                    "certificate key {} does not match request key {}",
                    certificate.key_name(),
                    request.key_name()
                )));
            }
            tx.execute("DELETE FROM CertRequests WHERE request_id = ?1", params![
                request_id.as_str()
            ])
            .map_err(db_error)?;
            insert_certificate(tx, cert_id, certificate)
        })?;
        debug!(request_id = %request_id, cert_id = %cert_id, "promoted request to certificate");
        Ok(())
    }

    fn list_requests(&self) -> Result<Vec<CertificateRequest>, StorageError> {
        self.read(|tx| {
            query_requests(
                tx,
                &format!("SELECT {REQUEST_COLUMNS} FROM CertRequests ORDER BY request_id"),
                None,
            )
        })
    }

    fn list_requests_for_ca(
        &self,
        ca_name: &Name,
    ) -> Result<Vec<CertificateRequest>, StorageError> {
        let ca_name = name_bytes(ca_name);
        self.read(|tx| {
            query_requests(
                tx,
                &format!(
                    "SELECT {REQUEST_COLUMNS} FROM CertRequests WHERE ca_name = ?1 \
                     ORDER BY request_id"
                ),
                Some(ca_name.as_slice()),
            )
        })
    }

    fn list_certificates(&self) -> Result<Vec<IssuedCertificate>, StorageError> {
        self.read(|tx| {
            let mut stmt = tx
                .prepare("SELECT cert_id, cert_key_name, cert FROM IssuedCerts ORDER BY cert_id")
                .map_err(db_error)?;
            let rows = stmt
                .query_map([], |row| {
                    let cert_id: String = row.get(0)?;
                    let key_name: Vec<u8> = row.get(1)?;
                    let encoded: Vec<u8> = row.get(2)?;
                    Ok((cert_id, key_name, encoded))
                })
                .map_err(db_error)?;
            let mut certificates = Vec::new();
            for row in rows {
                let (cert_id, key_name, encoded) = row.map_err(db_error)?;
                let certificate =
                    Certificate::new(decode_name("cert_key_name", &key_name)?, encoded);
                certificates.push(IssuedCertificate::new(CertId::new(cert_id), certificate));
            }
            Ok(certificates)
        })
    }
}

// ============================================================================
// SECTION: Registry Hooks
// ============================================================================

/// Registers the `SQLite` backend under [`STORAGE_TYPE`].
///
/// Open failures surface as [`StorageError::Init`].
///
/// # Errors
///
/// Returns [`RegistryError::AlreadyRegistered`] when the name is taken.
pub fn register_backend(registry: &mut StorageRegistry) -> Result<(), RegistryError> {
    registry.register_backend(STORAGE_TYPE, open_boxed)
}

/// Registers the `SQLite` backend in the process-wide registry.
///
/// Calling this more than once is not an error.
///
/// # Errors
///
/// Returns [`RegistryError::Poisoned`] when the registry lock is poisoned.
pub fn register_global_backend() -> Result<(), RegistryError> {
    match ca_ledger_core::register_global_backend(STORAGE_TYPE, open_boxed) {
        Ok(()) | Err(RegistryError::AlreadyRegistered(_)) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Registry constructor for the `SQLite` backend.
fn open_boxed(location: &str) -> Result<ca_ledger_core::BoxedCaStorage, StorageError> {
    let store =
        SqliteCaStorage::open(location).map_err(|err| StorageError::Init(err.to_string()))?;
    Ok(Box::new(store))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with read-write-create access.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies journal, sync, and busy timeout settings.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Creates the tables and indices when absent.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch(SCHEMA_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Encodes a name for the BLOB name columns.
fn name_bytes(name: &Name) -> Vec<u8> {
    name.to_uri().into_bytes()
}

/// Decodes a stored name column.
fn decode_name(column: &str, bytes: &[u8]) -> Result<Name, SqliteStoreError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| SqliteStoreError::Corrupt(format!("{column} is not utf-8")))?;
    Name::parse(text).map_err(|err| SqliteStoreError::Corrupt(format!("{column}: {err}")))
}

/// Raw `CertRequests` row.
struct RequestRow {
    /// `request_id` column.
    request_id: String,
    /// `ca_name` column.
    ca_name: Vec<u8>,
    /// `status` column.
    status: String,
    /// `cert_key_name` column.
    cert_key_name: Vec<u8>,
    /// `cert_request` column.
    cert_request: Vec<u8>,
    /// `challenge_type` column.
    challenge_type: Option<String>,
    /// `challenge_secrets` column.
    challenge_secrets: Option<String>,
}

impl RequestRow {
    /// Decodes the row into a request entity.
    fn into_request(self) -> Result<CertificateRequest, SqliteStoreError> {
        let ca_name = decode_name("ca_name", &self.ca_name)?;
        let key_name = decode_name("cert_key_name", &self.cert_key_name)?;
        let secrets = match self.challenge_secrets {
            Some(text) => decode_challenge_secrets(&text)?,
            None => ChallengeSecrets::new(),
        };
        Ok(CertificateRequest::with_challenge(
            ca_name,
            RequestId::new(self.request_id),
            RequestStatus::new(self.status),
            ChallengeType::new(self.challenge_type.unwrap_or_default()),
            secrets,
            Certificate::new(key_name, self.cert_request),
        ))
    }
}

/// Maps a `SQLite` row into a request row payload.
fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        request_id: row.get(0)?,
        ca_name: row.get(1)?,
        status: row.get(2)?,
        cert_key_name: row.get(3)?,
        cert_request: row.get(4)?,
        challenge_type: row.get(5)?,
        challenge_secrets: row.get(6)?,
    })
}

/// Loads one request by identifier.
fn fetch_request(
    tx: &Transaction<'_>,
    request_id: &RequestId,
) -> Result<Option<CertificateRequest>, SqliteStoreError> {
    let row = tx
        .query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM CertRequests WHERE request_id = ?1"),
            params![request_id.as_str()],
            map_request_row,
        )
        .optional()
        .map_err(db_error)?;
    row.map(RequestRow::into_request).transpose()
}

/// Runs a request query with an optional `ca_name` filter parameter.
fn query_requests(
    tx: &Transaction<'_>,
    sql: &str,
    ca_name: Option<&[u8]>,
) -> Result<Vec<CertificateRequest>, SqliteStoreError> {
    let mut stmt = tx.prepare(sql).map_err(db_error)?;
    let rows = match ca_name {
        Some(ca_name) => stmt.query_map(params![ca_name], map_request_row),
        None => stmt.query_map([], map_request_row),
    }
    .map_err(db_error)?;
    let mut requests = Vec::new();
    for row in rows {
        requests.push(row.map_err(db_error)?.into_request()?);
    }
    Ok(requests)
}

/// Returns true when a pending request holds the encoded key name.
fn request_key_exists(tx: &Transaction<'_>, key_name: &[u8]) -> Result<bool, SqliteStoreError> {
    tx.query_row("SELECT 1 FROM CertRequests WHERE cert_key_name = ?1", params![key_name], |_| {
        Ok(())
    })
    .optional()
    .map(|row| row.is_some())
    .map_err(db_error)
}

/// Returns true when an issued certificate holds the encoded key name.
fn certificate_key_exists(
    tx: &Transaction<'_>,
    key_name: &[u8],
) -> Result<bool, SqliteStoreError> {
    tx.query_row("SELECT 1 FROM IssuedCerts WHERE cert_key_name = ?1", params![key_name], |_| {
        Ok(())
    })
    .optional()
    .map(|row| row.is_some())
    .map_err(db_error)
}

/// Inserts a request after checking both tables for its key name.
fn insert_request(
    tx: &Transaction<'_>,
    request: &CertificateRequest,
) -> Result<(), SqliteStoreError> {
    let key_name = request.key_name();
    let key_bytes = name_bytes(key_name);
    if request_key_exists(tx, &key_bytes)? {
        return Err(SqliteStoreError::Conflict(format!("request for {key_name} already exists")));
    }
    if certificate_key_exists(tx, &key_bytes)? {
        return Err(SqliteStoreError::Conflict(format!("cert for {key_name} already exists")));
    }
    let secrets = encode_challenge_secrets(request.challenge_secrets())?;
    tx.execute(
        "INSERT INTO CertRequests (request_id, ca_name, status, cert_key_name, cert_request, \
         challenge_type, challenge_secrets) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            request.request_id().as_str(),
            name_bytes(request.ca_name()),
            request.status().as_str(),
            key_bytes,
            request.cert_request().encoded(),
            request.challenge_type().as_str(),
            secrets,
        ],
    )
    .map_err(db_error)?;
    Ok(())
}

/// Inserts a certificate after checking both tables for its key name.
fn insert_certificate(
    tx: &Transaction<'_>,
    cert_id: &CertId,
    certificate: &Certificate,
) -> Result<(), SqliteStoreError> {
    let key_name = certificate.key_name();
    let key_bytes = name_bytes(key_name);
    if certificate_key_exists(tx, &key_bytes)? {
        return Err(SqliteStoreError::Conflict(format!("cert for {key_name} already exists")));
    }
    if request_key_exists(tx, &key_bytes)? {
        return Err(SqliteStoreError::Conflict(format!("pending request for {key_name} exists")));
    }
    tx.execute(
        "INSERT INTO IssuedCerts (cert_id, cert_key_name, cert) VALUES (?1, ?2, ?3)",
        params![cert_id.as_str(), key_bytes, certificate.encoded()],
    )
    .map_err(db_error)?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts for clarity."
    )]

    use std::path::Path;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    use ca_ledger_core::CaStorage;
    use ca_ledger_core::RequestId;
    use ca_ledger_core::StorageError;

    use super::DATABASE_FILE_NAME;
    use super::DEFAULT_DIRECTORY_NAME;
    use super::SqliteCaStorage;
    use super::SqliteStoreConfig;
    use super::resolve_database_dir;

    #[test]
    fn explicit_location_wins() {
        let dir = resolve_database_dir("/srv/ca", Some(Path::new("/home/ca")));
        assert_eq!(dir, PathBuf::from("/srv/ca"));
    }

    #[test]
    fn empty_location_uses_home() {
        let dir = resolve_database_dir("", Some(Path::new("/home/ca")));
        assert_eq!(dir, Path::new("/home/ca").join(DEFAULT_DIRECTORY_NAME));
    }

    #[test]
    fn missing_home_uses_working_directory() {
        let dir = resolve_database_dir("", None);
        assert_eq!(dir, Path::new(".").join(DEFAULT_DIRECTORY_NAME));
    }

    #[test]
    fn poisoned_connection_reports_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            SqliteCaStorage::new(SqliteStoreConfig::new(dir.path().join(DATABASE_FILE_NAME)))
                .unwrap();
        let connection = Arc::clone(&store.connection);
        let poisoner = thread::spawn(move || {
            let _guard = connection.lock().unwrap();
            panic!("poison the connection mutex");
        });
        assert!(poisoner.join().is_err());

        let storage: &dyn CaStorage = &store;
        let err = storage.get_request(&RequestId::new("r1")).unwrap_err();
        assert!(matches!(err, StorageError::Store(_)));
    }
}
