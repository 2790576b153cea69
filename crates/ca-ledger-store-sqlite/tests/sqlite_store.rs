// crates/ca-ledger-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite CA Store Tests
// Description: Validate SqliteCaStorage against the storage contract.
// Purpose: Ensure uniqueness, upsert, durability, and corruption handling.
// Dependencies: ca-ledger-core, ca-ledger-store-sqlite, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Contract tests for the `SQLite` backend:
//! - Request and certificate round-trips and upsert behavior
//! - Cross-table key name uniqueness
//! - Atomic promotion and rollback
//! - Persistence across reopen and corrupt row detection

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::thread;

use ca_ledger_core::CaStorage;
use ca_ledger_core::ChallengeType;
use ca_ledger_core::RequestStatus;
use ca_ledger_core::StorageError;
use ca_ledger_core::status;
use ca_ledger_store_sqlite::SqliteCaStorage;
use ca_ledger_store_sqlite::SqliteStoreConfig;
use ca_ledger_store_sqlite::SqliteStoreError;
use ca_ledger_store_sqlite::SqliteStoreMode;
use ca_ledger_store_sqlite::SqliteSyncMode;
use common::certificate_for;
use common::cid;
use common::database_path;
use common::name;
use common::open_in;
use common::request;
use common::rid;
use common::temp_store;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Requests
// ============================================================================

#[test]
fn request_round_trips_with_challenge_state() {
    let (_dir, store) = temp_store();
    let mut pending = request("r1", "/ca", "/ca/KEY/1");
    pending.set_status(RequestStatus::new(status::CHALLENGE_PENDING));
    let secrets = json!({"code": "5f2a", "attempts": 3, "nested": {"ok": true}});
    pending.set_challenge(ChallengeType::new("PIN"), secrets.as_object().cloned().unwrap());
    store.add_request(&pending).unwrap();
    assert_eq!(store.get_request(&rid("r1")).unwrap(), pending);
}

#[test]
fn new_request_scenario_then_issued_key_conflicts() {
    let (_dir, store) = temp_store();
    let original = request("r1", "/ca", "/ca/KEY/1");
    store.add_request(&original).unwrap();
    let loaded = store.get_request(&rid("r1")).unwrap();
    assert_eq!(loaded, original);
    assert!(loaded.challenge_type().is_unset());
    assert!(loaded.challenge_secrets().is_empty());

    let signed = certificate_for("/ca/KEY/1", "signed");
    store.promote_request(&rid("r1"), &cid("c1"), &signed).unwrap();
    let err = store.add_request(&request("r2", "/ca", "/ca/KEY/1")).unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn direct_certificate_for_pending_key_conflicts() {
    let (_dir, store) = temp_store();
    let original = request("r1", "/ca", "/ca/KEY/1");
    store.add_request(&original).unwrap();
    assert_eq!(store.get_request(&rid("r1")).unwrap(), original);

    let err = store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/1", "signed"));
    assert!(matches!(err, Err(StorageError::Conflict(_))));
    assert!(store.get_certificate(&cid("c1")).unwrap_err().is_not_found());

    let err = store.add_request(&request("r2", "/ca", "/ca/KEY/1")).unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(store.list_requests().unwrap(), vec![original]);
}

#[test]
fn float_secrets_survive_storage() {
    let (_dir, store) = temp_store();
    let mut pending = request("r1", "/ca", "/ca/KEY/1");
    let secrets = json!({"score": 3.0, "offset": -0.0, "count": 3, "max": u64::MAX});
    pending.set_challenge(ChallengeType::new("PIN"), secrets.as_object().cloned().unwrap());
    store.add_request(&pending).unwrap();
    let loaded = store.get_request(&rid("r1")).unwrap();
    assert_eq!(loaded, pending);
    assert!(loaded.challenge_secrets()["score"].is_f64());
    assert!(loaded.challenge_secrets()["offset"].as_f64().unwrap().is_sign_negative());
}

#[test]
fn second_request_for_same_key_conflicts_and_keeps_first() {
    let (_dir, store) = temp_store();
    let first = request("r1", "/ca", "/ca/KEY/1");
    store.add_request(&first).unwrap();
    let err = store.add_request(&request("r2", "/ca", "/ca/KEY/1")).unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(store.get_request(&rid("r1")).unwrap(), first);
    assert!(store.get_request(&rid("r2")).unwrap_err().is_not_found());
}

#[test]
fn duplicate_request_id_conflicts_through_unique_index() {
    let (_dir, store) = temp_store();
    store.add_request(&request("r1", "/ca", "/ca/KEY/1")).unwrap();
    let err = store.add_request(&request("r1", "/ca", "/ca/KEY/2")).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.list_requests().unwrap().len(), 1);
}

#[test]
fn update_missing_request_inserts_exact_fields() {
    let (_dir, store) = temp_store();
    let mut pending = request("r1", "/ca", "/ca/KEY/1");
    pending.set_status(RequestStatus::new(status::CHALLENGE_PENDING));
    pending.set_challenge(
        ChallengeType::new("EMAIL"),
        json!({"email": "a@example.com"}).as_object().cloned().unwrap(),
    );
    store.update_request(&pending).unwrap();
    assert_eq!(store.get_request(&rid("r1")).unwrap(), pending);
}

#[test]
fn update_existing_request_replaces_challenge_state() {
    let (_dir, store) = temp_store();
    let original = request("r1", "/ca", "/ca/KEY/1");
    store.add_request(&original).unwrap();
    let mut updated = original.clone();
    updated.set_status(RequestStatus::new(status::CHALLENGE_FAILURE));
    let secrets = json!({"attempts": 0}).as_object().cloned().unwrap();
    updated.set_challenge(ChallengeType::new("PIN"), secrets);
    store.update_request(&updated).unwrap();
    assert_eq!(store.get_request(&rid("r1")).unwrap(), updated);
}

#[test]
fn deleting_missing_rows_leaves_others() {
    let (_dir, store) = temp_store();
    store.add_request(&request("r1", "/ca", "/ca/KEY/1")).unwrap();
    store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/2", "cert")).unwrap();
    store.delete_request(&rid("missing")).unwrap();
    store.delete_certificate(&cid("missing")).unwrap();
    assert!(store.get_request(&rid("r1")).is_ok());
    assert!(store.get_certificate(&cid("c1")).is_ok());
    store.delete_request(&rid("r1")).unwrap();
    assert!(store.get_request(&rid("r1")).unwrap_err().is_not_found());
}

// ============================================================================
// SECTION: Certificates
// ============================================================================

#[test]
fn update_certificate_replaces_blob() {
    let (_dir, store) = temp_store();
    store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/1", "original")).unwrap();
    let replacement = certificate_for("/ca/KEY/1", "replacement");
    store.update_certificate(&cid("c1"), &replacement).unwrap();
    let issued = store.get_certificate(&cid("c1")).unwrap();
    assert_eq!(issued.certificate.encoded(), b"replacement");
}

#[test]
fn update_missing_certificate_inserts_it() {
    let (_dir, store) = temp_store();
    let certificate = certificate_for("/ca/KEY/9", "fresh");
    store.update_certificate(&cid("c9"), &certificate).unwrap();
    assert_eq!(store.get_certificate(&cid("c9")).unwrap().certificate, certificate);
}

#[test]
fn update_certificate_rejects_key_held_elsewhere() {
    let (_dir, store) = temp_store();
    store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/1", "a")).unwrap();
    store.add_certificate(&cid("c2"), &certificate_for("/ca/KEY/2", "b")).unwrap();
    store.add_request(&request("r3", "/ca", "/ca/KEY/3")).unwrap();
    let taken = store.update_certificate(&cid("c1"), &certificate_for("/ca/KEY/2", "x"));
    assert!(taken.unwrap_err().is_conflict());
    let pending = store.update_certificate(&cid("c1"), &certificate_for("/ca/KEY/3", "x"));
    assert!(pending.unwrap_err().is_conflict());
    assert_eq!(store.get_certificate(&cid("c1")).unwrap().certificate.encoded(), b"a");
}

#[test]
fn add_certificate_checks_both_tables() {
    let (_dir, store) = temp_store();
    store.add_request(&request("r1", "/ca", "/ca/KEY/1")).unwrap();
    store.add_certificate(&cid("c2"), &certificate_for("/ca/KEY/2", "b")).unwrap();
    let pending = store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/1", "x"));
    assert!(pending.unwrap_err().is_conflict());
    let issued = store.add_certificate(&cid("c3"), &certificate_for("/ca/KEY/2", "x"));
    assert!(issued.unwrap_err().is_conflict());
    let same_id = store.add_certificate(&cid("c2"), &certificate_for("/ca/KEY/4", "x"));
    assert!(same_id.unwrap_err().is_conflict());
}

#[test]
fn get_missing_certificate_is_not_found() {
    let (_dir, store) = temp_store();
    assert!(store.get_certificate(&cid("nope")).unwrap_err().is_not_found());
}

// ============================================================================
// SECTION: Promotion
// ============================================================================

#[test]
fn promote_replaces_request_with_certificate() {
    let (_dir, store) = temp_store();
    store.add_request(&request("r1", "/ca", "/ca/KEY/1")).unwrap();
    let certificate = certificate_for("/ca/KEY/1", "signed");
    store.promote_request(&rid("r1"), &cid("c1"), &certificate).unwrap();
    assert!(store.get_request(&rid("r1")).unwrap_err().is_not_found());
    assert_eq!(store.get_certificate(&cid("c1")).unwrap().certificate, certificate);
}

#[test]
fn failed_promotion_rolls_back() {
    let (_dir, store) = temp_store();
    store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/0", "other")).unwrap();
    let pending = request("r1", "/ca", "/ca/KEY/1");
    store.add_request(&pending).unwrap();

    let mismatch = store
        .promote_request(&rid("r1"), &cid("c2"), &certificate_for("/ca/KEY/2", "signed"))
        .unwrap_err();
    assert!(matches!(mismatch, StorageError::Invalid(_)));

    let taken_id = store
        .promote_request(&rid("r1"), &cid("c1"), &certificate_for("/ca/KEY/1", "signed"))
        .unwrap_err();
    assert!(taken_id.is_conflict());
    assert_eq!(store.get_request(&rid("r1")).unwrap(), pending);
    assert_eq!(store.list_certificates().unwrap().len(), 1);

    let missing = store
        .promote_request(&rid("r9"), &cid("c9"), &certificate_for("/ca/KEY/9", "signed"))
        .unwrap_err();
    assert!(missing.is_not_found());
}

// ============================================================================
// SECTION: Listing
// ============================================================================

#[test]
fn lists_are_ordered_and_filtered() {
    let (_dir, store) = temp_store();
    store.add_request(&request("r2", "/ca/b", "/ca/b/KEY/1")).unwrap();
    store.add_request(&request("r1", "/ca/a", "/ca/a/KEY/1")).unwrap();
    store.add_request(&request("r3", "/ca/a", "/ca/a/KEY/2")).unwrap();
    store.add_certificate(&cid("c2"), &certificate_for("/ca/KEY/2", "b")).unwrap();
    store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/1", "a")).unwrap();

    let ids: Vec<String> =
        store.list_requests().unwrap().iter().map(|r| r.request_id().to_string()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);
    let for_a: Vec<String> = store
        .list_requests_for_ca(&name("/ca/a"))
        .unwrap()
        .iter()
        .map(|r| r.request_id().to_string())
        .collect();
    assert_eq!(for_a, vec!["r1", "r3"]);
    let certs: Vec<String> =
        store.list_certificates().unwrap().iter().map(|c| c.cert_id.to_string()).collect();
    assert_eq!(certs, vec!["c1", "c2"]);
}

// ============================================================================
// SECTION: Durability
// ============================================================================

#[test]
fn rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let pending = request("r1", "/ca", "/ca/KEY/1");
    {
        let store = open_in(&dir);
        store.add_request(&pending).unwrap();
        store.add_certificate(&cid("c2"), &certificate_for("/ca/KEY/2", "cert")).unwrap();
    }
    let reopened = open_in(&dir);
    assert_eq!(reopened.get_request(&rid("r1")).unwrap(), pending);
    assert_eq!(reopened.get_certificate(&cid("c2")).unwrap().certificate.encoded(), b"cert");
}

#[test]
fn explicit_config_applies_pragmas() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(database_path(&dir));
    config.journal_mode = SqliteStoreMode::Delete;
    config.sync_mode = SqliteSyncMode::Normal;
    config.busy_timeout_ms = 250;
    let store = SqliteCaStorage::new(config.clone()).unwrap();
    assert_eq!(store.config(), &config);
    store.add_request(&request("r1", "/ca", "/ca/KEY/1")).unwrap();
    let connection = Connection::open(database_path(&dir)).unwrap();
    let mode: String = connection.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(mode, "delete");
}

#[test]
fn default_config_uses_wal() {
    let (dir, _store) = temp_store();
    let connection = Connection::open(database_path(&dir)).unwrap();
    let mode: String = connection.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(mode, "wal");
}

#[test]
fn directory_as_database_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = SqliteCaStorage::new(SqliteStoreConfig::new(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn concurrent_writers_share_one_store() {
    let (_dir, store) = temp_store();
    let handles: Vec<_> = (0 .. 8)
        .map(|index| {
            let store = store.clone();
            thread::spawn(move || {
                let id = format!("r{index}");
                let key = format!("/ca/KEY/{index}");
                store.add_request(&request(&id, "/ca", &key)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.list_requests().unwrap().len(), 8);
}

// ============================================================================
// SECTION: Corruption
// ============================================================================

#[test]
fn malformed_challenge_secrets_are_corrupt() {
    let (dir, store) = temp_store();
    store.add_request(&request("r1", "/ca", "/ca/KEY/1")).unwrap();
    store.add_request(&request("r2", "/ca", "/ca/KEY/2")).unwrap();
    let connection = Connection::open(database_path(&dir)).unwrap();
    connection
        .execute("UPDATE CertRequests SET challenge_secrets = ?1 WHERE request_id = ?2", params![
            "{not json", "r1"
        ])
        .unwrap();
    connection
        .execute("UPDATE CertRequests SET challenge_secrets = ?1 WHERE request_id = ?2", params![
            "[1, 2]", "r2"
        ])
        .unwrap();
    assert!(matches!(store.get_request(&rid("r1")), Err(StorageError::Corrupt(_))));
    assert!(matches!(store.get_request(&rid("r2")), Err(StorageError::Corrupt(_))));
    assert!(matches!(store.list_requests(), Err(StorageError::Corrupt(_))));
}

#[test]
fn undecodable_name_is_corrupt() {
    let (dir, store) = temp_store();
    store.add_certificate(&cid("c1"), &certificate_for("/ca/KEY/1", "cert")).unwrap();
    let connection = Connection::open(database_path(&dir)).unwrap();
    connection
        .execute("UPDATE IssuedCerts SET cert_key_name = ?1 WHERE cert_id = ?2", params![
            vec![0xFF_u8, 0xFE],
            "c1"
        ])
        .unwrap();
    assert!(matches!(store.get_certificate(&cid("c1")), Err(StorageError::Corrupt(_))));
}

#[test]
fn null_challenge_columns_read_as_unset() {
    let (dir, store) = temp_store();
    let connection = Connection::open(database_path(&dir)).unwrap();
    connection
        .execute(
            "INSERT INTO CertRequests (request_id, ca_name, status, cert_key_name, cert_request) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params!["r1", b"/ca".to_vec(), "NEW", b"/ca/KEY/1".to_vec(), b"csr".to_vec()],
        )
        .unwrap();
    let loaded = store.get_request(&rid("r1")).unwrap();
    assert!(loaded.challenge_type().is_unset());
    assert!(loaded.challenge_secrets().is_empty());
    assert_eq!(loaded.key_name(), &name("/ca/KEY/1"));
    assert_eq!(loaded.cert_request().encoded(), b"csr");
}
