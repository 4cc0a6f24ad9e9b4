//! Integration tests for the token authority over a real `SQLite` database.

mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use autoattach_core::token::{ManualClock, TokenLifetimes};
use autoattach_core::{AccountId, Deadline, SqliteTokenStore, TokenAuthority, TokenType};

const START: i64 = 1_700_000_000;

fn authority(store: SqliteTokenStore, clock: Arc<ManualClock>) -> TokenAuthority {
    TokenAuthority::new(Arc::new(store)).with_clock(clock)
}

#[tokio::test]
async fn test_issued_token_validates_until_consumed() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let clock = Arc::new(ManualClock::new(START));
    let tokens = authority(SqliteTokenStore::new(db), clock);
    let deadline = Deadline::none();
    let account = AccountId::new(7);

    let token = tokens
        .issue(account, TokenType::DownloadAuthorization, &deadline)
        .await
        .expect("issue");

    assert!(
        tokens
            .validate(account, &token, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap()
    );
    // Validation never consumes.
    assert!(
        tokens
            .validate(account, &token, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap()
    );
    assert!(
        tokens
            .validate_and_consume(account, &token, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap()
    );
    assert!(
        !tokens
            .validate(account, &token, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_token_is_scoped_to_account_and_type() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let tokens = authority(SqliteTokenStore::new(db), Arc::new(ManualClock::new(START)));
    let deadline = Deadline::none();
    let owner = AccountId::new(1);

    let token = tokens
        .issue(owner, TokenType::LoginIntercept, &deadline)
        .await
        .unwrap();

    assert!(
        !tokens
            .validate(AccountId::new(2), &token, TokenType::LoginIntercept, &deadline)
            .await
            .unwrap()
    );
    assert!(
        !tokens
            .validate_and_consume(owner, &token, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap()
    );
    // The failed cross-type redemption left the token intact.
    assert!(
        tokens
            .validate_and_consume(owner, &token, TokenType::LoginIntercept, &deadline)
            .await
            .unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_has_exactly_one_winner() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let tokens = TokenAuthority::new(Arc::new(SqliteTokenStore::new(db)));
    let account = AccountId::new(11);
    let token = tokens
        .issue(account, TokenType::LoginIntercept, &Deadline::none())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tokens = tokens.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            tokens
                .validate_and_consume(account, &token, TokenType::LoginIntercept, &Deadline::none())
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_expiry_follows_type_lifetime() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let clock = Arc::new(ManualClock::new(START));
    let tokens = authority(SqliteTokenStore::new(db), clock.clone());
    let deadline = Deadline::none();
    let account = AccountId::new(3);

    let login = tokens
        .issue(account, TokenType::LoginIntercept, &deadline)
        .await
        .unwrap();
    let download = tokens
        .issue(account, TokenType::DownloadAuthorization, &deadline)
        .await
        .unwrap();

    clock.advance(Duration::from_secs(2 * 3600));

    assert!(
        !tokens
            .validate(account, &login, TokenType::LoginIntercept, &deadline)
            .await
            .unwrap(),
        "login-intercept tokens live for one hour"
    );
    assert!(
        tokens
            .validate(account, &download, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap(),
        "download tokens live for a day"
    );
}

#[tokio::test]
async fn test_custom_lifetimes_apply() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let clock = Arc::new(ManualClock::new(START));
    let tokens = authority(SqliteTokenStore::new(db), clock.clone()).with_lifetimes(
        TokenLifetimes {
            download_authorization: Duration::from_secs(600),
            login_intercept: Duration::from_secs(60),
        },
    );
    let deadline = Deadline::none();
    let account = AccountId::new(4);
    let token = tokens
        .issue(account, TokenType::DownloadAuthorization, &deadline)
        .await
        .unwrap();

    clock.advance(Duration::from_secs(600));

    assert!(
        !tokens
            .validate_and_consume(account, &token, TokenType::DownloadAuthorization, &deadline)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_sweep_removes_only_expired_rows() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let store = SqliteTokenStore::new(db.clone());
    let clock = Arc::new(ManualClock::new(START));
    let tokens = authority(store.clone(), clock.clone());
    let deadline = Deadline::none();
    let account = AccountId::new(5);

    for _ in 0..3 {
        tokens
            .issue(account, TokenType::LoginIntercept, &deadline)
            .await
            .unwrap();
    }
    clock.advance(Duration::from_secs(3601));
    let fresh = tokens
        .issue(account, TokenType::LoginIntercept, &deadline)
        .await
        .unwrap();
    tokens
        .issue(account, TokenType::DownloadAuthorization, &deadline)
        .await
        .unwrap();

    let removed = tokens.sweep_expired(&deadline).await.unwrap();

    assert_eq!(removed, 3);
    assert_eq!(
        store.count_by_type(TokenType::LoginIntercept).await.unwrap(),
        1
    );
    assert_eq!(
        store
            .count_by_type(TokenType::DownloadAuthorization)
            .await
            .unwrap(),
        1
    );
    assert!(
        tokens
            .validate(account, &fresh, TokenType::LoginIntercept, &deadline)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_tokens_survive_reopening_the_database() {
    let (db, temp_dir) = support::setup_test_db().await;
    let clock = Arc::new(ManualClock::new(START));
    let account = AccountId::new(9);
    let token = authority(SqliteTokenStore::new(db.clone()), clock.clone())
        .issue(account, TokenType::DownloadAuthorization, &Deadline::none())
        .await
        .unwrap();
    db.close().await;

    let reopened = autoattach_core::Database::new(&support::db_path(&temp_dir))
        .await
        .unwrap();
    let tokens = authority(SqliteTokenStore::new(reopened), clock);
    assert!(
        tokens
            .validate_and_consume(
                account,
                &token,
                TokenType::DownloadAuthorization,
                &Deadline::none()
            )
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_repeated_issue_yields_distinct_identifiers() {
    let (db, _temp_dir) = support::setup_test_db().await;
    let store = SqliteTokenStore::new(db);
    let tokens = authority(store.clone(), Arc::new(ManualClock::new(START)));
    let account = AccountId::new(12);

    let mut seen = HashSet::new();
    for _ in 0..200 {
        let token = tokens
            .issue(account, TokenType::DownloadAuthorization, &Deadline::none())
            .await
            .unwrap();
        seen.insert(token.expose().to_string());
    }

    assert_eq!(seen.len(), 200);
    assert_eq!(
        store
            .count_by_type(TokenType::DownloadAuthorization)
            .await
            .unwrap(),
        200
    );
}
