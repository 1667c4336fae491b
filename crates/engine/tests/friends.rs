use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineError, FriendStatus};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in ["alice", "bob", "carol"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, display_name) VALUES (?, ?, ?)",
            vec![user.into(), "password".into(), user.into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .gateway_secret(b"merchant-key".to_vec())
        .build()
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn accepting_a_request_makes_friendship_symmetric() {
    let (engine, _db) = engine_with_db().await;

    engine
        .request_friendship("alice", "bob", Utc::now())
        .await
        .unwrap();

    let requests = engine.requests_for("bob").await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].requester, "alice");
    assert_eq!(requests[0].status, FriendStatus::Pending);

    engine
        .accept_friendship("bob", "alice", Utc::now())
        .await
        .unwrap();

    assert_eq!(engine.friends_of("alice").await.unwrap(), vec!["bob"]);
    assert_eq!(engine.friends_of("bob").await.unwrap(), vec!["alice"]);
    assert!(engine.requests_for("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_and_reversed_requests_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    engine
        .request_friendship("alice", "bob", Utc::now())
        .await
        .unwrap();

    let err = engine
        .request_friendship("alice", "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .request_friendship("bob", "alice", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn self_friendship_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .request_friendship("alice", "alice", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn accepting_without_a_pending_request_fails() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .accept_friendship("bob", "alice", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn blocked_users_are_not_listed_as_friends() {
    let (engine, _db) = engine_with_db().await;

    engine
        .request_friendship("alice", "bob", Utc::now())
        .await
        .unwrap();
    engine
        .accept_friendship("bob", "alice", Utc::now())
        .await
        .unwrap();

    // A block in one direction hides the pair for both sides.
    engine.block_user("alice", "bob", Utc::now()).await.unwrap();
    assert!(engine.friends_of("alice").await.unwrap().is_empty());
    assert!(engine.friends_of("bob").await.unwrap().is_empty());
}
