use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BillStatus, CreateBill, Currency, Engine, EngineError, Money, NewBillItem, ObligationStatus,
    SplitStrategy,
};
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

fn inr(minor: i64) -> Money {
    Money::new(minor, Currency::Inr)
}

fn equal_bill(participants: &[&str], subtotal: i64, tax: i64, total: i64) -> CreateBill {
    CreateBill {
        creator: "alice".to_string(),
        merchant_name: "Cafe Azzurro".to_string(),
        items: vec![],
        subtotal: inr(subtotal),
        tax: inr(tax),
        tip: inr(0),
        total: inr(total),
        participants: participants.iter().map(|p| p.to_string()).collect(),
        strategy: SplitStrategy::Equal,
        ocr_data: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn create_bill_persists_shares_and_obligations() {
    let (engine, _db) = engine_with_db().await;

    // 100.00 INR, three ways: 33.34 / 33.33 / 33.33, remainder to the creator.
    let bill = engine
        .create_bill(equal_bill(&["bob", "carol"], 9500, 500, 10_000))
        .await
        .unwrap();

    let details = engine.bill_with_details(bill.id, "alice").await.unwrap();
    let shares: Vec<i64> = details.participants.iter().map(|p| p.share.minor()).collect();
    assert_eq!(shares.iter().sum::<i64>(), 10_000);
    assert!(shares.contains(&3334));

    let obligations = engine.obligations_for_bill(bill.id).await.unwrap();
    assert_eq!(obligations.len(), 2);
    assert!(obligations.iter().all(|o| o.payee == "alice"));
    assert!(obligations.iter().all(|o| o.status == ObligationStatus::Pending));
    assert!(obligations.iter().all(|o| o.amount.minor() == 3333));
}

#[tokio::test]
async fn invalid_totals_leave_nothing_behind() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_bill(equal_bill(&["bob"], 9500, 500, 12_000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTotals(_)));

    assert!(engine.bills_for_user("alice").await.unwrap().is_empty());
    assert!(engine.bills_for_user("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn by_item_bill_records_expense_splits() {
    let (engine, db) = engine_with_db().await;

    let command = CreateBill {
        creator: "alice".to_string(),
        merchant_name: "Dhaba 52".to_string(),
        items: vec![
            NewBillItem {
                name: "thali".to_string(),
                unit_price: inr(6000),
                quantity: 1,
            },
            NewBillItem {
                name: "lassi".to_string(),
                unit_price: inr(2000),
                quantity: 2,
            },
        ],
        subtotal: inr(10_000),
        tax: inr(1000),
        tip: inr(0),
        total: inr(11_000),
        participants: vec!["bob".to_string()],
        strategy: SplitStrategy::ByItem(vec![
            engine::ItemAssignment {
                item_index: 0,
                participants: vec!["alice".to_string()],
                weights: None,
            },
            engine::ItemAssignment {
                item_index: 1,
                participants: vec!["bob".to_string()],
                weights: None,
            },
        ]),
        ocr_data: Some("{\"source\":\"receipt\"}".to_string()),
        created_at: Utc::now(),
    };
    let bill = engine.create_bill(command).await.unwrap();

    // Tax follows the 60/40 item split.
    let details = engine.bill_with_details(bill.id, "bob").await.unwrap();
    let bob = details
        .participants
        .iter()
        .find(|p| p.user == "bob")
        .unwrap();
    assert_eq!(bob.share.minor(), 4400);

    let backend = db.get_database_backend();
    let splits = db
        .query_all(Statement::from_string(
            backend,
            "SELECT share_minor FROM expense_splits".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(splits.len(), 2);
}

#[tokio::test]
async fn bill_details_hidden_from_strangers() {
    let (engine, _db) = engine_with_db().await;
    let bill = engine
        .create_bill(equal_bill(&["bob"], 1000, 0, 1000))
        .await
        .unwrap();

    let err = engine.bill_with_details(bill.id, "carol").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn cancel_bill_voids_pending_obligations() {
    let (engine, _db) = engine_with_db().await;
    let bill = engine
        .create_bill(equal_bill(&["bob", "carol"], 9000, 0, 9000))
        .await
        .unwrap();

    engine.cancel_bill(bill.id, "alice").await.unwrap();

    let details = engine.bill_with_details(bill.id, "alice").await.unwrap();
    assert_eq!(details.bill.status, BillStatus::Cancelled);
    let obligations = engine.obligations_for_bill(bill.id).await.unwrap();
    assert!(obligations
        .iter()
        .all(|o| o.status == ObligationStatus::Cancelled));

    // Cancelling again is a no-op.
    engine.cancel_bill(bill.id, "alice").await.unwrap();

    // Non-creators cannot cancel.
    let err = engine.cancel_bill(bill.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn balance_between_tracks_pending_only() {
    let (engine, _db) = engine_with_db().await;
    let bill = engine
        .create_bill(equal_bill(&["bob"], 9000, 0, 9000))
        .await
        .unwrap();

    let balance = engine.balance_between("bob", "alice").await.unwrap();
    assert_eq!(balance.owes.minor(), 4500);
    assert_eq!(balance.owed_to.minor(), 0);
    assert_eq!(balance.net().unwrap().minor(), -4500);

    engine.cancel_bill(bill.id, "alice").await.unwrap();
    let balance = engine.balance_between("bob", "alice").await.unwrap();
    assert!(balance.owes.is_zero());
}

#[tokio::test]
async fn bills_for_user_lists_created_and_joined() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_bill(equal_bill(&["bob"], 1000, 0, 1000))
        .await
        .unwrap();

    let mut as_bob = equal_bill(&["alice"], 2000, 0, 2000);
    as_bob.creator = "bob".to_string();
    engine.create_bill(as_bob).await.unwrap();

    assert_eq!(engine.bills_for_user("alice").await.unwrap().len(), 2);
    assert_eq!(engine.bills_for_user("bob").await.unwrap().len(), 2);
    assert!(engine.bills_for_user("carol").await.unwrap().is_empty());
}
