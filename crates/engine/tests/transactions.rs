use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait};

use engine::{
    AccountId, Amount, Balance, Counterparty, Engine, EngineError, NewAccount, NewTransaction,
    Payee, PayeeId, ValidTo,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn seeded(db: &DatabaseConnection) -> Engine {
    migration::Migrator::up(db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    engine
        .create_accounts(vec![
            NewAccount::new("Checking").id("A1"),
            NewAccount::new("Savings").id("A2"),
        ])
        .await
        .unwrap();
    engine
        .create_payees(vec![Payee::new("Grocer").id("P1")])
        .await
        .unwrap();
    engine
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    (seeded(&db).await, db)
}

async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    (seeded(&db).await, db, path)
}

async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

async fn balance(engine: &Engine, id: &str) -> Balance {
    engine.account(&AccountId::from(id)).await.unwrap().balance
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

#[tokio::test]
async fn external_transaction_updates_cleared_balance() {
    let (engine, db) = engine_with_db().await;

    let created = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 1000).cleared(true),
        ])
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(count_rows(&db, "transactions").await, 1);
    assert_eq!(
        balance(&engine, "A1").await,
        Balance::new(Amount::new(1000), Amount::ZERO)
    );
    assert_eq!(balance(&engine, "A2").await, Balance::ZERO);
}

#[tokio::test]
async fn transfer_writes_mirror_and_moves_money() {
    let (engine, db) = engine_with_db().await;

    let created = engine
        .create_transactions(vec![
            NewTransaction::transfer(date(), "A1", "A2", -500)
                .cleared(true)
                .id("t-1"),
        ])
        .await
        .unwrap();

    assert_eq!(created.len(), 2);
    assert_eq!(created[0].id.as_str(), "t-1");
    let mirror = &created[1];
    assert_eq!(mirror.account_id, AccountId::from("A2"));
    assert_eq!(
        mirror.payee,
        Counterparty::Internal {
            account_id: AccountId::from("A1")
        }
    );
    assert_eq!(mirror.amount, Amount::new(500));
    assert!(mirror.cleared);
    assert_eq!(count_rows(&db, "transactions").await, 2);

    let a1 = balance(&engine, "A1").await;
    let a2 = balance(&engine, "A2").await;
    assert_eq!(a1.cleared, Amount::new(-500));
    assert_eq!(a2.cleared, Amount::new(500));
    assert_eq!(a1.checked_add(a2).unwrap().total(), Some(Amount::ZERO));
}

#[tokio::test]
async fn unknown_account_is_rejected_without_writes() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 10).cleared(true),
            NewTransaction::external(date(), "acc-404", "P1", 20),
        ])
        .await
        .unwrap_err();

    let EngineError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    let missing: Vec<_> = errors.missing_accounts().map(AccountId::as_str).collect();
    assert_eq!(missing, ["acc-404"]);
    assert!(errors.to_string().contains("acc-404"));

    assert_eq!(count_rows(&db, "transactions").await, 0);
    assert_eq!(balance(&engine, "A1").await, Balance::ZERO);
}

#[tokio::test]
async fn every_missing_reference_is_reported_at_once() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "X1", "P1", 1),
            NewTransaction::transfer(date(), "A1", "X2", 2),
            NewTransaction::external(date(), "A2", "P404", 3),
            NewTransaction::external(date(), "X1", "P404", 4),
        ])
        .await
        .unwrap_err();

    let EngineError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.errors().len(), 2);
    let accounts: Vec<_> = errors.missing_accounts().map(AccountId::as_str).collect();
    let payees: Vec<_> = errors.missing_payees().map(PayeeId::as_str).collect();
    assert_eq!(accounts, ["X1", "X2"]);
    assert_eq!(payees, ["P404"]);
    assert_eq!(count_rows(&db, "transactions").await, 0);
}

#[tokio::test]
async fn external_payee_id_is_not_checked_against_accounts() {
    let (engine, _db) = engine_with_db().await;

    // "A2" is an account, not a payee.
    let err = engine
        .create_transactions(vec![NewTransaction::external(date(), "A1", "A2", 5)])
        .await
        .unwrap_err();

    let EngineError::Validation(errors) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.missing_accounts().count(), 0);
    let payees: Vec<_> = errors.missing_payees().map(PayeeId::as_str).collect();
    assert_eq!(payees, ["A2"]);
}

#[tokio::test]
async fn batch_rows_share_one_open_validity_window() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 100),
            NewTransaction::transfer(date(), "A1", "A2", -40),
            NewTransaction::transfer(date(), "A2", "A1", 15).cleared(true),
        ])
        .await
        .unwrap();

    assert_eq!(created.len(), 5);
    let valid_from = created[0].validity.valid_from;
    assert!(created.iter().all(|tx| tx.validity.valid_from == valid_from));
    assert!(created.iter().all(|tx| tx.validity.valid_to == ValidTo::Infinity));

    let mut stored = engine
        .active_transactions(&AccountId::from("A1"))
        .await
        .unwrap();
    stored.extend(
        engine
            .active_transactions(&AccountId::from("A2"))
            .await
            .unwrap(),
    );
    assert_eq!(stored.len(), 5);
    assert!(stored.iter().all(|tx| tx.validity.valid_from == valid_from));
    assert!(stored.iter().all(|tx| tx.validity.is_open()));
}

#[tokio::test]
async fn pending_amounts_land_in_pending_bucket() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 2500).cleared(true),
            NewTransaction::external(date(), "A1", "P1", -700),
            NewTransaction::transfer(date(), "A1", "A2", -300),
        ])
        .await
        .unwrap();

    assert_eq!(
        balance(&engine, "A1").await,
        Balance::new(Amount::new(2500), Amount::new(-1000))
    );
    assert_eq!(
        balance(&engine, "A2").await,
        Balance::new(Amount::ZERO, Amount::new(300))
    );
}

#[tokio::test]
async fn balances_accumulate_across_batches() {
    let (engine, db) = engine_with_db().await;

    for amount in [100, 200, -50] {
        engine
            .create_transactions(vec![
                NewTransaction::external(date(), "A1", "P1", amount).cleared(true),
            ])
            .await
            .unwrap();
    }

    assert_eq!(balance(&engine, "A1").await.cleared, Amount::new(250));
    assert_eq!(count_rows(&db, "transactions").await, 3);
}

#[tokio::test]
async fn recompute_matches_incremental_balances() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_accounts(vec![NewAccount::new("Idle").id("A3")])
        .await
        .unwrap();

    engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 1200).cleared(true),
            NewTransaction::transfer(date(), "A1", "A2", -450),
            NewTransaction::transfer(date(), "A2", "A1", 80).cleared(true),
        ])
        .await
        .unwrap();
    let before = engine.accounts().await.unwrap();

    let recomputed = engine.recompute_balances().await.unwrap();
    let after = engine.accounts().await.unwrap();

    assert_eq!(recomputed, before);
    assert_eq!(after, before);
    let idle = after.iter().find(|a| a.id.as_str() == "A3").unwrap();
    assert_eq!(idle.balance, Balance::ZERO);
}

#[tokio::test]
async fn active_transactions_lists_both_legs() {
    let (engine, _db) = engine_with_db().await;
    let later = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();

    engine
        .create_transactions(vec![
            NewTransaction::external(later, "A1", "P1", 9),
            NewTransaction::transfer(date(), "A2", "A1", 30),
        ])
        .await
        .unwrap();

    let a1 = engine
        .active_transactions(&AccountId::from("A1"))
        .await
        .unwrap();
    assert_eq!(a1.len(), 2);
    assert_eq!(a1[0].effective_date, date());
    assert_eq!(a1[0].amount, Amount::new(-30));
    assert_eq!(a1[1].effective_date, later);

    let a2 = engine
        .active_transactions(&AccountId::from("A2"))
        .await
        .unwrap();
    assert_eq!(a2.len(), 1);
    assert_eq!(a2[0].amount, Amount::new(30));

    assert_eq!(
        engine
            .active_transactions(&AccountId::from("nope"))
            .await
            .unwrap_err(),
        EngineError::KeyNotFound("nope".to_string())
    );
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let (engine, db) = engine_with_db().await;

    let created = engine.create_transactions(Vec::new()).await.unwrap();

    assert!(created.is_empty());
    assert_eq!(count_rows(&db, "transactions").await, 0);
}

#[tokio::test]
async fn duplicate_transaction_id_rolls_back_whole_batch() {
    let (engine, db) = engine_with_db().await;

    engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 10).id("dup"),
        ])
        .await
        .unwrap();

    let err = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A2", "P1", 70).cleared(true),
            NewTransaction::external(date(), "A1", "P1", 10).id("dup"),
        ])
        .await
        .unwrap_err();

    assert!(
        matches!(err, EngineError::Store { context: "inserting transactions", .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(count_rows(&db, "transactions").await, 1);
    assert_eq!(balance(&engine, "A2").await, Balance::ZERO);
    assert_eq!(
        balance(&engine, "A1").await,
        Balance::new(Amount::ZERO, Amount::new(10))
    );
}

#[tokio::test]
async fn existing_account_and_payee_ids_are_rejected() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .create_accounts(vec![
            NewAccount::new("Brokerage").id("A9"),
            NewAccount::new("Checking again").id("A1"),
        ])
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("A1".to_string()));
    assert_eq!(count_rows(&db, "accounts").await, 2);

    let err = engine
        .create_payees(vec![Payee::new("Baker").id("B"), Payee::new("Baker").id("B")])
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("B".to_string()));
    assert_eq!(count_rows(&db, "payees").await, 1);

    let err = engine
        .create_accounts(vec![NewAccount::new("  ")])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));
}

#[tokio::test]
async fn accounts_and_payees_are_listed_by_name() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_payees(vec![Payee::new("Bakery").id("P2")])
        .await
        .unwrap();

    let accounts: Vec<_> = engine
        .accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(accounts, ["Checking", "Savings"]);

    let payees: Vec<_> = engine
        .payees()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id.into_inner())
        .collect();
    assert_eq!(payees, ["P2", "P1"]);

    assert_eq!(
        engine.account(&AccountId::from("A404")).await.unwrap_err(),
        EngineError::KeyNotFound("A404".to_string())
    );
}

#[tokio::test]
async fn failing_balance_write_rolls_back_inserted_rows() {
    let (engine, db) = engine_with_db().await;
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        "CREATE TRIGGER freeze_savings BEFORE UPDATE ON accounts WHEN NEW.id = 'A2' \
         BEGIN SELECT RAISE(ABORT, 'account frozen'); END"
            .to_string(),
    ))
    .await
    .unwrap();

    let err = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", 90).cleared(true),
            NewTransaction::transfer(date(), "A1", "A2", -500).cleared(true),
        ])
        .await
        .unwrap_err();

    assert!(
        matches!(err, EngineError::Store { context: "inserting accounts", .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(count_rows(&db, "transactions").await, 0);
    assert_eq!(balance(&engine, "A1").await, Balance::ZERO);
    assert_eq!(balance(&engine, "A2").await, Balance::ZERO);
}

#[tokio::test]
async fn overflowing_balance_is_rejected_without_writes() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .create_transactions(vec![
            NewTransaction::external(date(), "A1", "P1", i64::MAX).cleared(true),
            NewTransaction::external(date(), "A1", "P1", 1).cleared(true),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)), "{err:?}");

    let err = engine
        .create_transactions(vec![NewTransaction::transfer(date(), "A1", "A2", i64::MIN)])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)), "{err:?}");

    assert_eq!(count_rows(&db, "transactions").await, 0);
    assert_eq!(balance(&engine, "A1").await, Balance::ZERO);
}

#[tokio::test]
async fn large_import_is_written_in_one_batch() {
    let (engine, db) = engine_with_db().await;
    let payees: Vec<Payee> = (0..1500)
        .map(|i| Payee::new(format!("Shop {i}")).id(format!("S{i}")))
        .collect();
    engine.create_payees(payees).await.unwrap();

    let batch: Vec<_> = (0..4000)
        .map(|i| NewTransaction::external(date(), "A1", format!("S{}", i % 1500), 1))
        .chain((0..200).map(|_| NewTransaction::transfer(date(), "A1", "A2", -2)))
        .collect();

    let created = engine.create_transactions(batch).await.unwrap();

    assert_eq!(created.len(), 4400);
    assert_eq!(count_rows(&db, "transactions").await, 4400);
    assert_eq!(
        balance(&engine, "A1").await,
        Balance::new(Amount::ZERO, Amount::new(4000 - 400))
    );
    assert_eq!(
        balance(&engine, "A2").await,
        Balance::new(Amount::ZERO, Amount::new(400))
    );
}

#[tokio::test]
async fn timed_out_batch_is_rolled_back() {
    let (engine, db, path) = engine_with_file_db().await;
    let url = format!("sqlite:{}?mode=rwc", path.display());

    // Another writer holds the write lock, so the insert cannot finish
    // before the deadline.
    let other = Database::connect(&url).await.unwrap();
    let lock = other.begin().await.unwrap();
    lock.execute(Statement::from_string(
        other.get_database_backend(),
        "UPDATE payees SET name = name WHERE id = 'P1'".to_string(),
    ))
    .await
    .unwrap();

    let release = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        lock.rollback().await.unwrap();
    };
    let create = engine.create_transactions_with_timeout(
        vec![NewTransaction::external(date(), "A1", "P1", 42).cleared(true)],
        Duration::from_millis(100),
    );
    let (result, ()) = tokio::join!(create, release);

    assert_eq!(result.unwrap_err(), EngineError::Timeout);
    assert_eq!(count_rows(&db, "transactions").await, 0);
    assert_eq!(balance(&engine, "A1").await, Balance::ZERO);

    let created = engine
        .create_transactions_with_timeout(
            vec![NewTransaction::external(date(), "A1", "P1", 42).cleared(true)],
            Duration::from_secs(30),
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(count_rows(&db, "transactions").await, 1);

    other.close().await.unwrap();
    db.close().await.unwrap();
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn timeout_result_matches_what_was_committed() {
    let (engine, db, path) = engine_with_file_db().await;

    let mut committed = 0;
    for _ in 0..20 {
        let result = engine
            .create_transactions_with_timeout(
                vec![NewTransaction::external(date(), "A1", "P1", 42).cleared(true)],
                Duration::ZERO,
            )
            .await;
        match result {
            Ok(created) => {
                assert_eq!(created.len(), 1);
                committed += 1;
            }
            Err(err) => assert_eq!(err, EngineError::Timeout),
        }

        assert_eq!(count_rows(&db, "transactions").await, committed);
        assert_eq!(
            balance(&engine, "A1").await.cleared,
            Amount::new(42 * committed)
        );
    }

    db.close().await.unwrap();
    let _ = std::fs::remove_file(path);
}
