use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BalanceDirection, ClientShare, Engine, EngineError, ExpenseFilter, ExpenseMeta, Money,
    NewExpenseCmd, Payer, PercentInput, SettleAmount, SettleCmd, SplitMethod, SplitRule,
    SplitSource,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    for (username, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        engine.create_user(username, Some(name)).await.unwrap();
    }
    (engine, db)
}

fn equally(users: &[&str]) -> SplitRule {
    SplitRule::Equally {
        participants: users.iter().map(ToString::to_string).collect(),
    }
}

fn paid_by(payer: &str, total: i64, desc: &str, rule: SplitRule) -> NewExpenseCmd {
    NewExpenseCmd::new(
        payer,
        Money::new(total),
        ExpenseMeta::new(desc, Utc.with_ymd_and_hms(2026, 5, 10, 19, 0, 0).unwrap()),
        rule,
    )
    .payer(Payer::new(payer, Money::new(total)))
}

#[tokio::test]
async fn create_expense_persists_split_and_names() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_expense(paid_by(
            "alice",
            9000,
            "Dinner",
            equally(&["alice", "bob", "carol"]),
        ))
        .await
        .unwrap();

    let loaded = engine.expense(created.id, "bob").await.unwrap();
    assert_eq!(loaded.split_method, SplitMethod::Equally);
    assert_eq!(loaded.split_source, SplitSource::Server);
    assert_eq!(loaded.participants.len(), 3);
    let bob = loaded.participant("bob").unwrap();
    assert_eq!(bob.share, Money::new(3000));
    assert_eq!(bob.net, Money::new(-3000));
    assert_eq!(bob.display_name.as_deref(), Some("Bob"));
    assert_eq!(loaded.payers[0].display_name.as_deref(), Some("Alice"));
    assert!(!loaded.is_settled);
}

#[tokio::test]
async fn create_expense_keeps_matching_client_split() {
    let (engine, _db) = engine_with_db().await;

    let rule = SplitRule::Percentage {
        participants: vec![
            PercentInput {
                user_id: "alice".to_string(),
                percent: 25.0,
            },
            PercentInput {
                user_id: "bob".to_string(),
                percent: 75.0,
            },
        ],
    };
    let client = vec![
        ClientShare {
            user_id: Some("alice".to_string()),
            share: Money::new(2500),
            paid: Money::new(10000),
            net: Money::new(7500),
        },
        ClientShare {
            user_id: Some("bob".to_string()),
            share: Money::new(7500),
            paid: Money::ZERO,
            net: Money::new(-7500),
        },
    ];
    let created = engine
        .create_expense(paid_by("alice", 10000, "Hotel", rule).client_shares(client))
        .await
        .unwrap();
    assert_eq!(created.split_source, SplitSource::Client);

    let loaded = engine.expense(created.id, "alice").await.unwrap();
    assert_eq!(loaded.participant("bob").unwrap().percent, Some(75.0));
}

#[tokio::test]
async fn create_expense_rejects_unknown_users_and_bad_splits() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_expense(paid_by("alice", 1000, "Taxi", equally(&["alice", "zoe"])))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let rule = SplitRule::Percentage {
        participants: vec![PercentInput {
            user_id: "bob".to_string(),
            percent: 90.0,
        }],
    };
    let err = engine
        .create_expense(paid_by("alice", 1000, "Taxi", rule))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PercentageMismatch(_)));

    let listed = engine
        .list_expenses("alice", &ExpenseFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn expense_is_hidden_from_uninvolved_users() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .create_expense(paid_by("alice", 2000, "Lunch", equally(&["alice", "bob"])))
        .await
        .unwrap();

    let err = engine.expense(created.id, "carol").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn settlement_is_clamped_and_versioned() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .create_expense(paid_by("alice", 10000, "Lunch", equally(&["alice", "bob"])))
        .await
        .unwrap();
    assert_eq!(created.version, 0);

    let after_first = engine
        .settle_partial(SettleCmd::new(
            created.id,
            "bob",
            "bob",
            SettleAmount::Amount(Money::new(3000)),
        ))
        .await
        .unwrap();
    assert_eq!(after_first.version, 1);

    // A writer that loaded version 0 must not overwrite the first payment.
    let err = engine
        .settle_partial(
            SettleCmd::new(
                created.id,
                "bob",
                "bob",
                SettleAmount::Amount(Money::new(4000)),
            )
            .expected_version(0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let after_second = engine
        .settle_partial(SettleCmd::new(
            created.id,
            "bob",
            "bob",
            SettleAmount::Amount(Money::new(4000)),
        ))
        .await
        .unwrap();
    let bob = after_second.participant("bob").unwrap();
    assert_eq!(bob.settled_amount, Money::new(5000));
    assert!(bob.fully_settled);
    assert!(!after_second.is_settled);

    let stored = engine.expense(created.id, "alice").await.unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(
        stored.participant("bob").unwrap().settled_amount,
        Money::new(5000)
    );
}

#[tokio::test]
async fn stale_version_in_storage_is_a_conflict() {
    let (engine, db) = engine_with_db().await;
    let created = engine
        .create_expense(paid_by("alice", 10000, "Lunch", equally(&["alice", "bob"])))
        .await
        .unwrap();

    // Another process settled in the meantime.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE expenses SET version = version + 1 WHERE id = ?",
        vec![created.id.to_string().into()],
    ))
    .await
    .unwrap();

    let err = engine
        .settle_partial(
            SettleCmd::new(created.id, "bob", "bob", SettleAmount::Remainder)
                .expected_version(created.version),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn full_settlement_and_delete_are_creator_only() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .create_expense(paid_by("alice", 6000, "Tickets", equally(&["alice", "bob"])))
        .await
        .unwrap();

    let err = engine.settle_full(created.id, "bob", None).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine.delete_expense(created.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let settled = engine.settle_full(created.id, "alice", None).await.unwrap();
    assert!(settled.is_settled);
    assert!(settled.participants.iter().all(|p| p.fully_settled));

    engine.delete_expense(created.id, "alice").await.unwrap();
    let err = engine.expense(created.id, "alice").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn list_expenses_applies_filters() {
    let (engine, _db) = engine_with_db().await;
    let may = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let june = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

    engine
        .create_expense(
            NewExpenseCmd::new(
                "alice",
                Money::new(3000),
                ExpenseMeta::new("Rent share", may).group_id("flat"),
                equally(&["alice", "bob", "carol"]),
            )
            .payer(Payer::new("alice", Money::new(3000))),
        )
        .await
        .unwrap();
    engine
        .create_expense(
            NewExpenseCmd::new(
                "bob",
                Money::new(2000),
                ExpenseMeta::new("Cinema", june),
                equally(&["alice", "bob"]),
            )
            .payer(Payer::new("bob", Money::new(2000))),
        )
        .await
        .unwrap();

    let all = engine
        .list_expenses("alice", &ExpenseFilter::default())
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|e| e.description.as_str()).collect::<Vec<_>>(),
        vec!["Cinema", "Rent share"]
    );

    let in_group = engine
        .list_expenses(
            "alice",
            &ExpenseFilter {
                group_id: Some("flat".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(in_group.len(), 1);

    let with_carol = engine
        .list_expenses(
            "alice",
            &ExpenseFilter {
                counterparty: Some("carol".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(with_carol.len(), 1);

    let before_june = engine
        .list_expenses(
            "alice",
            &ExpenseFilter {
                to: Some(june),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(before_june.len(), 1);
    assert_eq!(before_june[0].description, "Rent share");

    let err = engine
        .list_expenses(
            "alice",
            &ExpenseFilter {
                from: Some(june),
                to: Some(may),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn balances_net_across_expenses() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_expense(paid_by(
            "alice",
            9000,
            "Dinner",
            equally(&["alice", "bob", "carol"]),
        ))
        .await
        .unwrap();
    engine
        .create_expense(paid_by("bob", 4000, "Drinks", equally(&["alice", "bob"])))
        .await
        .unwrap();

    let friends = engine
        .friend_balances("alice", &ExpenseFilter::default())
        .await
        .unwrap();
    // bob: +30 from dinner, -20 from drinks. carol: +30.
    assert_eq!(friends.len(), 2);
    assert_eq!(friends[0].counterparty_id, "bob");
    assert_eq!(friends[0].balance, Money::new(1000));
    assert_eq!(friends[1].counterparty_id, "carol");
    assert_eq!(friends[1].balance, Money::new(3000));
    assert!(
        friends
            .iter()
            .all(|f| f.direction == BalanceDirection::OwedToYou)
    );

    let summary = engine
        .balance_summary("alice", &ExpenseFilter::default())
        .await
        .unwrap();
    assert_eq!(summary.total_owed_to_you, Money::new(4000));
    assert_eq!(summary.total_you_owe, Money::ZERO);
    assert_eq!(summary.net, Money::new(4000));

    let err = engine
        .friend_balances("zoe", &ExpenseFilter::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn create_user_rejects_duplicates() {
    let (engine, _db) = engine_with_db().await;
    let err = engine.create_user("alice", None).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
    assert_eq!(engine.display_name("bob").await.unwrap(), "Bob");
}
