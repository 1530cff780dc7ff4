use crate::{model::Customer, silent_logs};
use strata::{DataContext, DataError, Driver, params};

pub async fn transactions<D: Driver>(context: &DataContext<D>) {
    let mut session = context
        .default_session()
        .await
        .expect("Could not open a session");

    // Setup
    session
        .delete_where::<Customer>("{Country} = ?", params!["NL"])
        .await
        .expect("Failed to clear the dutch customers");

    // Nothing to end
    session
        .commit()
        .await
        .expect("A commit without transaction does nothing");
    session
        .rollback()
        .await
        .expect("A rollback without transaction does nothing");

    // Rolled back
    let mut rolled_back = Customer {
        id: 1001,
        name: "Rolled back".into(),
        country: Some("NL".into()),
        ..Default::default()
    };
    session
        .begin()
        .await
        .expect("Could not begin a transaction");
    assert!(session.is_in_transaction());
    silent_logs! {
        let error = session
            .begin()
            .await
            .expect_err("Transactions cannot be nested");
        assert!(matches!(
            error.downcast_ref::<DataError>(),
            Some(DataError::TransactionAlreadyOpen)
        ));
    }
    session
        .insert(&mut rolled_back)
        .await
        .expect("Failed to insert in the transaction");
    let inside = session
        .get_by_id::<Customer>(rolled_back.id)
        .await
        .expect("Failed to query in the transaction");
    assert!(inside.is_some());
    session
        .rollback()
        .await
        .expect("Failed to roll back");
    assert!(!session.is_in_transaction());
    assert!(
        session
            .get_by_id::<Customer>(rolled_back.id)
            .await
            .expect("Failed to query after the rollback")
            .is_none()
    );

    // Committed
    let mut committed = Customer {
        id: 1002,
        name: "Committed".into(),
        country: Some("NL".into()),
        ..Default::default()
    };
    session
        .begin()
        .await
        .expect("Could not begin a transaction");
    session
        .insert(&mut committed)
        .await
        .expect("Failed to insert in the transaction");
    session.commit().await.expect("Failed to commit");
    session.release().await;

    // Visible to another session
    let mut session = context
        .default_session()
        .await
        .expect("Could not open a session");
    let found = session
        .get_by_id::<Customer>(committed.id)
        .await
        .expect("Failed to query after the commit")
        .expect("Failed to find the committed customer");
    assert_eq!(found, committed);

    // Left open, rolled back on release
    let mut abandoned = Customer {
        id: 1003,
        name: "Abandoned".into(),
        country: Some("NL".into()),
        ..Default::default()
    };
    session
        .begin()
        .await
        .expect("Could not begin a transaction");
    session
        .insert(&mut abandoned)
        .await
        .expect("Failed to insert in the transaction");
    session.release().await;
    let mut session = context
        .default_session()
        .await
        .expect("Could not open a session");
    assert!(
        session
            .get_by_id::<Customer>(abandoned.id)
            .await
            .expect("Failed to query after the release")
            .is_none()
    );
    session
        .delete_where::<Customer>("{Country} = ?", params!["NL"])
        .await
        .expect("Failed to clear the dutch customers");
    session.release().await;
}
