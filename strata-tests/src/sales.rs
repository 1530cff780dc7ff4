use crate::{
    model::{Sale, SaleStatus},
    silent_logs,
};
use rust_decimal::Decimal;
use std::any::TypeId;
use strata::{
    DataContext, DataError, Driver, IdGenerator, decode_date, params, physical_name,
};
use time::macros::date;

pub async fn sales<D: Driver>(context: &DataContext<D>) {
    let ids = IdGenerator::new(2).expect("Could not create the identifier generator");
    let table = context
        .registry()
        .resolve::<Sale>()
        .expect("Sale was not registered");
    let database = context
        .database(&context.default_key().expect("No default database"))
        .expect("The default database is missing");
    let mut session = context
        .default_session()
        .await
        .expect("Could not open a session");

    // Current partition
    let (id, now) = ids.next_id();
    let mut sale = Sale {
        id,
        customer_id: 1,
        amount: Decimal::new(1999, 2),
        status: SaleStatus::Paid,
        note: Some("first".into()),
    };
    let affected = session
        .insert(&mut sale)
        .await
        .expect("Failed to insert the current sale");
    assert_eq!(affected.rows_affected, 1);
    let current = physical_name(&table, now.date());
    assert!(database.router().is_known(TypeId::of::<Sale>(), &current));
    let found = session
        .get_by_id::<Sale>(sale.id)
        .await
        .expect("Failed to query the current sale")
        .expect("Failed to find the current sale");
    assert_eq!(found, sale);

    // Point in time
    let day = date!(2023 - 11 - 15);
    let past_id = ids.next_id_at(day).expect("Failed to issue a point-in-time id");
    assert_eq!(decode_date(past_id).unwrap().date(), day);
    let mut past = Sale {
        id: past_id,
        customer_id: 2,
        amount: Decimal::new(500, 2),
        status: SaleStatus::Draft,
        note: None,
    };
    session
        .insert(&mut past)
        .await
        .expect("Failed to insert the past sale");
    assert!(database.router().is_known(TypeId::of::<Sale>(), "SALES_202311"));
    let count = session
        .execute_scalar_as::<i64>("select count(*) from SALES_202311", params![])
        .await
        .expect("Failed to count the sales of November 2023");
    assert_eq!(count, Some(1));
    let found = session
        .get_by_id::<Sale>(past_id)
        .await
        .expect("Failed to query the past sale")
        .expect("Failed to find the past sale");
    assert_eq!(found, past);
    let mut explicit = Sale {
        id: ids.next_id_at(day).expect("Failed to issue a point-in-time id"),
        customer_id: 2,
        amount: Decimal::ONE,
        ..Default::default()
    };
    session
        .insert_at(&mut explicit, day)
        .await
        .expect("Failed to insert in an explicit partition");
    let count = session
        .execute_scalar_as::<i64>("select count(*) from SALES_202311", params![])
        .await
        .expect("Failed to count the sales of November 2023");
    assert_eq!(count, Some(2));

    // Update and delete in the partition of the key
    past.status = SaleStatus::Refunded;
    past.note = Some("refunded".into());
    let updated = session
        .update(&past)
        .await
        .expect("Failed to update the past sale");
    assert_eq!(updated, 1);
    let found = session
        .get_by_id::<Sale>(past_id)
        .await
        .expect("Failed to query the past sale")
        .expect("Failed to find the past sale");
    assert_eq!(found.status, SaleStatus::Refunded);
    assert_eq!(found.note.as_deref(), Some("refunded"));
    let deleted = session
        .delete_by_id::<Sale>(past_id)
        .await
        .expect("Failed to delete the past sale");
    assert_eq!(deleted, 1);
    assert!(
        session
            .get_by_id::<Sale>(past_id)
            .await
            .expect("Failed to query the past sale")
            .is_none()
    );

    // Keys not encoding a date
    silent_logs! {
        let error = session
            .get_by_id::<Sale>(42)
            .await
            .expect_err("A key without date cannot be routed");
        assert!(matches!(
            error.downcast_ref::<DataError>(),
            Some(DataError::InvalidIdentifier(..))
        ));
    }

    // Batches
    let batch: Vec<Sale> = (0..5)
        .map(|i| Sale {
            id: ids.next_id_at(day).expect("Failed to issue a point-in-time id"),
            customer_id: 10 + i,
            amount: Decimal::new(100 * (i + 1), 2),
            status: SaleStatus::Paid,
            note: Some(format!("batch {}", i)),
        })
        .collect();
    silent_logs! {
        let error = session
            .insert_batch(&batch, 2, Some(day))
            .await
            .expect_err("Many pages need a transaction");
        assert!(matches!(
            error.downcast_ref::<DataError>(),
            Some(DataError::InvalidArgument(..))
        ));
        assert!(
            session
                .insert_batch(&batch[..1], 2, None)
                .await
                .is_err(),
            "A partitioned batch needs the partition date"
        );
    }
    assert_eq!(
        session
            .insert_batch::<Sale>(&[], 2, None)
            .await
            .expect("An empty batch is not an error"),
        0
    );
    session
        .begin()
        .await
        .expect("Could not begin a transaction");
    let inserted = session
        .insert_batch(&batch, 2, Some(day))
        .await
        .expect("Failed to insert the batch");
    assert_eq!(inserted, 5);
    session
        .commit()
        .await
        .expect("Failed to commit the batch");
    let count = session
        .execute_scalar_as::<i64>(
            "select count(*) from SALES_202311 where CUSTOMER_ID >= ?",
            params![10],
        )
        .await
        .expect("Failed to count the batch");
    assert_eq!(count, Some(5));
    let found = session
        .get_by_id::<Sale>(batch[3].id)
        .await
        .expect("Failed to query a sale of the batch")
        .expect("Failed to find a sale of the batch");
    assert_eq!(found, batch[3]);

    if !session.dialect().supports_bulk_load() {
        silent_logs! {
            let error = session
                .bulk_load(&batch, Some(day))
                .await
                .expect_err("Bulk load is not available");
            assert!(matches!(
                error.downcast_ref::<DataError>(),
                Some(DataError::UnsupportedOperation(..))
            ));
        }
    }
    session.release().await;
}
