#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::{
        any::TypeId,
        sync::{Arc, atomic::Ordering},
    };
    use strata::{
        Connection, DataContext, DataError, DatabaseConfig, DialectKind, IdGenerator, Value,
        params, scope,
    };
    use strata_tests::{
        init_logs,
        mock::{MockDriver, MockResponse, MockState, mock_row},
        model::{Customer, Event, Sale, SaleStatus},
        silent_logs,
    };
    use time::macros::date;

    async fn mock_context(
        dialect: DialectKind,
        pool_size: usize,
    ) -> (DataContext<MockDriver>, Arc<MockState>) {
        init_logs();
        let driver = MockDriver::new();
        let state = driver.state.clone();
        let context = DataContext::new(driver);
        context
            .register_scope(&scope![Customer, Sale, Event])
            .expect("Failed to register the types");
        context
            .register_database(
                DatabaseConfig::new("main", dialect, "mock://main").pool_size(pool_size),
            )
            .await
            .expect("Failed to register the database");
        (context, state)
    }

    #[tokio::test]
    async fn pool_bounds() {
        let (context, state) = mock_context(DialectKind::Sqlite, 2).await;
        let database = context.database("main").unwrap();
        assert_eq!(database.idle(), 2);
        assert_eq!(state.connects.load(Ordering::Relaxed), 2);

        let first = context.session("main").await.unwrap();
        let second = context.default_session().await.unwrap();
        let third = context.session("main").await.unwrap();
        assert_eq!(database.idle(), 0);
        assert_eq!(state.connects.load(Ordering::Relaxed), 3);

        first.release().await;
        second.release().await;
        assert_eq!(database.idle(), 2);
        third.release().await;
        assert_eq!(database.idle(), 2);
        assert_eq!(state.closes.load(Ordering::Relaxed), 1);

        {
            let _session = context.session("main").await.unwrap();
            assert_eq!(database.idle(), 1);
        }
        assert_eq!(database.idle(), 2);
    }

    #[tokio::test]
    async fn dropped_transaction() {
        let (context, state) = mock_context(DialectKind::Sqlite, 2).await;
        let database = context.database("main").unwrap();
        let mut session = context.default_session().await.unwrap();
        session.begin().await.unwrap();
        drop(session);
        assert_eq!(database.idle(), 1);
        assert_eq!(state.sql(), ["BEGIN"]);

        let mut session = context.default_session().await.unwrap();
        session.begin().await.unwrap();
        session.release().await;
        assert_eq!(database.idle(), 1);
        assert_eq!(state.sql(), ["BEGIN", "BEGIN", "ROLLBACK"]);
    }

    #[tokio::test]
    async fn reopen_connection() {
        let (context, state) = mock_context(DialectKind::Sqlite, 1).await;
        let mut session = context.default_session().await.unwrap();
        session.connection().unwrap().disconnect();
        drop(session);
        assert_eq!(state.opens.load(Ordering::Relaxed), 0);
        let mut session = context.default_session().await.unwrap();
        assert_eq!(state.opens.load(Ordering::Relaxed), 1);
        assert_eq!(state.connects.load(Ordering::Relaxed), 1);
        assert!(session.connection().unwrap().is_open());
    }

    #[tokio::test]
    async fn transactions() {
        let (context, state) = mock_context(DialectKind::SqlServer, 1).await;
        let mut session = context.default_session().await.unwrap();
        session.commit().await.unwrap();
        session.rollback().await.unwrap();
        assert!(state.sql().is_empty());

        session.begin().await.unwrap();
        assert!(session.is_in_transaction());
        silent_logs! {
            let error = session.begin().await.unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DataError>(),
                Some(DataError::TransactionAlreadyOpen)
            ));
        }
        session.commit().await.unwrap();
        assert!(!session.is_in_transaction());
        session.begin().await.unwrap();
        session.release().await;
        assert_eq!(
            state.sql(),
            [
                "BEGIN TRANSACTION",
                "COMMIT TRANSACTION",
                "BEGIN TRANSACTION",
                "ROLLBACK TRANSACTION"
            ]
        );

        state.on("begin", MockResponse::Fail("Connection lost".into()));
        let mut session = context.default_session().await.unwrap();
        silent_logs! {
            assert!(session.begin().await.is_err());
        }
        assert!(!session.is_in_transaction());
    }

    #[tokio::test]
    async fn partition_provisioning() {
        let (context, state) = mock_context(DialectKind::SqlServer, 2).await;
        let database = context.database("main").unwrap();
        state.on(
            "select count(1) from sales_",
            MockResponse::Fail("Invalid object name".into()),
        );
        let ids = IdGenerator::new(5).unwrap();
        let mut sale = Sale {
            id: ids.next_id_at(date!(2023 - 11 - 15)).unwrap(),
            customer_id: 3,
            amount: Decimal::new(1050, 2),
            status: SaleStatus::Paid,
            note: None,
        };
        let mut session = context.default_session().await.unwrap();
        silent_logs! {
            session.insert(&mut sale).await.unwrap();
        }
        assert_eq!(
            state.sql(),
            [
                "select count(1) from SALES_202311",
                "BEGIN TRANSACTION",
                "create table SALES_202311 (ID bigint not null primary key, CUSTOMER_ID bigint, AMOUNT decimal(18,2), STATUS int, NOTE varchar(200))",
                "create index IX_SALES_202311_CUSTOMER on SALES_202311 (CUSTOMER_ID)",
                "COMMIT TRANSACTION",
                "insert into SALES_202311(ID,CUSTOMER_ID,AMOUNT,STATUS,NOTE)values(@id,@customer_id,@amount,@status,@note);",
            ]
        );
        let insert = state.statements().pop().unwrap();
        assert_eq!(insert.parameter("@id"), Some(&Value::Int64(Some(sale.id))));
        assert_eq!(insert.parameter("@status"), Some(&Value::Int32(Some(1))));
        assert_eq!(
            insert.parameter("@amount"),
            Some(&Value::Decimal(Some(Decimal::new(1050, 2))))
        );
        assert_eq!(insert.parameter("@note"), Some(&Value::Varchar(None)));
        assert!(database.router().is_known(TypeId::of::<Sale>(), "SALES_202311"));

        // Known partitions are not probed again
        state.clear_statements();
        let mut other = Sale {
            id: ids.next_id_at(date!(2023 - 11 - 20)).unwrap(),
            ..sale.clone()
        };
        session.insert(&mut other).await.unwrap();
        assert_eq!(state.sql().len(), 1);

        // Read back from the partition of the key
        state.on(
            "select * from sales_202311",
            MockResponse::Rows(vec![mock_row(
                &["ID", "CUSTOMER_ID", "AMOUNT", "STATUS", "NOTE"],
                vec![
                    Value::Int64(Some(sale.id)),
                    Value::Int32(Some(3)),
                    Value::Decimal(Some(Decimal::new(1050, 2))),
                    Value::Int32(Some(1)),
                    Value::Varchar(None),
                ],
            )]),
        );
        let found = session.get_by_id::<Sale>(sale.id).await.unwrap();
        assert_eq!(found, Some(sale));
        assert_eq!(
            state.sql().last().unwrap(),
            "select * from SALES_202311 where ID=@id"
        );
    }

    #[tokio::test]
    async fn partition_created_concurrently() {
        let (context, state) = mock_context(DialectKind::SqlServer, 2).await;
        let database = context.database("main").unwrap();
        state.on(
            "select count(1) from sales_",
            MockResponse::Fail("Invalid object name".into()),
        );
        state.on(
            "create table sales_202312",
            MockResponse::Fail(
                "There is already an object named 'SALES_202312' in the database.".into(),
            ),
        );
        state.on(
            "create table sales_202401",
            MockResponse::Fail("Could not allocate space".into()),
        );
        let ids = IdGenerator::new(5).unwrap();
        let mut session = context.default_session().await.unwrap();
        let mut sale = Sale {
            id: ids.next_id_at(date!(2023 - 12 - 01)).unwrap(),
            ..Default::default()
        };
        silent_logs! {
            session.insert(&mut sale).await.unwrap();
        }
        let sql = state.sql();
        assert!(sql.iter().any(|v| v == "ROLLBACK TRANSACTION"));
        assert!(sql.last().unwrap().starts_with("insert into SALES_202312("));
        assert!(database.router().is_known(TypeId::of::<Sale>(), "SALES_202312"));

        let mut sale = Sale {
            id: ids.next_id_at(date!(2024 - 01 - 10)).unwrap(),
            ..Default::default()
        };
        silent_logs! {
            let error = session.insert(&mut sale).await.unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DataError>(),
                Some(DataError::PartitionProvisioningFailed { table, .. }) if table == "SALES_202401"
            ));
        }
        assert!(!database.router().is_known(TypeId::of::<Sale>(), "SALES_202401"));
        assert!(
            !state
                .sql()
                .iter()
                .any(|v| v.starts_with("insert into SALES_202401"))
        );
    }

    #[tokio::test]
    async fn identity_select_after() {
        let (context, state) = mock_context(DialectKind::SqlServer, 1).await;
        state.on(
            "select @@identity",
            MockResponse::scalar("ID", Value::Decimal(Some(Decimal::from(42)))),
        );
        let mut session = context.default_session().await.unwrap();
        let mut event = Event {
            name: "boot".into(),
            ..Default::default()
        };
        session.insert(&mut event).await.unwrap();
        assert_eq!(event.id, 42);
        assert_eq!(
            state.sql(),
            ["insert into EVENTS(NAME,HAPPENED_AT)values(@name,@happened_at);select @@identity;"]
        );

        state.on("select @@identity", MockResponse::Affected(1));
        silent_logs! {
            assert!(session.insert(&mut event).await.is_err());
        }
    }

    #[tokio::test]
    async fn identity_sequence_before() {
        let (context, state) = mock_context(DialectKind::Oracle, 1).await;
        state.on(
            "seq_event.nextval",
            MockResponse::scalar("NEXTVAL", Value::Decimal(Some(Decimal::from(7)))),
        );
        let mut session = context.default_session().await.unwrap();
        let mut event = Event {
            name: "boot".into(),
            ..Default::default()
        };
        session.insert(&mut event).await.unwrap();
        assert_eq!(event.id, 7);
        assert_eq!(
            state.sql(),
            [
                "select SEQ_EVENT.nextval from dual",
                "insert into EVENTS(ID,NAME,HAPPENED_AT)values(:id,:name,:happened_at)",
            ]
        );
        let insert = state.statements().pop().unwrap();
        assert_eq!(insert.parameter(":id"), Some(&Value::Int64(Some(7))));
    }

    #[tokio::test]
    async fn database_keys() {
        init_logs();
        let context = DataContext::new(MockDriver::new());
        silent_logs! {
            assert!(matches!(
                context.default_session().await.unwrap_err().downcast_ref::<DataError>(),
                Some(DataError::UnknownDatabaseKey(..))
            ));
        }
        context
            .register_database(DatabaseConfig::new("first", DialectKind::MySql, "mock://first"))
            .await
            .unwrap();
        context
            .register_database(
                DatabaseConfig::new("second", DialectKind::Sqlite, "mock://second").pool_size(1),
            )
            .await
            .unwrap();
        assert_eq!(context.default_key().as_deref(), Some("first"));
        assert_eq!(context.database("first").unwrap().idle(), 10);
        silent_logs! {
            let error = context
                .register_database(DatabaseConfig::new("first", DialectKind::Sqlite, "mock://other"))
                .await
                .unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DataError>(),
                Some(DataError::DuplicateDatabaseKey(key)) if key == "first"
            ));
            let error = context.session("third").await.unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DataError>(),
                Some(DataError::UnknownDatabaseKey(key)) if key == "third"
            ));
            assert!(
                context
                    .register_database(DatabaseConfig::new("down", DialectKind::Sqlite, "mock://unreachable"))
                    .await
                    .is_err()
            );
            assert!(context.database("down").is_err());
        }
        context.set_default_key("second");
        let session = context.default_session().await.unwrap();
        assert_eq!(session.database().key(), "second");
        assert_eq!(session.dialect().kind(), DialectKind::Sqlite);
        assert_eq!(
            format!("{:?}", session),
            r#"Session { database: "second", connected: true, transaction: false }"#
        );
    }

    #[tokio::test]
    async fn check_schema() {
        init_logs();
        let driver = MockDriver::new();
        let state = driver.state.clone();
        state.on(
            "select count(1) from customers",
            MockResponse::Fail("no such table: CUSTOMERS".into()),
        );
        let context = DataContext::new(driver);
        context
            .register_scope(&scope![Customer, Sale, Event])
            .unwrap();
        context
            .register_database(
                DatabaseConfig::new("main", DialectKind::Sqlite, "mock://main")
                    .pool_size(1)
                    .check_schema(true),
            )
            .await
            .unwrap();
        let sql = state.sql();
        assert_eq!(sql.len(), 3);
        assert!(sql.iter().any(|v| v == "select count(1) from CUSTOMERS"));
        assert!(sql.iter().any(|v| v == "select count(1) from EVENTS"));
        assert!(sql.iter().any(|v| v
            == "create table CUSTOMERS (ID INTEGER NOT NULL,NAME TEXT NOT NULL,COUNTRY TEXT,ACTIVE INTEGER,CREDIT DECIMAL,CODE TEXT,CREATED TEXT,primary key(ID))"));
        assert!(!sql.iter().any(|v| v.contains("SALES")));
    }

    #[tokio::test]
    async fn cached_sql() {
        let (context, _) = mock_context(DialectKind::SqlServer, 1).await;
        let database = context.database("main").unwrap();
        let table = context.registry().resolve::<Customer>().unwrap();
        let first = database.cached_sql(TypeId::of::<Customer>(), &table, "CUSTOMERS");
        let second = database.cached_sql(TypeId::of::<Customer>(), &table, "CUSTOMERS");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.insert,
            "insert into CUSTOMERS(ID,NAME,COUNTRY,ACTIVE,CREDIT,CODE,CREATED)values(@id,@name,@country,@active,@credit,@code,@created_at);"
        );
        assert_eq!(
            first.update,
            "update CUSTOMERS set NAME=@name,COUNTRY=@country,ACTIVE=@active,CREDIT=@credit,CODE=@code where ID=@id"
        );
        assert_eq!(
            first.select_by_id.as_deref(),
            Some("select * from CUSTOMERS where ID=@id")
        );
        assert_eq!(
            first.delete.as_deref(),
            Some("delete from CUSTOMERS where ID=@id")
        );
    }

    #[tokio::test]
    async fn queries() {
        let (context, state) = mock_context(DialectKind::SqlServer, 1).await;
        state.on(
            "select * from customers",
            MockResponse::Rows(vec![
                mock_row(
                    &["ID", "NAME", "ACTIVE", "EXTRA"],
                    vec![
                        Value::Int64(Some(1)),
                        Value::Varchar(Some("Ada".into())),
                        Value::Int32(Some(1)),
                        Value::Varchar(Some("ignored".into())),
                    ],
                ),
                mock_row(
                    &["ID", "NAME", "ACTIVE", "EXTRA"],
                    vec![
                        Value::Int64(Some(2)),
                        Value::Varchar(Some("Alan".into())),
                        Value::Int32(Some(0)),
                        Value::Varchar(None),
                    ],
                ),
            ]),
        );
        let mut session = context.default_session().await.unwrap();
        let customers = session
            .get_list::<Customer>("{Name} like ?", "{Id}", params!["A%"])
            .await
            .unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].name, "Ada");
        assert!(customers[0].active);
        assert!(!customers[1].active);
        assert_eq!(context.marshallers().compiled_count(), 1);
        let statement = state.statements().pop().unwrap();
        assert_eq!(
            statement.sql,
            "select * from CUSTOMERS where NAME like @p0 order by ID"
        );
        assert_eq!(
            statement.parameter("@p0"),
            Some(&Value::Varchar(Some("A%".into())))
        );

        state.on("delete from customers", MockResponse::Affected(3));
        let deleted = session
            .delete_where::<Customer>("{Active} = ? and {Missing} = 1", params![false])
            .await
            .unwrap();
        assert_eq!(deleted, 3);
        let statement = state.statements().pop().unwrap();
        assert_eq!(
            statement.sql,
            "delete from CUSTOMERS where ACTIVE = @p0 and {Missing} = 1"
        );
        assert_eq!(statement.parameter("@p0"), Some(&Value::Int32(Some(0))));

        state.on("count(*)", MockResponse::scalar("C", Value::Int32(Some(12))));
        assert_eq!(
            session
                .execute_scalar_as::<i64>("select count(*) from CUSTOMERS where NAME <> '?'", params![])
                .await
                .unwrap(),
            Some(12)
        );
        assert_eq!(
            state.sql().last().unwrap(),
            "select count(*) from CUSTOMERS where NAME <> '?'"
        );

        silent_logs! {
            assert!(
                session
                    .bulk_load(&[Customer::default()], None)
                    .await
                    .is_err()
            );
            assert!(session.insert_batch(&[Customer::default()], 0, None).await.is_err());
        }
    }
}
