#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::time::Duration as StdDuration;
    use strata_core::{
        ColumnDescriptor, ColumnType, DataError, Dialect, DialectKind, IdentityRetrieval,
        KeyGeneration, MySqlDialect, OracleDialect, Page, SqlServerDialect, SqliteDialect,
        TableDescriptor, Value, XmlDocument, identity_value,
    };
    use time::Duration;
    use uuid::Uuid;

    struct Order;
    struct Event;

    fn orders() -> TableDescriptor {
        TableDescriptor::builder::<Order>("ORDERS")
            .primary_key(
                ColumnDescriptor::new("id", "Id", 0, ColumnType::Int64),
                KeyGeneration::Unassigned,
            )
            .column(
                ColumnDescriptor::new("amount", "Amount", 1, ColumnType::Decimal)
                    .nullable(false)
                    .default_value("0"),
            )
            .column(ColumnDescriptor::new("note", "Note", 2, ColumnType::Text).no_update())
            .column(ColumnDescriptor::new("created", "Created", 3, ColumnType::DateTime).no_insert())
            .build()
            .unwrap()
    }

    fn events() -> TableDescriptor {
        TableDescriptor::builder::<Event>("EVENTS")
            .primary_key(
                ColumnDescriptor::new("event_id", "id", 0, ColumnType::Int32),
                KeyGeneration::Identity,
            )
            .column(ColumnDescriptor::new("name", "name", 1, ColumnType::Text))
            .build()
            .unwrap()
    }

    fn page<'a>(index: u32, order_by: &'a str) -> Page<'a> {
        Page {
            index,
            size: 20,
            fields: "ID,AMOUNT",
            from: "ORDERS",
            condition: "AMOUNT > @p0",
            group_by: "",
            order_by,
        }
    }

    fn invalid_argument(error: strata_core::Error) -> bool {
        matches!(
            error.downcast_ref::<DataError>(),
            Some(DataError::InvalidArgument(..))
        )
    }

    #[test]
    fn dialect_kind() {
        assert_eq!("MSSQL".parse::<DialectKind>().unwrap(), DialectKind::SqlServer);
        assert_eq!("sqlserver".parse::<DialectKind>().unwrap(), DialectKind::SqlServer);
        assert_eq!("Oracle".parse::<DialectKind>().unwrap(), DialectKind::Oracle);
        assert_eq!("mysql".parse::<DialectKind>().unwrap(), DialectKind::MySql);
        assert_eq!("SQLite".parse::<DialectKind>().unwrap(), DialectKind::Sqlite);
        assert!(invalid_argument("postgres".parse::<DialectKind>().unwrap_err()));
        assert_eq!(DialectKind::MySql.to_string(), "mysql");
        assert_eq!(DialectKind::Oracle.dialect().kind(), DialectKind::Oracle);
    }

    #[test]
    fn crud_statements() {
        let table = orders();
        let dialect = SqlServerDialect;
        let mut out = String::new();
        dialect.write_insert(&mut out, &table, "ORDERS_202311");
        assert_eq!(
            out,
            "insert into ORDERS_202311(ID,AMOUNT,NOTE)values(@Id,@Amount,@Note);"
        );
        out.clear();
        dialect.write_update(&mut out, &table, "ORDERS");
        assert_eq!(
            out,
            "update ORDERS set AMOUNT=@Amount,CREATED=@Created where ID=@Id"
        );
        out.clear();
        dialect.write_delete(&mut out, &table, "ORDERS").unwrap();
        assert_eq!(out, "delete from ORDERS where ID=@Id");
        out.clear();
        dialect.write_select_by_id(&mut out, &table, "ORDERS").unwrap();
        assert_eq!(out, "select * from ORDERS where ID=@Id");

        let dialect = OracleDialect;
        out.clear();
        dialect.write_insert(&mut out, &table, "ORDERS");
        assert_eq!(
            out,
            "insert into ORDERS(ID,AMOUNT,NOTE)values(:Id,:Amount,:Note)"
        );
        out.clear();
        dialect.write_delete(&mut out, &table, "ORDERS").unwrap();
        assert_eq!(out, "delete from ORDERS where ID=:Id");
    }

    #[test]
    fn identity_insert() {
        let table = events();
        let mut out = String::new();
        SqlServerDialect.write_insert(&mut out, &table, "EVENTS");
        assert_eq!(out, "insert into EVENTS(NAME)values(@name);");
        assert_eq!(
            SqlServerDialect.identity_retrieval(),
            IdentityRetrieval::SelectAfter("select @@identity;")
        );
        assert_eq!(
            SqliteDialect.identity_retrieval(),
            IdentityRetrieval::SelectAfter("select last_insert_rowid();")
        );
        out.clear();
        OracleDialect.write_insert(&mut out, &table, "EVENTS");
        assert_eq!(out, "insert into EVENTS(EVENT_ID,NAME)values(:id,:name)");
        assert_eq!(
            OracleDialect.identity_retrieval(),
            IdentityRetrieval::SequenceBefore
        );
        let key = table.primary_key().unwrap();
        assert_eq!(key.sequence_name, "SEQ_EVENT");
        out.clear();
        OracleDialect.write_sequence_next(&mut out, &key.sequence_name);
        assert_eq!(out, "select SEQ_EVENT.nextval from dual");
        assert_eq!(
            identity_value(Value::Decimal(Some(42.into())), &key.column).unwrap(),
            Value::Int32(Some(42))
        );
        assert_eq!(
            identity_value(Value::Int64(Some(7)), &key.column).unwrap(),
            Value::Int32(Some(7))
        );
    }

    #[test]
    fn batch_insert() {
        let table = orders();
        let mut out = String::new();
        SqlServerDialect
            .write_batch_insert(&mut out, &table, "ORDERS", 2)
            .unwrap();
        assert_eq!(
            out,
            indoc! {"
                insert into ORDERS(ID,AMOUNT,NOTE)select @Id_0,@Amount_1,@Note_2
                 union all select @Id_3,@Amount_4,@Note_5
            "}
        );
        out.clear();
        MySqlDialect
            .write_batch_insert(&mut out, &table, "ORDERS", 2)
            .unwrap();
        assert_eq!(
            out,
            "insert into ORDERS(ID,AMOUNT,NOTE)values(@Id_0,@Amount_1,@Note_2),(@Id_3,@Amount_4,@Note_5)"
        );
        out.clear();
        SqliteDialect
            .write_batch_insert(&mut out, &table, "ORDERS", 1)
            .unwrap();
        assert_eq!(
            out,
            "insert into ORDERS(ID,AMOUNT,NOTE)values(@Id_0,@Amount_1,@Note_2)"
        );
        out.clear();
        OracleDialect
            .write_batch_insert(&mut out, &table, "ORDERS", 2)
            .unwrap();
        assert_eq!(
            out,
            [
                "INSERT ALL ",
                "INTO ORDERS(ID,AMOUNT,NOTE)VALUES(:Id_0,:Amount_1,:Note_2) ",
                "INTO ORDERS(ID,AMOUNT,NOTE)VALUES(:Id_3,:Amount_4,:Note_5) ",
                "SELECT 1 FROM DUAL",
            ]
            .join("\n")
        );
        out.clear();
        let error = OracleDialect
            .write_batch_insert(&mut out, &events(), "EVENTS", 2)
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DataError>(),
            Some(DataError::UnsupportedOperation(..))
        ));
    }

    #[test]
    fn paging() {
        let mut out = String::new();
        MySqlDialect.write_paging(&mut out, &page(3, "ID desc")).unwrap();
        assert_eq!(
            out,
            "select ID,AMOUNT from ORDERS where AMOUNT > @p0 order by ID desc limit 40,20"
        );
        out.clear();
        SqliteDialect.write_paging(&mut out, &page(3, "ID desc")).unwrap();
        assert_eq!(
            out,
            "select ID,AMOUNT from ORDERS where AMOUNT > @p0 order by ID desc limit 20 offset 40"
        );
        out.clear();
        OracleDialect.write_paging(&mut out, &page(3, "ID desc")).unwrap();
        assert_eq!(
            out,
            "select * from( select a.*, rownum r__n from( select ID,AMOUNT from ORDERS where AMOUNT > @p0 order by ID desc ) a where rownum <= 60 ) b where r__n > 40"
        );
        out.clear();
        SqlServerDialect
            .write_paging(&mut out, &page(3, "ID desc"))
            .unwrap();
        assert_eq!(
            out,
            "select top 20 * from ( select row_number() over (order by ID desc) as r__n, ID,AMOUNT from ORDERS where AMOUNT > @p0 ) a where r__n > 40"
        );
        out.clear();
        SqlServerDialect.write_paging(&mut out, &page(1, "")).unwrap();
        assert_eq!(out, "select top 20 ID,AMOUNT from ORDERS where AMOUNT > @p0");
        out.clear();
        assert!(invalid_argument(
            SqlServerDialect
                .write_paging(&mut out, &page(2, ""))
                .unwrap_err()
        ));
        assert!(invalid_argument(
            MySqlDialect.write_paging(&mut out, &page(0, "ID")).unwrap_err()
        ));
    }

    #[test]
    fn create_table() {
        let table = orders();
        assert_eq!(
            SqlServerDialect.create_table_statements(&table),
            ["create table ORDERS (ID bigint NOT NULL,AMOUNT decimal(18,4) default 0 NOT NULL,NOTE nvarchar(max),CREATED datetime,constraint PK_ORDERS primary key(ID))"]
        );
        assert_eq!(
            SqliteDialect.create_table_statements(&table),
            ["create table ORDERS (ID INTEGER NOT NULL,AMOUNT DECIMAL default 0 NOT NULL,NOTE TEXT,CREATED TEXT,primary key(ID))"]
        );
        assert_eq!(
            OracleDialect.create_table_statements(&table),
            [
                "create table ORDERS (ID NUMBER(19) NOT NULL,AMOUNT NUMBER(18,4) default 0 NOT NULL,NOTE VARCHAR2(4000),CREATED DATE)",
                "alter table ORDERS add constraint PK_ORDERS primary key (ID)",
            ]
        );
        let table = TableDescriptor::builder::<Order>("NOTES")
            .primary_key(
                ColumnDescriptor::new("id", "id", 0, ColumnType::Uuid).data_type("char(32)"),
                KeyGeneration::Unassigned,
            )
            .column(ColumnDescriptor::new("body", "body", 1, ColumnType::Text).data_type("varchar(50)"))
            .build()
            .unwrap();
        assert_eq!(
            MySqlDialect.create_table_statements(&table),
            ["create table NOTES (ID char(32) NOT NULL,BODY varchar(50),primary key(ID))"]
        );
    }

    #[test]
    fn bind_values() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            SqlServerDialect.bind_value(Value::Uuid(Some(id))),
            Value::Varchar(Some("67e55044-10b1-426f-9247-bb680e5fe0c8".into()))
        );
        assert_eq!(
            MySqlDialect.bind_value(Value::Uuid(Some(id))),
            Value::Varchar(Some("67E5504410B1426F9247BB680E5FE0C8".into()))
        );
        assert_eq!(
            OracleDialect.bind_value(Value::Uuid(Some(Uuid::nil()))),
            Value::Varchar(None)
        );
        assert_eq!(
            SqliteDialect.bind_value(Value::Boolean(Some(true))),
            Value::Int32(Some(1))
        );
        assert_eq!(
            SqliteDialect.bind_value(Value::Boolean(Some(false))),
            Value::Int32(Some(0))
        );
        assert_eq!(
            MySqlDialect.bind_value(Value::Interval(Some(
                Duration::try_from(StdDuration::from_millis(1500)).unwrap()
            ))),
            Value::Int64(Some(15_000_000))
        );
        assert_eq!(
            MySqlDialect.bind_value(Value::Xml(Some(XmlDocument::parse("<a/>").unwrap()))),
            Value::Varchar(Some("<a/>".into()))
        );
        assert_eq!(
            MySqlDialect.bind_value(Value::Int16(Some(5))),
            Value::Int16(Some(5))
        );
        assert_eq!(SqlServerDialect.parameter_name("Id"), "@Id");
        assert_eq!(OracleDialect.parameter_name("Id"), ":Id");
        assert_eq!(OracleDialect.batch_parameter_name("Id", 4), ":Id_4");
    }

    #[test]
    fn already_exists() {
        let dialect = SqliteDialect;
        assert!(dialect.is_already_exists(&strata_core::Error::msg(
            "table ORDERS_202311 already exists"
        )));
        assert!(dialect.is_already_exists(&strata_core::Error::msg(
            "There is already an object named 'ORDERS_202311' in the database."
        )));
        assert!(dialect.is_already_exists(&strata_core::Error::msg(
            "ORA-00955: name is already used by an existing object"
        )));
        assert!(!dialect.is_already_exists(&strata_core::Error::msg("no such table: ORDERS")));
    }
}
