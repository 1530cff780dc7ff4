#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use strata_core::{
        AsValue, ColumnDescriptor, ColumnType, DynamicRecord, Entity, FieldSlot, KeyGeneration,
        MarshallerCache, Record, Result, Row, RowShape, TableDescriptor, Value,
    };
    use uuid::Uuid;

    #[derive(Default, Debug, PartialEq)]
    struct Account {
        id: i64,
        active: bool,
        token: Uuid,
        note: Option<String>,
    }

    static ACCOUNT_FIELDS: [FieldSlot<Account>; 4] = [
        FieldSlot {
            name: "id",
            get: |v| v.id.as_value(),
            set: |v, value| {
                v.id = AsValue::try_from_value(value)?;
                Ok(())
            },
        },
        FieldSlot {
            name: "active",
            get: |v| v.active.as_value(),
            set: |v, value| {
                v.active = AsValue::try_from_value(value)?;
                Ok(())
            },
        },
        FieldSlot {
            name: "token",
            get: |v| v.token.as_value(),
            set: |v, value| {
                v.token = AsValue::try_from_value(value)?;
                Ok(())
            },
        },
        FieldSlot {
            name: "note",
            get: |v| v.note.clone().as_value(),
            set: |v, value| {
                v.note = AsValue::try_from_value(value)?;
                Ok(())
            },
        },
    ];

    impl Record for Account {
        fn fields() -> &'static [FieldSlot<Self>] {
            &ACCOUNT_FIELDS
        }
    }

    impl Entity for Account {
        fn table() -> Result<TableDescriptor> {
            TableDescriptor::builder::<Account>("ACCOUNTS")
                .primary_key(
                    ColumnDescriptor::new("account_id", "id", 0, ColumnType::Int64),
                    KeyGeneration::Unassigned,
                )
                .column(ColumnDescriptor::new("is_active", "active", 1, ColumnType::Boolean))
                .column(ColumnDescriptor::new("token", "token", 2, ColumnType::Uuid))
                .column(ColumnDescriptor::new("note", "note", 3, ColumnType::Text))
                .build()
        }
    }

    const TOKEN: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    fn shape(names: &[&str], types: &[ColumnType]) -> Arc<RowShape> {
        Arc::new(RowShape::new(
            names.iter().map(ToString::to_string).collect::<Vec<_>>(),
            types.to_vec(),
        ))
    }

    fn account_shape() -> Arc<RowShape> {
        shape(
            &["ACCOUNT_ID", "IS_ACTIVE", "TOKEN", "NOTE", "EXTRA"],
            &[
                ColumnType::Int64,
                ColumnType::Int32,
                ColumnType::Text,
                ColumnType::Text,
                ColumnType::Int32,
            ],
        )
    }

    fn account_row(shape: &Arc<RowShape>, token: &str) -> Row {
        Row::new(
            shape.clone(),
            vec![
                Value::Int64(Some(5)),
                Value::Int32(Some(1)),
                Value::Varchar(Some(token.into())),
                Value::Null,
                Value::Int32(Some(9)),
            ]
            .into_boxed_slice(),
        )
    }

    #[test]
    fn marshal_mapped_columns() {
        let table = Account::table().unwrap();
        let cache = MarshallerCache::new();
        let shape = account_shape();
        let marshaller = cache.for_entity::<Account>(&table, &shape);
        assert_eq!(marshaller.len(), 4);
        let account = marshaller.populate(account_row(&shape, TOKEN)).unwrap();
        assert_eq!(
            account,
            Account {
                id: 5,
                active: true,
                token: Uuid::parse_str(TOKEN).unwrap(),
                note: None,
            }
        );
    }

    #[test]
    fn marshal_plain_fields() {
        let cache = MarshallerCache::new();
        let shape = shape(&["Id", "NOTE"], &[ColumnType::Int64, ColumnType::Text]);
        let marshaller = cache.for_record::<Account>(&shape);
        assert_eq!(marshaller.len(), 2);
        let account = marshaller
            .populate(Row::new(
                shape.clone(),
                vec![Value::Int32(Some(12)), Value::Varchar(Some("hello".into()))]
                    .into_boxed_slice(),
            ))
            .unwrap();
        assert_eq!(account.id, 12);
        assert_eq!(account.note.as_deref(), Some("hello"));
        assert!(!account.active);
        assert!(account.token.is_nil());
    }

    #[test]
    fn marshal_no_matching_column() {
        let cache = MarshallerCache::new();
        let shape = shape(&["COUNT(1)"], &[ColumnType::Int64]);
        let marshaller = cache.for_record::<Account>(&shape);
        assert!(marshaller.is_empty());
        let account = marshaller
            .populate(Row::new(
                shape.clone(),
                vec![Value::Int64(Some(3))].into_boxed_slice(),
            ))
            .unwrap();
        assert_eq!(account, Account::default());
    }

    #[test]
    fn marshal_conversion_error() {
        let table = Account::table().unwrap();
        let cache = MarshallerCache::new();
        let shape = account_shape();
        let error = cache
            .for_entity::<Account>(&table, &shape)
            .populate(account_row(&shape, "not a token"))
            .unwrap_err();
        let message = format!("{:#}", error);
        assert!(
            message.contains("While reading column `TOKEN`"),
            "Unexpected message: {}",
            message
        );
    }

    #[test]
    fn marshal_cache_reuse() {
        let table = Account::table().unwrap();
        let cache = MarshallerCache::new();
        let accounts = account_shape();
        let first = cache.for_entity::<Account>(&table, &accounts);
        assert_eq!(cache.compiled_count(), 1);
        assert_eq!(cache.hit_count(), 0);
        // Equal shape, different allocation
        let second = cache.for_entity::<Account>(&table, &account_shape());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compiled_count(), 1);
        assert_eq!(cache.hit_count(), 1);
        let other = shape(&["ACCOUNT_ID"], &[ColumnType::Int64]);
        cache.for_entity::<Account>(&table, &other);
        assert_eq!(cache.compiled_count(), 2);
        // Plain and mapped routines of the same type are kept apart
        let plain = cache.for_record::<Account>(&other);
        assert_eq!(cache.compiled_count(), 3);
        assert!(plain.is_empty());
        cache.dynamic_index(&other);
        assert_eq!(cache.compiled_count(), 4);
        cache.dynamic_index(&other);
        assert_eq!(cache.compiled_count(), 4);
        assert_eq!(cache.hit_count(), 2);
    }

    #[test]
    fn dynamic_record() {
        let cache = MarshallerCache::new();
        let shape = shape(
            &["Customer", "total", "Customer"],
            &[ColumnType::Text, ColumnType::Decimal, ColumnType::Text],
        );
        let record = DynamicRecord::new(
            cache.dynamic_index(&shape),
            vec![
                Value::Varchar(Some("ACME".into())),
                Value::Int64(Some(250)),
                Value::Varchar(Some("shadowed".into())),
            ]
            .into_boxed_slice(),
        );
        assert_eq!(record.len(), 3);
        assert_eq!(record.names(), ["CUSTOMER", "TOTAL", "CUSTOMER"]);
        assert_eq!(
            record.get("customer"),
            Some(&Value::Varchar(Some("ACME".into())))
        );
        assert_eq!(record.get_as::<i32>("TOTAL").unwrap(), Some(250));
        assert_eq!(record.get_as::<String>("missing").unwrap(), None);
        assert!(record.get_as::<Uuid>("Customer").is_err());

        let empty = DynamicRecord::new(
            cache.dynamic_index(&shape),
            vec![Value::Null, Value::Decimal(None), Value::Null].into_boxed_slice(),
        );
        assert_eq!(empty.get_as::<i64>("total").unwrap(), None);
    }
}
