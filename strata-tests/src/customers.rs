use crate::model::{CountryTotal, Customer, CustomerName};
use rust_decimal::Decimal;
use strata::{
    DataContext, Driver, IdGenerator, Page, Value, params,
    stream::TryStreamExt,
};
use time::macros::datetime;
use uuid::Uuid;

pub async fn customers<D: Driver>(context: &DataContext<D>) {
    let ids = IdGenerator::new(1).expect("Could not create the identifier generator");
    let mut session = context
        .default_session()
        .await
        .expect("Could not open a session");

    // Setup
    session
        .delete_where::<Customer>("", params![])
        .await
        .expect("Failed to clear the CUSTOMERS table");

    let mut ada = Customer {
        id: ids.next_id().0,
        name: "Ada".into(),
        country: Some("UK".into()),
        active: true,
        credit: Decimal::new(1005, 1),
        code: Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap(),
        created_at: Some(datetime!(2023-11-15 10:30:00)),
    };
    let mut bruno = Customer {
        id: ids.next_id().0,
        name: "Bruno".into(),
        country: Some("IT".into()),
        active: false,
        credit: Decimal::new(2025, 2),
        code: Uuid::nil(),
        created_at: None,
    };
    let mut carla = Customer {
        id: ids.next_id().0,
        name: "Carla".into(),
        country: Some("IT".into()),
        active: true,
        credit: Decimal::ZERO,
        ..Default::default()
    };
    let mut dario = Customer {
        id: ids.next_id().0,
        name: "Dario".into(),
        country: None,
        active: true,
        credit: Decimal::from(7),
        ..Default::default()
    };
    for customer in [&mut ada, &mut bruno, &mut carla, &mut dario] {
        let affected = session
            .insert(customer)
            .await
            .expect("Failed to insert a customer");
        assert_eq!(affected.rows_affected, 1);
    }

    // By key
    let found = session
        .get_by_id::<Customer>(ada.id)
        .await
        .expect("Failed to query Ada")
        .expect("Failed to find Ada");
    assert_eq!(found, ada);
    let found = session
        .get_by_id::<Customer>(bruno.id)
        .await
        .expect("Failed to query Bruno")
        .expect("Failed to find Bruno");
    assert_eq!(found.code, Uuid::nil());
    assert_eq!(found.created_at, None);
    assert!(!found.active);
    assert!(
        session
            .get_by_id::<Customer>(-1)
            .await
            .expect("Failed to query a missing customer")
            .is_none()
    );

    // Conditions
    let italians = session
        .get_list::<Customer>("{Country} = ?", "{Name} desc", params!["IT"])
        .await
        .expect("Failed to query the italian customers");
    assert_eq!(
        italians.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["Carla", "Bruno"]
    );
    let active = session
        .get_list::<Customer>("{active} = ? and {credit} > ?", "{name}", params![true, 1])
        .await
        .expect("Failed to query the active customers");
    assert_eq!(
        active.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["Ada", "Dario"]
    );
    let all = session
        .get_list::<Customer>("", "", params![])
        .await
        .expect("Failed to query all the customers");
    assert_eq!(all.len(), 4);
    let first = session
        .get_object::<Customer>("{Name} = ?", params!["Bruno"])
        .await
        .expect("Failed to query Bruno by name")
        .expect("Failed to find Bruno by name");
    assert_eq!(first.id, bruno.id);
    let no_country = session
        .get_list::<Customer>("{Country} is null", "", params![])
        .await
        .expect("Failed to query the customers without country");
    assert_eq!(no_country.len(), 1);
    assert_eq!(no_country[0].name, "Dario");

    // Update, the creation time is not updatable
    ada.credit = Decimal::new(25, 1);
    ada.active = false;
    let created = ada.created_at.take();
    let updated = session
        .update(&ada)
        .await
        .expect("Failed to update Ada");
    assert_eq!(updated, 1);
    ada.created_at = created;
    let found = session
        .get_by_id::<Customer>(ada.id)
        .await
        .expect("Failed to query Ada")
        .expect("Failed to find Ada");
    assert_eq!(found, ada);

    // Raw queries
    let inactive = session
        .get_list_by_sql::<Customer>(
            "select * from CUSTOMERS where ACTIVE = ? order by NAME",
            params![false],
        )
        .await
        .expect("Failed to query the inactive customers");
    assert_eq!(
        inactive.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["Ada", "Bruno"]
    );
    let totals = session
        .get_custom_list::<CountryTotal>(
            "select COUNTRY, count(*) as CUSTOMERS, sum(CREDIT) as CREDIT from CUSTOMERS where COUNTRY is not null group by COUNTRY order by COUNTRY",
            params![],
        )
        .await
        .expect("Failed to query the totals by country");
    assert_eq!(
        totals,
        [
            CountryTotal {
                country: "IT".into(),
                customers: 2,
                credit: Decimal::new(2025, 2),
            },
            CountryTotal {
                country: "UK".into(),
                customers: 1,
                credit: Decimal::new(25, 1),
            },
        ]
    );
    let name = session
        .get_custom_object::<CustomerName>(
            "select NAME from CUSTOMERS where ID = ?",
            params![carla.id],
        )
        .await
        .expect("Failed to query the name of Carla")
        .expect("Failed to find the name of Carla");
    assert_eq!(name.value, "Carla");
    let count = session
        .execute_scalar_as::<i64>("select count(*) from CUSTOMERS", params![])
        .await
        .expect("Failed to count the customers");
    assert_eq!(count, Some(4));
    let missing = session
        .execute_scalar("select NAME from CUSTOMERS where ID = ?", params![-1])
        .await
        .expect("Failed to query a missing name");
    assert!(missing.is_null());
    let rows = session
        .get_table("select ID, NAME from CUSTOMERS order by NAME", params![])
        .await
        .expect("Failed to query the customer table");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].get::<String>("name").unwrap(), "Dario");
    assert_eq!(rows[0].get::<i64>("ID").unwrap(), ada.id);
    let streamed = session
        .execute_reader("select NAME from CUSTOMERS where COUNTRY = ?", params!["IT"])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to stream the italian customers");
    assert_eq!(streamed.len(), 2);

    // Dynamic records
    let records = session
        .get_dynamic_list("select NAME, COUNTRY from CUSTOMERS order by NAME", params![])
        .await
        .expect("Failed to query the dynamic records");
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].get_as::<String>("name").unwrap(), Some("Ada".into()));
    assert_eq!(records[3].get_as::<String>("COUNTRY").unwrap(), None);
    assert!(records[0].get("CREDIT").is_none());
    let record = session
        .get_dynamic_object("select NAME from CUSTOMERS where ID = ?", params![dario.id])
        .await
        .expect("Failed to query Dario")
        .expect("Failed to find Dario");
    assert_eq!(record.get("NAME"), Some(&Value::Varchar(Some("Dario".into()))));

    // Paging
    let page = Page {
        index: 2,
        size: 3,
        fields: "NAME",
        from: "CUSTOMERS",
        order_by: "NAME",
        ..Default::default()
    };
    let names = session
        .get_paging_list::<CustomerName>(&page, params![])
        .await
        .expect("Failed to query the second page");
    assert_eq!(names, [CustomerName { value: "Dario".into() }]);
    let page = Page {
        index: 1,
        size: 2,
        fields: "NAME, COUNTRY",
        from: "CUSTOMERS",
        condition: "ACTIVE = ?",
        order_by: "NAME desc",
        ..Default::default()
    };
    let records = session
        .get_dynamic_paging_list(&page, params![true])
        .await
        .expect("Failed to query the active page");
    assert_eq!(
        records
            .iter()
            .map(|v| v.get_as::<String>("NAME").unwrap().unwrap_or_default())
            .collect::<Vec<_>>(),
        ["Dario", "Carla"]
    );

    // Deletion
    let deleted = session
        .delete_by_id::<Customer>(carla.id)
        .await
        .expect("Failed to delete Carla");
    assert_eq!(deleted, 1);
    assert!(
        session
            .get_by_id::<Customer>(carla.id)
            .await
            .expect("Failed to query Carla")
            .is_none()
    );
    let deleted = session
        .delete_where::<Customer>("{Active} = ?", params![false])
        .await
        .expect("Failed to delete the inactive customers");
    assert_eq!(deleted, 2);
    let deleted = session
        .execute_non_query("delete from CUSTOMERS where ID = ?", params![dario.id])
        .await
        .expect("Failed to delete Dario");
    assert_eq!(deleted, 1);
    let count = session
        .execute_scalar_as::<i64>("select count(*) from CUSTOMERS", params![])
        .await
        .expect("Failed to count the customers");
    assert_eq!(count, Some(0));
    session.release().await;
}
