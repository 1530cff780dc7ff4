use rust_decimal::Decimal;
use strata::{AsValue, Entity, Record};
use time::PrimitiveDateTime;
use uuid::Uuid;

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(table = "CUSTOMERS", cache = "list", cache_seconds = 60)]
pub struct Customer {
    #[strata(primary_key)]
    pub id: i64,
    #[strata(not_null)]
    pub name: String,
    pub country: Option<String>,
    pub active: bool,
    pub credit: Decimal,
    pub code: Uuid,
    #[strata(column = "CREATED", no_update)]
    pub created_at: Option<PrimitiveDateTime>,
}

#[derive(AsValue, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    #[default]
    Draft = 0,
    Paid = 1,
    Refunded = 4,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(
    table = "SALES",
    partition = "monthly",
    create_sql = "create table SALES (ID bigint not null primary key, CUSTOMER_ID bigint, AMOUNT decimal(18,2), STATUS int, NOTE varchar(200)); create index IX_SALES_CUSTOMER on SALES (CUSTOMER_ID)",
    cache = "object",
    cache_seconds = 30
)]
pub struct Sale {
    #[strata(primary_key)]
    pub id: i64,
    pub customer_id: i64,
    #[strata(data_type = "decimal(18,2)")]
    pub amount: Decimal,
    pub status: SaleStatus,
    pub note: Option<String>,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(table = "EVENTS")]
pub struct Event {
    #[strata(primary_key, identity)]
    pub id: i64,
    pub name: String,
    pub happened_at: Option<PrimitiveDateTime>,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct CountryTotal {
    pub country: String,
    pub customers: i64,
    pub credit: Decimal,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct CustomerName {
    #[strata(column = "NAME")]
    pub value: String,
}
