use rust_decimal::Decimal;
use strata::{AsValue, Entity, Record};
use time::PrimitiveDateTime;
use uuid::Uuid;

#[derive(AsValue, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    #[default]
    Open = 1,
    Shipped = 2,
    Cancelled = 9,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(
    table = "ORDERS",
    partition = "monthly",
    create_sql = "create table ORDERS (ID bigint not null primary key, AMOUNT decimal(18,2), STATUS int, CUSTOMER varchar(32), PLACED_AT datetime, NOTE varchar(200))",
    cache = "object",
    cache_seconds = 300
)]
pub struct Order {
    #[strata(primary_key)]
    pub id: i64,
    #[strata(not_null, default = "0", data_type = "decimal(18,2)")]
    pub amount: Decimal,
    pub status: OrderStatus,
    #[strata(column = "CUSTOMER", no_update)]
    pub customer_id: Uuid,
    #[strata(no_insert)]
    pub placed_at: Option<PrimitiveDateTime>,
    pub note: Option<String>,
    #[strata(ignore)]
    pub dirty: bool,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    #[strata(primary_key, identity)]
    pub entry_id: i32,
    pub message: String,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct OrderTotal {
    #[strata(column = "CUSTOMER")]
    pub customer: String,
    pub total: Decimal,
    pub orders: i64,
}
