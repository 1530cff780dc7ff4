mod customers;
mod events;
pub mod mock;
pub mod model;
mod sales;
mod transactions;

use crate::{
    customers::customers,
    events::events,
    model::{Customer, Event, Sale},
    sales::sales,
    transactions::transactions,
};
use log::LevelFilter;
use std::env;
use strata::{DataContext, DatabaseConfig, DialectKind, Driver, scope};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the common suites against the database at `url`. The database is expected to be
/// empty, the tables of the suites are created when missing.
pub async fn execute_tests<D: Driver>(driver: D, dialect: DialectKind, url: &str) {
    let context = DataContext::new(driver);
    context
        .register_scope(&scope![Customer, Sale, Event])
        .expect("Failed to register the suite types");
    context
        .register_database(
            DatabaseConfig::new("main", dialect, url)
                .pool_size(2)
                .check_schema(true),
        )
        .await
        .expect("Failed to register the database");
    customers(&context).await;
    sales(&context).await;
    events(&context).await;
    transactions(&context).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
