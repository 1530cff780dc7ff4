use crate::{
    ColumnType, DataError, Dialect, DialectKind, IdentityRetrieval, Page, Result,
    TableDescriptor, separated_by, write_create_table_head, write_select_body,
};
use std::fmt::Write;
use uuid::Uuid;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn encode_unique_id(&self, id: &Uuid) -> String {
        id.hyphenated().to_string()
    }

    /// `insert into T(A,B)select @a_0,@b_1` followed by ` union all select @a_2,@b_3`, one
    /// line per row.
    fn write_batch_insert(
        &self,
        out: &mut String,
        table: &TableDescriptor,
        physical: &str,
        count: usize,
    ) -> Result<()> {
        let columns = self.insert_columns(table);
        out.push_str("insert into ");
        out.push_str(physical);
        out.push('(');
        separated_by(out, columns.iter(), |out, v| out.push_str(&v.name), ",");
        out.push(')');
        let mut index = 0;
        for row in 0..count {
            if row > 0 {
                out.push_str(" union all ");
            }
            out.push_str("select ");
            separated_by(
                out,
                columns.iter(),
                |out, v| {
                    out.push_str(&self.batch_parameter_name(v.field, index));
                    index += 1;
                },
                ",",
            );
            out.push('\n');
        }
        Ok(())
    }

    fn write_paging(&self, out: &mut String, page: &Page) -> Result<()> {
        page.check()?;
        if page.index == 1 {
            let _ = write!(out, "select top {} ", page.size);
            let mut body = String::new();
            write_select_body(&mut body, page, true);
            out.push_str(&body["select ".len()..]);
            return Ok(());
        }
        if page.order_by.trim().is_empty() {
            return Err(DataError::InvalidArgument(
                "Cannot page past the first page of a query without an order".into(),
            )
            .raise());
        }
        let _ = write!(
            out,
            "select top {} * from ( select row_number() over (order by {}) as r__n, ",
            page.size, page.order_by
        );
        let mut body = String::new();
        write_select_body(&mut body, page, false);
        out.push_str(&body["select ".len()..]);
        let _ = write!(out, " ) a where r__n > {}", page.offset());
        Ok(())
    }

    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::SelectAfter("select @@identity;")
    }

    fn supports_bulk_load(&self) -> bool {
        true
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn commit_transaction(&self) -> &'static str {
        "COMMIT TRANSACTION"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK TRANSACTION"
    }

    fn write_column_type(&self, out: &mut String, column_type: ColumnType) {
        out.push_str(match column_type {
            ColumnType::Boolean => "bit",
            ColumnType::Int8 | ColumnType::UInt8 => "tinyint",
            ColumnType::Int16 | ColumnType::UInt16 => "smallint",
            ColumnType::Int32 | ColumnType::UInt32 => "int",
            ColumnType::Int64 | ColumnType::UInt64 | ColumnType::Interval => "bigint",
            ColumnType::Float32 => "real",
            ColumnType::Float64 => "float",
            ColumnType::Decimal => "decimal(18,4)",
            ColumnType::Text => "nvarchar(max)",
            ColumnType::DateTime => "datetime",
            ColumnType::Uuid => "varchar(36)",
            ColumnType::Bytes => "varbinary(max)",
            ColumnType::Xml => "xml",
        });
    }

    fn create_table_statements(&self, table: &TableDescriptor) -> Vec<String> {
        let mut out = String::new();
        write_create_table_head(self, &mut out, table);
        let _ = write!(out, ",constraint PK_{} primary key(", table.name);
        separated_by(&mut out, table.primary_keys.iter(), |out, v| out.push_str(v.name()), ",");
        out.push_str("))");
        vec![out]
    }
}
