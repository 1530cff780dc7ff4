use crate::{
    ColumnDescriptor, ColumnType, DataError, Dialect, DialectKind, IdentityRetrieval, Page,
    Result, TableDescriptor, separated_by, write_create_table_head, write_select_body,
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn parameter_prefix(&self) -> &'static str {
        ":"
    }

    /// Keys are always written, identity keys receive the value drawn from the sequence.
    fn insert_columns<'a>(&self, table: &'a TableDescriptor) -> Vec<&'a ColumnDescriptor> {
        table
            .primary_keys
            .iter()
            .map(|v| &v.column)
            .chain(table.columns.iter().filter(|v| v.insert))
            .collect()
    }

    fn write_insert(&self, out: &mut String, table: &TableDescriptor, physical: &str) {
        let columns = self.insert_columns(table);
        let _ = write!(out, "insert into {}(", physical);
        separated_by(out, columns.iter(), |out, v| out.push_str(&v.name), ",");
        out.push_str(")values(");
        separated_by(
            out,
            columns.iter(),
            |out, v| out.push_str(&self.parameter_name(v.field)),
            ",",
        );
        out.push(')');
    }

    /// `INSERT ALL` with one `INTO T(..)VALUES(..)` line per row, closed by
    /// `SELECT 1 FROM DUAL`.
    fn write_batch_insert(
        &self,
        out: &mut String,
        table: &TableDescriptor,
        physical: &str,
        count: usize,
    ) -> Result<()> {
        if table.identity_key().is_some() {
            return Err(DataError::UnsupportedOperation(format!(
                "Batch insert into the identity table `{}` on oracle",
                table.name
            ))
            .raise());
        }
        let columns = self.insert_columns(table);
        let mut into = String::new();
        let _ = write!(into, "INTO {}(", physical);
        separated_by(&mut into, columns.iter(), |out, v| out.push_str(&v.name), ",");
        into.push(')');
        out.push_str("INSERT ALL ");
        let mut index = 0;
        for _ in 0..count {
            out.push('\n');
            out.push_str(&into);
            out.push_str("VALUES(");
            separated_by(
                out,
                columns.iter(),
                |out, v| {
                    out.push_str(&self.batch_parameter_name(v.field, index));
                    index += 1;
                },
                ",",
            );
            out.push_str(") ");
        }
        out.push_str("\nSELECT 1 FROM DUAL");
        Ok(())
    }

    fn write_paging(&self, out: &mut String, page: &Page) -> Result<()> {
        page.check()?;
        out.push_str("select * from( select a.*, rownum r__n from( ");
        write_select_body(out, page, true);
        let _ = write!(
            out,
            " ) a where rownum <= {} ) b where r__n > {}",
            page.index as u64 * page.size as u64,
            page.offset()
        );
        Ok(())
    }

    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::SequenceBefore
    }

    fn begin_transaction(&self) -> &'static str {
        "SET TRANSACTION READ WRITE"
    }

    fn write_column_type(&self, out: &mut String, column_type: ColumnType) {
        out.push_str(match column_type {
            ColumnType::Boolean => "NUMBER(1)",
            ColumnType::Int8 | ColumnType::UInt8 => "NUMBER(3)",
            ColumnType::Int16 | ColumnType::UInt16 => "NUMBER(5)",
            ColumnType::Int32 | ColumnType::UInt32 => "NUMBER(10)",
            ColumnType::Int64 | ColumnType::UInt64 | ColumnType::Interval => "NUMBER(19)",
            ColumnType::Float32 => "BINARY_FLOAT",
            ColumnType::Float64 => "BINARY_DOUBLE",
            ColumnType::Decimal => "NUMBER(18,4)",
            ColumnType::Text => "VARCHAR2(4000)",
            ColumnType::DateTime => "DATE",
            ColumnType::Uuid => "VARCHAR2(32)",
            ColumnType::Bytes => "BLOB",
            ColumnType::Xml => "CLOB",
        });
    }

    /// The key constraint is added by a separate `alter table`.
    fn create_table_statements(&self, table: &TableDescriptor) -> Vec<String> {
        let mut create = String::new();
        write_create_table_head(self, &mut create, table);
        create.push(')');
        let mut alter = String::new();
        let _ = write!(
            alter,
            "alter table {0} add constraint PK_{0} primary key (",
            table.name
        );
        separated_by(&mut alter, table.primary_keys.iter(), |out, v| out.push_str(v.name()), ",");
        alter.push(')');
        vec![create, alter]
    }
}
