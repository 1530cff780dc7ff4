use crate::{Dialect, Parameter, Statement, TableDescriptor, Value};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static FIELD_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("Field placeholder pattern is valid"));

/// Rewrites `{Field}` placeholders into the column names of `table`. Placeholders not naming
/// a mapped field are left as they are.
pub fn format_where_order(table: &TableDescriptor, text: &str) -> String {
    FIELD_PLACEHOLDER
        .replace_all(text, |captures: &Captures| {
            match table.column_by_field(captures[1].trim()) {
                Some(column) => column.name.clone(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrites the `?` placeholders into `p0`, `p1`, ... in the parameter syntax of the dialect,
/// left to right. Question marks inside single quoted literals are kept.
pub fn format_positional(dialect: &dyn Dialect, text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut quoted = false;
    let mut index = 0;
    for c in text.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                out.push(c);
            }
            '?' if !quoted => {
                out.push_str(&dialect.parameter_name(&format!("p{}", index)));
                index += 1;
            }
            _ => out.push(c),
        }
    }
    out
}

/// Statement with its `?` placeholders rewritten and `values` bound as `p0`, `p1`, ...
pub fn positional_statement(dialect: &dyn Dialect, text: &str, values: Vec<Value>) -> Statement {
    let parameters = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| Parameter {
            name: dialect.parameter_name(&format!("p{}", i)),
            value: dialect.bind_value(value),
        })
        .collect();
    Statement::with_parameters(format_positional(dialect, text), parameters)
}
