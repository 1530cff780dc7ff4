use regex::RegexBuilder;
use std::borrow::Cow;

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Replaces every occurrence of `needle` in `haystack`, ignoring ASCII case.
pub fn replace_ignore_case<'a>(haystack: &'a str, needle: &str, replacement: &str) -> Cow<'a, str> {
    if needle.is_empty() {
        return Cow::Borrowed(haystack);
    }
    match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.replace_all(haystack, regex::NoExpand(replacement)),
        Err(e) => {
            log::error!("{:#}", e);
            Cow::Borrowed(haystack)
        }
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..::std::cmp::min($query.len(), 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Builds the positional parameter list consumed by the `?` placeholders.
///
/// ```rust
/// use strata_core::{Value, params};
/// let p = params![1, "abc", true];
/// assert_eq!(p.len(), 3);
/// assert_eq!(p[1], Value::Varchar(Some("abc".into())));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}
