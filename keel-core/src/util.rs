use std::{cmp::min, sync::PoisonError};
use syn::Path;

pub fn matches_path(path: &Path, expect: &[&str]) -> bool {
    let len = min(path.segments.len(), expect.len());
    path.segments
        .iter()
        .rev()
        .take(len)
        .map(|v| &v.ident)
        .eq(expect.iter().rev().take(len))
}

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

pub fn consume_while<'s>(input: &mut &'s str, predicate: impl FnMut(&char) -> bool) -> &'s str {
    let len = input
        .chars()
        .take_while(predicate)
        .map(char::len_utf8)
        .sum::<usize>();
    if len == 0 {
        return "";
    }
    let result = &input[..len];
    *input = &input[len..];
    result
}

/// True for names made only of ASCII alphanumerics and underscores, not starting with a digit.
pub fn is_plain_identifier(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with(|c: char| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Caches only ever hold fully built entries, a poisoned lock still guards consistent data.
pub(crate) fn unpoison<G>(result: Result<G, PoisonError<G>>) -> G {
    result.unwrap_or_else(PoisonError::into_inner)
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$query
                .char_indices()
                .map(|(i, _)| i)
                .nth(497)
                .unwrap_or($query.len())]
                .trim_end(),
            if $query.chars().nth(497).is_some() {
                "..."
            } else {
                ""
            },
        )
    };
}
