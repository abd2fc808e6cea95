/// Write `values` into `out` through `f`, with `separator` between the ones that produced output.
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

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:ident, $cond:expr, $v:expr) => {
        if $cond {
            $buff.push('(');
            $v;
            $buff.push(')');
        } else {
            $v;
        }
    };
}

/// Shortens long text (queries, values) before it ends up in a log line or error message.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        match &$query {
            query => {
                let query: &str = ::std::convert::AsRef::<str>::as_ref(query);
                match query.char_indices().nth(497) {
                    Some((i, _)) => format!("{}...", query[..i].trim_end()),
                    None => query.trim_end().to_owned(),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_skips_empty_items() {
        let mut out = String::from("(");
        separated_by(
            &mut out,
            ["a", "", "b", "c"],
            |out, v| out.push_str(v),
            ", ",
        );
        out.push(')');
        assert_eq!(out, "(a, b, c)");
    }

    #[test]
    fn long_text_is_truncated() {
        let short = "SELECT 1;";
        assert_eq!(format!("{}", truncate_long!(short)), "SELECT 1;");
        let long = "x".repeat(600);
        let printed = format!("{}", truncate_long!(long));
        assert_eq!(printed.len(), 500);
        assert!(printed.ends_with("..."));
    }

    #[test]
    fn temporaries_are_truncated() {
        let printed = truncate_long!("y".repeat(600));
        assert_eq!(printed.len(), 500);
        let bytes = b"SELECT 2;  ".to_vec();
        assert_eq!(truncate_long!(String::from_utf8_lossy(&bytes)), "SELECT 2;");
    }
}
