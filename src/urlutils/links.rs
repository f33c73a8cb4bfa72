//! URL and HTML link construction, canonical query strings and query rewriting.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::collections::BTreeMap;

/// Characters left alone by [`quote`]: alphanumerics and `_.-/`.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

/// Characters left alone by [`quote_plus`]: alphanumerics and `_.-`.
const FORM_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');

/// Separator between query arguments inside HTML attributes.
const HTML_ARG_SEPARATOR: &str = "&amp;";

/// Multi-valued query arguments keyed by name.
pub type QueryArgs = BTreeMap<String, Vec<String>>;

/// Escape `&`, `<` and `>`; with `quote` also `"`.
pub fn escape_html(text: &str, quote: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Percent-encode everything except alphanumerics and `_.-/`.
pub fn quote(text: &str) -> String {
    utf8_percent_encode(text, PATH_SAFE).to_string()
}

/// Form-encode: spaces become `+`, everything except alphanumerics and `_.-` is escaped.
pub fn quote_plus(text: &str) -> String {
    text.split(' ')
        .map(|part| utf8_percent_encode(part, FORM_SAFE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Inverse of [`quote_plus`]; invalid UTF-8 is replaced.
pub fn unquote_plus(text: &str) -> String {
    percent_decode_str(&text.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Build `base?k1=v1&amp;k2=v2`, quoting and HTML-escaping arguments when `escape` is set.
pub fn create_url(base: &str, args: &[(&str, &str)], escape: bool) -> String {
    let mut output = base.to_string();
    if args.is_empty() {
        return output;
    }
    output.push('?');
    let arguments: Vec<String> = args
        .iter()
        .map(|(key, value)| {
            if escape {
                format!(
                    "{}={}",
                    escape_html(&quote(key), true),
                    escape_html(&quote(value), true)
                )
            } else {
                format!("{key}={value}")
            }
        })
        .collect();
    output.push_str(&arguments.join(HTML_ARG_SEPARATOR));
    output
}

/// Build an `<a>` element. `label` must already be escaped.
pub fn create_html_link(
    base: &str,
    args: &[(&str, &str)],
    label: &str,
    attributes: &[(&str, &str)],
    escape_args: bool,
    escape_attributes: bool,
) -> String {
    let mut output = format!("<a href=\"{}\"", create_url(base, args, escape_args));
    if !attributes.is_empty() {
        let rendered: Vec<String> = attributes
            .iter()
            .map(|(key, value)| {
                if escape_attributes {
                    format!("{}=\"{}\"", escape_html(key, true), escape_html(value, true))
                } else {
                    format!("{key}=\"{value}\"")
                }
            })
            .collect();
        output.push(' ');
        output.push_str(&rendered.join(" "));
    }
    output.push('>');
    output.push_str(label);
    output.push_str("</a>");
    output
}

/// Drop arguments whose single value equals their default.
pub fn drop_default_urlargd(args: &QueryArgs, defaults: &BTreeMap<String, String>) -> QueryArgs {
    args.iter()
        .filter(|(key, values)| {
            !matches!(
                (defaults.get(*key), values.as_slice()),
                (Some(default), [only]) if default == only
            )
        })
        .map(|(key, values)| (key.clone(), values.clone()))
        .collect()
}

/// Canonical query string: defaults dropped, keys sorted, `?` prefix, `&amp;` separators.
///
/// Returns an empty string when no argument remains.
pub fn make_canonical_urlargd(args: &QueryArgs, defaults: &BTreeMap<String, String>) -> String {
    let canonical = drop_default_urlargd(args, defaults);
    let pairs: Vec<String> = canonical
        .iter()
        .flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| format!("{}={}", quote_plus(key), quote_plus(value)))
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join(HTML_ARG_SEPARATOR))
    }
}

/// Parse a query string, dropping arguments with blank values.
pub fn parse_query(query: &str) -> QueryArgs {
    let mut args = QueryArgs::new();
    for pair in query.split(['&', ';']).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = unquote_plus(value);
        if value.is_empty() {
            continue;
        }
        args.entry(unquote_plus(key)).or_default().push(value);
    }
    args
}

/// Compare two URLs, ignoring the order of query arguments.
pub fn same_urls(a: &str, b: &str) -> bool {
    split_url(a) == split_url(b)
}

fn split_url(url: &str) -> (&str, QueryArgs, Option<&str>) {
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let (prefix, query) = rest.split_once('?').unwrap_or((rest, ""));
    (prefix, parse_query(query), fragment)
}

/// Replace `old` by `new` in every value of the arguments whose name matches `name_pattern`.
///
/// The pattern is anchored at the start of the name. The result is joined with `&amp;` and
/// values are form-encoded.
pub fn urlargs_replace_text_in_arg(
    urlargs: &str,
    name_pattern: &str,
    old: &str,
    new: &str,
) -> Result<String, regex::Error> {
    let matcher = regex::Regex::new(&format!("^(?:{name_pattern})"))?;
    let pairs: Vec<String> = parse_query(urlargs)
        .into_iter()
        .flat_map(|(key, values)| {
            let rewrite = matcher.is_match(&key);
            values
                .into_iter()
                .map(|value| {
                    let value = if rewrite { value.replace(old, new) } else { value };
                    format!("{key}={}", quote_plus(&value))
                })
                .collect::<Vec<_>>()
        })
        .collect();
    Ok(pairs.join(HTML_ARG_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &[&str])]) -> QueryArgs {
        pairs
            .iter()
            .map(|(key, values)| {
                (
                    key.to_string(),
                    values.iter().map(|value| value.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn create_url_escapes_arguments() {
        assert_eq!(create_url("http://x/search", &[], true), "http://x/search");
        assert_eq!(
            create_url("http://x/search", &[("p", "a b"), ("of", "<hb>")], true),
            "http://x/search?p=a%20b&amp;of=%3Chb%3E"
        );
        assert_eq!(
            create_url("http://x/search", &[("p", "a b")], false),
            "http://x/search?p=a b"
        );
        assert_eq!(create_url("/r", &[("path", "a/b")], true), "/r?path=a/b");
    }

    #[test]
    fn create_html_link_renders_attributes() {
        assert_eq!(
            create_html_link(
                "http://x/record/3",
                &[("ln", "en")],
                "Record",
                &[("class", "img\"x")],
                true,
                true
            ),
            "<a href=\"http://x/record/3?ln=en\" class=\"img&quot;x\">Record</a>"
        );
        assert_eq!(
            create_html_link("/r", &[], "L", &[("title", "a<b")], true, false),
            "<a href=\"/r\" title=\"a<b\">L</a>"
        );
    }

    #[test]
    fn canonical_urlargd_drops_defaults() {
        let defaults = BTreeMap::from([
            ("of".to_string(), "hb".to_string()),
            ("rg".to_string(), "10".to_string()),
        ]);
        let query = args(&[("of", &["hb"]), ("p", &["higgs boson"]), ("rg", &["25"])]);
        assert_eq!(
            make_canonical_urlargd(&query, &defaults),
            "?p=higgs+boson&amp;rg=25"
        );
        assert_eq!(make_canonical_urlargd(&args(&[("of", &["hb"])]), &defaults), "");
        assert_eq!(
            make_canonical_urlargd(&args(&[("c", &["A", "B"])]), &defaults),
            "?c=A&amp;c=B"
        );
    }

    #[test]
    fn same_urls_ignores_argument_order() {
        assert!(same_urls("http://x/s?a=1&b=2", "http://x/s?b=2&a=1"));
        assert!(same_urls("/s?a=1&a=2#top", "/s?a=1&a=2#top"));
        assert!(!same_urls("http://x/s?a=1&a=2", "http://x/s?a=2&a=1"));
        assert!(!same_urls("http://x/s?a=1", "http://y/s?a=1"));
        assert!(same_urls("http://x/s?a=", "http://x/s"));
    }

    #[test]
    fn replace_text_only_in_matching_arguments() {
        let replaced =
            urlargs_replace_text_in_arg("p=foo+bar&p2=foo&f=foo", "p", "foo", "baz").expect("regex");
        assert_eq!(replaced, "f=foo&amp;p=baz+bar&amp;p2=baz");

        assert!(urlargs_replace_text_in_arg("p=1", "(", "a", "b").is_err());
    }

    #[test]
    fn quote_helpers_follow_form_rules() {
        assert_eq!(quote_plus("a b&c"), "a+b%26c");
        assert_eq!(unquote_plus("a+b%26c"), "a b&c");
        assert_eq!(quote("ä/x"), "%C3%A4/x");
        assert_eq!(escape_html("<a href=\"x\">&</a>", false), "&lt;a href=\"x\"&gt;&amp;&lt;/a&gt;");
    }
}
