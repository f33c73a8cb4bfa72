//! Pure text helpers shared by the indexer and the web helpers.
//!
//! Solr rejects documents carrying characters that are not allowed in XML 1.0, so every value is
//! passed through [`remove_control_characters`] and [`remove_invalid_index_characters`] before it
//! is submitted. Both functions are deterministic and idempotent.

/// Replace control characters with a single space.
///
/// Covers C0 controls other than tab, line feed and carriage return, `DEL`, and the C1 block.
pub fn remove_control_characters(text: &str) -> String {
    text.chars()
        .map(|ch| if is_strippable_control(ch) { ' ' } else { ch })
        .collect()
}

/// Remove or neutralize characters that Solr refuses to index.
///
/// C0 controls (other than tab, line feed and carriage return) become a space; the
/// non-characters `U+FFFE` and `U+FFFF` are dropped. Surrogates cannot occur in a `str`; use
/// [`sanitize_utf16`] when the input is raw UTF-16.
pub fn remove_invalid_index_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{FFFE}' | '\u{FFFF}' => {}
            ch if is_c0_control(ch) => out.push(' '),
            ch => out.push(ch),
        }
    }
    out
}

/// Decode UTF-16 code units, dropping unpaired surrogates, then sanitize for Solr.
pub fn sanitize_utf16(units: &[u16]) -> String {
    let decoded: String = char::decode_utf16(units.iter().copied())
        .filter_map(Result::ok)
        .collect();
    remove_invalid_index_characters(&decoded)
}

/// Prefix every line of `text` with `nb_tabs` copies of `tab_str`.
///
/// Lines are split on `linebreak_input` and each one is terminated by `linebreak_output`, so the
/// output always ends with a line break.
pub fn indent_text(
    text: &str,
    nb_tabs: usize,
    tab_str: &str,
    linebreak_input: &str,
    linebreak_output: &str,
) -> String {
    let tabs = tab_str.repeat(nb_tabs);
    let mut output = String::with_capacity(text.len() + tabs.len());
    for line in text.split(linebreak_input) {
        output.push_str(&tabs);
        output.push_str(line);
        output.push_str(linebreak_output);
    }
    output
}

fn is_c0_control(ch: char) -> bool {
    ch < '\u{20}' && !matches!(ch, '\t' | '\n' | '\r')
}

fn is_strippable_control(ch: char) -> bool {
    is_c0_control(ch) || ('\u{7F}'..='\u{9F}').contains(&ch)
}
