#![forbid(unsafe_code)]

//! Character escaping for canonical output.
//!
//! - Text nodes: `&`, `<`, `>` and `\r` are replaced by references.
//! - Attribute values: `&`, `<`, `"`, `\t`, `\n` and `\r`.
//! - Processing instruction data: only `\r`.

/// Append text node content, escaped.
pub fn write_text(out: &mut Vec<u8>, s: &str) {
    write_escaped(out, s, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\r' => Some("&#xD;"),
        _ => None,
    });
}

/// Append an attribute value, escaped.
pub fn write_attr(out: &mut Vec<u8>, s: &str) {
    write_escaped(out, s, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '"' => Some("&quot;"),
        '\t' => Some("&#x9;"),
        '\n' => Some("&#xA;"),
        '\r' => Some("&#xD;"),
        _ => None,
    });
}

/// Append processing instruction data, escaped.
pub fn write_pi(out: &mut Vec<u8>, s: &str) {
    write_escaped(out, s, |c| (c == '\r').then_some("&#xD;"));
}

fn write_escaped(out: &mut Vec<u8>, s: &str, replace: impl Fn(char) -> Option<&'static str>) {
    let mut buf = [0u8; 4];
    for ch in s.chars() {
        match replace(ch) {
            Some(r) => out.extend_from_slice(r.as_bytes()),
            None => out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes()),
        }
    }
}
