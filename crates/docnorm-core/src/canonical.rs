//! Value canonicalizer - stable text forms of arbitrary record values
//!
//! Two forms are produced from the same writer:
//!
//! - **Lookup key** (`lookup_key`): compares a raw value against the keys of
//!   a field's `value_mappings`. Uses `", "` / `": "` separators, the layout
//!   legacy normalization maps were keyed with.
//! - **Hash input** (`canonical_json`): feeds the identity digest. Uses
//!   minimal `","` / `":"` separators.
//!
//! Both sort object members by key, escape every non-printable or
//! non-ASCII character as `\uXXXX`, and keep the JSON type visible, so the
//! number `1` and the string `"1"` never share a form.

use serde_json::Value;

/// Separator layout used when writing a canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separators {
    /// `,` between items and `:` after keys
    Compact,
    /// `, ` between items and `: ` after keys
    Spaced,
}

impl Separators {
    fn item(self) -> &'static str {
        match self {
            Separators::Compact => ",",
            Separators::Spaced => ", ",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Separators::Compact => ":",
            Separators::Spaced => ": ",
        }
    }
}

// ── Public API ─────────────────────────────────────────────

/// Lookup key of a value, as used by `value_mappings`.
///
/// `null` → `null`, booleans → `true`/`false`, strings keep their quotes,
/// containers are written with sorted members.
pub fn lookup_key(value: &Value) -> String {
    to_canonical_string(value, Separators::Spaced)
}

/// Canonical hash input of a value: sorted keys, minimal separators.
pub fn canonical_json(value: &Value) -> String {
    to_canonical_string(value, Separators::Compact)
}

/// Render `value` in canonical form with the given separators
pub fn to_canonical_string(value: &Value, separators: Separators) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value, separators);
    out
}

/// Append the canonical form of `value` to `out`
pub fn write_canonical(out: &mut String, value: &Value, separators: Separators) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(separators.item());
                }
                write_canonical(out, item, separators);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(separators.item());
                }
                write_string(out, key);
                out.push_str(separators.key());
                write_canonical(out, item, separators);
            }
            out.push('}');
        }
    }
}

// ── String escaping ────────────────────────────────────────

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}
