// ── Value formatting ──
//
// Turns a decoded variable binding into a display-ready `SnmpResult`,
// using the schema for names, enumeration labels, BITS and display hints.

use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};

use oidscope_api::oid::format_arcs;
use oidscope_api::{Oid, Value, VarBind};

use crate::model::SnmpResult;
use crate::schema::{Schema, SchemaNode};

/// Format one binding for display.
pub fn format_varbind(varbind: &VarBind, schema: &dyn Schema) -> SnmpResult {
    let node = schema.longest_prefix(&varbind.oid);
    SnmpResult {
        oid: varbind.oid.clone(),
        name: resolve_name(&varbind.oid, schema),
        value: format_value(&varbind.value, node, schema),
        type_name: varbind.value.type_name().to_owned(),
    }
}

/// `name.suffix` for the deepest schema node covering `oid`, or the
/// numeric OID when nothing matches.
pub fn resolve_name(oid: &Oid, schema: &dyn Schema) -> String {
    let Some(node) = schema.longest_prefix(oid) else {
        return oid.to_string();
    };
    match oid.strip_prefix(&node.oid) {
        Some([]) | None => node.name.clone(),
        Some(suffix) => format!("{}.{}", node.name, format_arcs(suffix)),
    }
}

/// Value text, decorated by `node` when the schema knows the object.
pub fn format_value(value: &Value, node: Option<&SchemaNode>, schema: &dyn Schema) -> String {
    match value {
        Value::Integer(n) => node
            .and_then(|node| node.enums.get(n))
            .map_or_else(|| n.to_string(), |label| format!("{label}({n})")),
        Value::OctetString(bytes) => format_octets(bytes, node),
        Value::ObjectIdentifier(oid) => resolve_name(oid, schema),
        Value::IpAddress(addr) => Ipv4Addr::from(*addr).to_string(),
        Value::Counter32(n) | Value::Gauge32(n) => n.to_string(),
        Value::TimeTicks(ticks) => format_timeticks(*ticks),
        Value::Opaque(bytes) => hex(bytes),
        Value::Counter64(n) => n.to_string(),
        Value::Other(text) => text.clone(),
        Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            value.type_name().to_owned()
        }
    }
}

fn format_octets(bytes: &[u8], node: Option<&SchemaNode>) -> String {
    if let Some(node) = node {
        if !node.bits.is_empty() {
            return format_bits(bytes, node);
        }
        if let Some(text) = node
            .display_hint
            .as_deref()
            .and_then(|hint| apply_display_hint(hint, bytes))
        {
            return text;
        }
    }

    if is_printable(bytes) {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return text.to_owned();
        }
    }

    match bytes.len() {
        4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(bytes);
            Ipv4Addr::from(octets).to_string()
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            Ipv6Addr::from(octets).to_string()
        }
        6 => bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":"),
        _ => hex(bytes),
    }
}

fn format_bits(bytes: &[u8], node: &SchemaNode) -> String {
    let set: Vec<&str> = node
        .bits
        .iter()
        .filter(|&(&bit, _)| {
            let byte = usize::try_from(bit / 8).ok().and_then(|i| bytes.get(i));
            byte.is_some_and(|&b| b & (0x80_u8 >> (bit % 8)) != 0)
        })
        .map(|(_, label)| label.as_str())
        .collect();
    if set.is_empty() {
        "(none)".to_owned()
    } else {
        set.join(", ")
    }
}

/// Text with no control characters besides tab, CR and LF.
fn is_printable(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes
            .iter()
            .all(|&c| (c >= 0x20 || matches!(c, b'\t' | b'\n' | b'\r')) && c != 0x7f)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// TimeTicks are hundredths of a second.
pub fn format_timeticks(ticks: u32) -> String {
    let total = ticks / 100;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;
    if days > 0 {
        format!("{days} days, {hours:02}:{mins:02}:{secs:02} ({ticks})")
    } else {
        format!("{hours:02}:{mins:02}:{secs:02} ({ticks})")
    }
}

// ── DISPLAY-HINT (RFC 2579 §3.1, octet strings) ──────────────────────

struct HintSpec {
    repeat: bool,
    len: usize,
    format: char,
    separator: Option<char>,
    terminator: Option<char>,
}

fn parse_hint(hint: &str) -> Option<Vec<HintSpec>> {
    let chars: Vec<char> = hint.chars().collect();
    let mut specs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let repeat = chars.get(i) == Some(&'*');
        if repeat {
            i += 1;
        }
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        let len: usize = chars.get(start..i)?.iter().collect::<String>().parse().ok()?;
        let format = *chars.get(i)?;
        if !matches!(format, 'x' | 'd' | 'o' | 'a' | 't') {
            return None;
        }
        i += 1;
        let is_sep = |c: Option<&char>| c.is_some_and(|c| !c.is_ascii_digit() && *c != '*');
        let separator = if is_sep(chars.get(i)) {
            i += 1;
            chars.get(i - 1).copied()
        } else {
            None
        };
        let terminator = if repeat && is_sep(chars.get(i)) {
            i += 1;
            chars.get(i - 1).copied()
        } else {
            None
        };
        specs.push(HintSpec {
            repeat,
            len,
            format,
            separator,
            terminator,
        });
    }
    (!specs.is_empty()).then_some(specs)
}

/// Render `bytes` per an octet-string display hint. `None` if the hint
/// cannot be parsed, in which case the caller falls back to heuristics.
pub fn apply_display_hint(hint: &str, bytes: &[u8]) -> Option<String> {
    let specs = parse_hint(hint)?;
    let mut out = String::new();
    let mut pos = 0;
    let mut spec_idx = 0;

    while pos < bytes.len() {
        let spec = specs.get(spec_idx.min(specs.len() - 1))?;
        let count = if spec.repeat {
            let n = usize::from(*bytes.get(pos)?);
            pos += 1;
            n
        } else {
            1
        };

        for rep in 0..count {
            if pos >= bytes.len() {
                break;
            }
            let end = pos.saturating_add(spec.len.max(1)).min(bytes.len());
            let chunk = bytes.get(pos..end)?;
            pos = end;
            match spec.format {
                'a' | 't' => out.push_str(&String::from_utf8_lossy(chunk)),
                fmt => {
                    let n = chunk.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
                    let width = chunk.len() * 2;
                    let _ = match fmt {
                        'x' => write!(out, "{n:0width$x}"),
                        'o' => write!(out, "{n:o}"),
                        _ => write!(out, "{n}"),
                    };
                }
            }
            let last_rep = rep + 1 == count;
            if pos < bytes.len() {
                match (last_rep, spec.terminator, spec.separator) {
                    (true, Some(t), _) => out.push(t),
                    (_, _, Some(s)) => out.push(s),
                    _ => {}
                }
            }
        }
        spec_idx += 1;
    }
    Some(out)
}
