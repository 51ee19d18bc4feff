//! Text-format output for message trees.

use std::fmt::{self, Write};

use super::message::{Message, Value};

const INDENT: &str = "  ";

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_message(f, self, 0)
    }
}

/// Write every field of `message` on its own line at `depth` indentation.
pub fn write_message<W: Write>(out: &mut W, message: &Message, depth: usize) -> fmt::Result {
    for field in message {
        for _ in 0..depth {
            out.write_str(INDENT)?;
        }
        match &field.value {
            Value::Message(nested) => {
                writeln!(out, "{} {{", field.name)?;
                write_message(out, nested, depth + 1)?;
                for _ in 0..depth {
                    out.write_str(INDENT)?;
                }
                out.write_str("}\n")?;
            }
            Value::String(s) => writeln!(out, "{}: \"{}\"", field.name, escape(s))?,
            Value::Number(n) | Value::Ident(n) => writeln!(out, "{}: {}", field.name, n)?,
        }
    }
    Ok(())
}

/// Escape a string for a double-quoted literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x80 => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
