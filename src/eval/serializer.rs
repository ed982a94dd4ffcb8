//! Serialiser Prelude
//!
//! A plain-dialect serialiser injected into every compile-time program
//! and into the emitted output, as a global under the reserved key
//! `__repr`. It round-trips strings, tables (with a fresh metatable
//! attached per trip), functions (as byte-dumps reloaded via `load`),
//! and falls back to the default string conversion for everything else.

/// The serialiser source. Prepended verbatim to every generated
/// compile-time program and to the output file.
pub const SERIALIZER_PRELUDE: &str = r#"__repr = function(value)
  local t = type(value)
  if t == "string" then
    return string.format("%q", value)
  end
  if t == "table" then
    local parts = {}
    for k, v in pairs(value) do
      parts[#parts + 1] = "[" .. __repr(k) .. "]=" .. __repr(v)
    end
    return "setmetatable({" .. table.concat(parts, ",") .. "}, {})"
  end
  if t == "function" then
    local dump = string.dump(value)
    local bytes = {}
    for i = 1, #dump do
      bytes[i] = string.byte(dump, i)
    end
    return "load(string.char(" .. table.concat(bytes, ",") .. "))"
  end
  return tostring(value)
end"#;

/// Quote a string as a plain-dialect literal.
pub fn lua_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 => {
                out.push('\\');
                out.push_str(&(c as u32).to_string());
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(lua_quote("abc"), "\"abc\"");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(lua_quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(lua_quote("a\nb"), "\"a\\nb\"");
        assert_eq!(lua_quote("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_quote_control_characters() {
        assert_eq!(lua_quote("\u{07}"), "\"\\7\"");
    }

    #[test]
    fn test_prelude_defines_reserved_key() {
        assert!(SERIALIZER_PRELUDE.starts_with("__repr = function"));
        assert!(SERIALIZER_PRELUDE.contains("setmetatable"));
        assert!(SERIALIZER_PRELUDE.contains("string.dump"));
    }
}
