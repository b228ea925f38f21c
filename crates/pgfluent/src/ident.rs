//! Safe SQL identifier handling.
//!
//! [`Ident`] represents a table or column name. Every identifier is rendered
//! double-quoted, so reserved words (`"order"`, `"user"`) and mixed-case
//! names round-trip unchanged.
//!
//! - Unquoted input parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted input parts allow any characters except NUL and escape `"` as `""`
//!
//! # Example
//! ```ignore
//! use pgfluent::Ident;
//!
//! assert_eq!(Ident::parse("invoices")?.to_sql(), r#""invoices""#);
//! assert_eq!(Ident::parse("public.invoices")?.to_sql(), r#""public"."invoices""#);
//! # Ok::<(), pgfluent::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// A SQL identifier, possibly dotted (`schema.table`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Wrap a single raw name (e.g. a JSON payload key) without parsing dots or quotes.
    pub fn quoted(name: &str) -> OrmResult<Self> {
        if name.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if name.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        Ok(Self {
            parts: vec![name.to_string()],
        })
    }

    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable"`
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::validation("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::validation(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let valid = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !valid {
                    return Err(OrmError::validation(format!(
                        "Invalid character in identifier '{s}': '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty identifier segment"));
            }
            parts.push(name);
        }

        if parts.is_empty() {
            return Err(OrmError::validation("Empty identifier"));
        }

        Ok(Self { parts })
    }

    /// The last segment, unquoted (the bare column or table name).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.parts.iter().map(|p| p.len() + 3).sum());
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push('"');
            for ch in part.chars() {
                if ch == '"' {
                    out.push_str("\"\"");
                } else {
                    out.push(ch);
                }
            }
            out.push('"');
        }
    }
}

/// Render a projection list (`"*"`, `"id, name"`, `"id, \"Total\""`) as SQL.
///
/// Only `*` and plain identifiers are accepted; expressions are rejected.
pub(crate) fn projection_sql(columns: &str) -> OrmResult<String> {
    let items = split_projection(columns)?;
    let mut rendered = Vec::with_capacity(items.len());
    for item in items {
        if item == "*" {
            rendered.push("*".to_string());
        } else {
            rendered.push(Ident::parse(item)?.to_sql());
        }
    }
    Ok(rendered.join(", "))
}

/// Split a projection on commas that sit outside double quotes.
pub(crate) fn split_projection(columns: &str) -> OrmResult<Vec<&str>> {
    let mut items = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, ch) in columns.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                items.push(columns[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(OrmError::validation("Unclosed quoted identifier in projection"));
    }
    items.push(columns[start..].trim());

    if items.iter().any(|s| s.is_empty()) {
        return Err(OrmError::validation(format!(
            "Empty column in projection '{columns}'"
        )));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple_is_quoted() {
        let ident = Ident::parse("users").unwrap();
        assert_eq!(ident.to_sql(), r#""users""#);
    }

    #[test]
    fn ident_dotted() {
        let ident = Ident::parse("public.users").unwrap();
        assert_eq!(ident.to_sql(), r#""public"."users""#);
        assert_eq!(ident.name(), "users");
    }

    #[test]
    fn ident_quoted_with_escape() {
        let ident = Ident::parse(r#""has""quote""#).unwrap();
        assert_eq!(ident.to_sql(), r#""has""quote""#);
    }

    #[test]
    fn ident_raw_payload_key_keeps_spaces() {
        let ident = Ident::quoted("first name").unwrap();
        assert_eq!(ident.to_sql(), r#""first name""#);
    }

    #[test]
    fn ident_rejects_injection() {
        assert!(Ident::parse("id; DROP TABLE users").is_err());
        assert!(Ident::parse("1table").is_err());
        assert!(Ident::parse("schema..table").is_err());
        assert!(Ident::parse("schema.").is_err());
        assert!(Ident::parse(r#""unclosed"#).is_err());
        assert!(Ident::parse("").is_err());
    }

    #[test]
    fn projection_star_and_list() {
        assert_eq!(projection_sql("*").unwrap(), "*");
        assert_eq!(
            projection_sql("id, name ,total").unwrap(),
            r#""id", "name", "total""#
        );
        assert_eq!(
            projection_sql(r#"id, "Weird, Name""#).unwrap(),
            r#""id", "Weird, Name""#
        );
    }

    #[test]
    fn projection_rejects_expressions() {
        assert!(projection_sql("count(*)").is_err());
        assert!(projection_sql("id,").is_err());
    }
}
