//! Identifier checks for the table and column names taken from configuration.
//!
//! Values always travel as bound parameters; only identifiers are spliced
//! into statement text, so only identifiers need checking.

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validates that a string is a plain SQL identifier: ASCII letter or
/// underscore first, then letters, digits or underscores, and not a
/// reserved keyword.
pub fn validate_identifier(s: &str) -> Result<(), SqlSanitizeError> {
  let mut chars = s.chars();
  let Some(first) = chars.next() else {
    return Err(SqlSanitizeError::EmptyIdentifier);
  };

  if s.len() > MAX_IDENTIFIER_LENGTH {
    return Err(SqlSanitizeError::IdentifierTooLong(s.len()));
  }

  if !first.is_ascii_alphabetic() && first != '_' {
    return Err(SqlSanitizeError::InvalidIdentifierStart(first));
  }

  for c in chars {
    if !c.is_ascii_alphanumeric() && c != '_' {
      return Err(SqlSanitizeError::InvalidIdentifierChar(c));
    }
  }

  let upper = s.to_uppercase();
  if SQL_KEYWORDS.contains(&upper.as_str()) {
    return Err(SqlSanitizeError::ReservedKeyword(s.to_string()));
  }

  Ok(())
}

/// Validates and double-quotes an identifier for use in statement text.
pub fn quote_identifier(s: &str) -> Result<String, SqlSanitizeError> {
  validate_identifier(s)?;
  Ok(format!("\"{}\"", s))
}

/// SQL sanitization errors
#[derive(Debug, Clone, PartialEq)]
pub enum SqlSanitizeError {
  EmptyIdentifier,
  IdentifierTooLong(usize),
  InvalidIdentifierStart(char),
  InvalidIdentifierChar(char),
  ReservedKeyword(String),
}

impl std::fmt::Display for SqlSanitizeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::EmptyIdentifier => write!(f, "Identifier cannot be empty"),
      Self::IdentifierTooLong(len) => {
        write!(
          f,
          "Identifier too long: {} > {}",
          len, MAX_IDENTIFIER_LENGTH
        )
      }
      Self::InvalidIdentifierStart(c) => {
        write!(
          f,
          "Identifier must start with letter or underscore, got '{}'",
          c
        )
      }
      Self::InvalidIdentifierChar(c) => {
        write!(f, "Invalid character in identifier: '{}'", c)
      }
      Self::ReservedKeyword(s) => write!(f, "'{}' is a reserved SQL keyword", s),
    }
  }
}

impl std::error::Error for SqlSanitizeError {}

/// Common SQL keywords that cannot be used as identifiers
const SQL_KEYWORDS: &[&str] = &[
  "SELECT",
  "INSERT",
  "UPDATE",
  "DELETE",
  "DROP",
  "CREATE",
  "ALTER",
  "TABLE",
  "INDEX",
  "FROM",
  "WHERE",
  "AND",
  "OR",
  "NOT",
  "NULL",
  "TRUE",
  "FALSE",
  "ORDER",
  "BY",
  "LIMIT",
  "OFFSET",
  "JOIN",
  "ON",
  "AS",
  "IN",
  "IS",
  "UNION",
  "ALL",
  "GROUP",
  "HAVING",
  "INTO",
  "VALUES",
  "SET",
  "PRIMARY",
  "KEY",
  "DEFAULT",
  "TRIGGER",
  "VIEW",
  "SCHEMA",
  "GRANT",
  "COMMIT",
  "ROLLBACK",
  "BEGIN",
  "END",
  "TRANSACTION",
  "TRUNCATE",
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_identifier_valid() {
    assert!(validate_identifier("products").is_ok());
    assert!(validate_identifier("_private").is_ok());
    assert!(validate_identifier("caracteristicas_json").is_ok());
    assert!(validate_identifier("Products2").is_ok());
  }

  #[test]
  fn test_validate_identifier_invalid() {
    assert_eq!(
      validate_identifier(""),
      Err(SqlSanitizeError::EmptyIdentifier)
    );
    assert_eq!(
      validate_identifier("1start"),
      Err(SqlSanitizeError::InvalidIdentifierStart('1'))
    );
    assert!(validate_identifier("has space").is_err());
    assert!(validate_identifier("has-dash").is_err());
    assert!(validate_identifier("public.products").is_err());
    assert!(validate_identifier("products\"; DROP TABLE x; --").is_err());
  }

  #[test]
  fn test_validate_identifier_keyword_any_case() {
    assert!(validate_identifier("select").is_err());
    assert!(validate_identifier("Table").is_err());
  }

  #[test]
  fn test_validate_identifier_length() {
    let ok = "a".repeat(MAX_IDENTIFIER_LENGTH);
    let too_long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
    assert!(validate_identifier(&ok).is_ok());
    assert_eq!(
      validate_identifier(&too_long),
      Err(SqlSanitizeError::IdentifierTooLong(MAX_IDENTIFIER_LENGTH + 1))
    );
  }

  #[test]
  fn test_quote_identifier() {
    assert_eq!(quote_identifier("products").unwrap(), "\"products\"");
    assert!(quote_identifier("bad name").is_err());
  }
}
