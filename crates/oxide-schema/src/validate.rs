//! Syntax validation of generated SQL.
//!
//! Real validation belongs to a dialect-aware parser supplied by the
//! caller through [`SqlValidator`]. [`StructuralValidator`] is the
//! built-in fallback: it catches malformed output (unterminated
//! statements, unbalanced quotes or parentheses, unexpected statement
//! kinds) without understanding the grammar.

use crate::error::{Result, SchemaError};
use crate::generate::Migration;

/// Validates SQL for a named dialect.
pub trait SqlValidator: Send + Sync {
    /// Checks one statement; the error is the validator's message.
    fn validate(&self, dialect: &str, statement: &str) -> std::result::Result<(), String>;
}

/// Runs every statement of a migration through `validator`.
pub fn validate_migration(
    validator: &dyn SqlValidator,
    dialect: &str,
    migration: &Migration,
) -> Result<()> {
    for statement in &migration.statements {
        validator
            .validate(dialect, statement)
            .map_err(|message| SchemaError::SyntaxValidation {
                dialect: dialect.to_string(),
                message,
            })?;
    }
    Ok(())
}

/// Structural checks that hold for every dialect this crate emits.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

const STATEMENT_KEYWORDS: [&str; 4] = ["CREATE", "ALTER", "DROP", "INSERT"];

impl SqlValidator for StructuralValidator {
    fn validate(&self, _dialect: &str, statement: &str) -> std::result::Result<(), String> {
        let trimmed = statement.trim();
        let Some(body) = trimmed.strip_suffix(';') else {
            return Err(format!("statement is not terminated by ';': {trimmed}"));
        };

        let keyword = body.split_whitespace().next().unwrap_or_default();
        if !STATEMENT_KEYWORDS.contains(&keyword) {
            return Err(format!("unexpected statement kind '{keyword}'"));
        }

        let mut depth: usize = 0;
        let mut quote: Option<char> = None;
        for ch in body.chars() {
            match (quote, ch) {
                (Some(open), c) if c == open => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(ch),
                (None, '(') => depth += 1,
                (None, ')') => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| "unbalanced ')'".to_string())?;
                }
                (None, ';') => return Err("more than one statement".to_string()),
                (None, _) => {}
            }
        }

        if let Some(open) = quote {
            return Err(format!("unterminated {open} quote"));
        }
        if depth != 0 {
            return Err("unbalanced '('".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(sql: &str) -> std::result::Result<(), String> {
        StructuralValidator.validate("postgres", sql)
    }

    #[test]
    fn test_accepts_generated_shapes() {
        assert!(check("CREATE TABLE \"t\" (\n  \"id\" TEXT PRIMARY KEY\n);").is_ok());
        assert!(check("ALTER TABLE \"t\" ADD CONSTRAINT \"c\" CHECK (\"s\" IN ('a','it''s'));").is_ok());
        assert!(check("ALTER TABLE \"t\" ADD COLUMN \"at\" INTEGER DEFAULT (strftime('%s', 'now'));").is_ok());
        assert!(check("DROP TABLE IF EXISTS \"t\";").is_ok());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(check("DROP TABLE \"t\"").is_err());
        assert!(check("CREATE TABLE \"t\" (\"id\" TEXT;").is_err());
        assert!(check("CREATE TABLE \"t\" \"id\" TEXT);").is_err());
        assert!(check("ALTER TABLE \"t\" ALTER COLUMN \"c\" SET DEFAULT 'x;").is_err());
        assert!(check("SELECT 1;").is_err());
        assert!(check("DROP TABLE \"a\"; DROP TABLE \"b\";").is_err());
    }

    #[test]
    fn test_validate_migration_maps_errors() {
        let migration = Migration {
            statements: vec!["DROP TABLE \"t\";".to_string(), "oops".to_string()],
        };
        let err = validate_migration(&StructuralValidator, "sqlite", &migration).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::SyntaxValidation { ref dialect, .. } if dialect == "sqlite"
        ));
    }
}
