use regex::Regex;
use std::sync::OnceLock;

/// Maps PostgreSQL constraint violations onto `(entity, field)` pairs.
///
/// Constraint names created by the migrations are resolved through a static
/// table first. Anything else falls back to the `Key (field)=(value)` and
/// `column "..."` fragments of the server message.
pub struct ConstraintParser;

/// Constraint names declared in `migrations/`, mapped to entity and field.
const KNOWN_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("users_email_key", "user", "email"),
    ("users_username_key", "user", "username"),
    ("recipes_author_id_fkey", "recipe", "author_id"),
    ("recipes_cooking_time_check", "recipe", "cooking_time"),
    (
        "recipe_ingredients_recipe_id_ingredient_id_key",
        "recipe_ingredient",
        "ingredient_id",
    ),
    (
        "recipe_ingredients_ingredient_id_fkey",
        "recipe_ingredient",
        "ingredient_id",
    ),
    ("recipe_ingredients_recipe_id_fkey", "recipe_ingredient", "recipe_id"),
    ("recipe_ingredients_amount_check", "recipe_ingredient", "amount"),
    ("favorites_user_id_recipe_id_key", "favorite", "recipe_id"),
    ("favorites_recipe_id_fkey", "favorite", "recipe_id"),
    ("shopping_carts_user_id_recipe_id_key", "shopping_cart", "recipe_id"),
    ("shopping_carts_recipe_id_fkey", "shopping_cart", "recipe_id"),
    ("subscriptions_user_id_author_id_key", "subscription", "author_id"),
    ("subscriptions_author_id_fkey", "subscription", "author_id"),
    ("subscriptions_no_self_check", "subscription", "author_id"),
];

struct Patterns {
    key_value: Regex,
    column: Regex,
    table: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").expect("valid key/value pattern"),
        column: Regex::new(r#"column "([^"]+)""#).expect("valid column pattern"),
        table: Regex::new(r#"(?:table|relation) "([^"]+)""#).expect("valid table pattern"),
    })
}

impl ConstraintParser {
    /// Looks up a constraint declared by the schema migrations.
    pub fn known_constraint(constraint_name: &str) -> Option<(String, String)> {
        KNOWN_CONSTRAINTS
            .iter()
            .find(|(name, _, _)| *name == constraint_name)
            .map(|(_, entity, field)| (entity.to_string(), field.to_string()))
    }

    /// Parses a unique violation into `(entity, field, value)`.
    pub fn parse_unique_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let key_value = Self::extract_key_value(message);

        if let Some((entity, field)) = constraint_name.and_then(Self::known_constraint) {
            let value = key_value
                .map(|(_, value)| value)
                .unwrap_or_else(|| "duplicate_value".to_string());
            return Some((entity, field, value));
        }

        let (field, value) = key_value?;
        // Composite keys arrive as "user_id, recipe_id"; report the last column
        let field = field
            .rsplit(',')
            .next()
            .map(|f| f.trim().to_string())
            .unwrap_or(field);
        let value = value
            .rsplit(',')
            .next()
            .map(|v| v.trim().to_string())
            .unwrap_or(value);
        let entity = Self::extract_table(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Parses a foreign key violation into `(entity, field, referenced value)`.
    pub fn parse_foreign_key_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let key_value = Self::extract_key_value(message);

        if let Some((entity, field)) = constraint_name.and_then(Self::known_constraint) {
            let value = key_value
                .map(|(_, value)| value)
                .unwrap_or_else(|| "unknown".to_string());
            return Some((entity, field, value));
        }

        let (field, value) = key_value?;
        let entity = Self::extract_table(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Parses a not-null violation into `(entity, field)`.
    pub fn parse_not_null_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        let field = patterns()
            .column
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())?;
        let entity = Self::extract_table(message)
            .or_else(|| constraint_name.and_then(Self::known_constraint).map(|(e, _)| e))
            .unwrap_or_else(|| "resource".to_string());
        Some((entity, field))
    }

    /// Parses a check violation into `(entity, field)`.
    pub fn parse_check_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        if let Some(known) = constraint_name.and_then(Self::known_constraint) {
            return Some(known);
        }

        // Unknown checks follow the "<table>_<column>_check" convention
        let name = constraint_name?.strip_suffix("_check")?;
        let entity = Self::extract_table(message)?;
        let field = name
            .strip_prefix(&format!("{}_", entity))
            .unwrap_or(name)
            .to_string();
        Some((entity, field))
    }

    fn extract_key_value(message: &str) -> Option<(String, String)> {
        patterns().key_value.captures(message).and_then(|caps| {
            let field = caps.get(1)?.as_str().to_string();
            let value = caps.get(2)?.as_str().to_string();
            Some((field, value))
        })
    }

    fn extract_table(message: &str) -> Option<String> {
        patterns()
            .table
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}
