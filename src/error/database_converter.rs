use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

use crate::error::{AppError, ConstraintParser};

/// Turns Diesel errors into structured [`AppError`] variants.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error, using `operation` as context for errors that
    /// cannot be mapped onto a constraint.
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info.as_ref(), operation)
            }
            DieselError::NotFound => AppError::not_found("resource", "id", "unknown"),
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        info: &(dyn DatabaseErrorInformation + Send + Sync),
        operation: &str,
    ) -> AppError {
        let message = info.message();
        let constraint_name = info.constraint_name();

        let converted = match kind {
            DatabaseErrorKind::UniqueViolation => {
                ConstraintParser::parse_unique_violation(message, constraint_name).map(
                    |(entity, field, value)| AppError::Duplicate {
                        entity,
                        field,
                        value,
                    },
                )
            }
            DatabaseErrorKind::ForeignKeyViolation => {
                ConstraintParser::parse_foreign_key_violation(message, constraint_name).map(
                    |(entity, field, value)| {
                        AppError::validation(
                            field,
                            format!("Invalid reference from {} with value '{}'", entity, value),
                        )
                    },
                )
            }
            DatabaseErrorKind::NotNullViolation => {
                ConstraintParser::parse_not_null_violation(message, constraint_name).map(
                    |(entity, field)| {
                        AppError::validation(field, format!("Field is required for {}", entity))
                    },
                )
            }
            DatabaseErrorKind::CheckViolation => {
                ConstraintParser::parse_check_violation(message, constraint_name).map(
                    |(entity, field)| {
                        AppError::validation(
                            field,
                            format!("Check constraint failed for {} field", entity),
                        )
                    },
                )
            }
            _ => None,
        };

        converted.unwrap_or_else(|| AppError::Database {
            operation: operation.to_string(),
            source: anyhow::anyhow!("{:?}: {}", kind, message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeErrorInfo {
        message: String,
        constraint_name: Option<String>,
    }

    impl FakeErrorInfo {
        fn boxed(message: &str, constraint_name: Option<&str>) -> Box<Self> {
            Box::new(Self {
                message: message.to_string(),
                constraint_name: constraint_name.map(str::to_string),
            })
        }
    }

    impl DatabaseErrorInformation for FakeErrorInfo {
        fn message(&self) -> &str {
            &self.message
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            None
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint_name.as_deref()
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[test]
    fn test_not_found() {
        let result = DatabaseErrorConverter::convert_diesel_error(DieselError::NotFound, "find");
        assert!(matches!(result, AppError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_username() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            FakeErrorInfo::boxed(
                "duplicate key value violates unique constraint \"users_username_key\"\n\
                 DETAIL: Key (username)=(chef) already exists.",
                Some("users_username_key"),
            ),
        );

        match DatabaseErrorConverter::convert_diesel_error(error, "insert user") {
            AppError::Duplicate {
                entity,
                field,
                value,
            } => {
                assert_eq!(entity, "user");
                assert_eq!(field, "username");
                assert_eq!(value, "chef");
            }
            other => panic!("Expected Duplicate error, got: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_cart_entry() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            FakeErrorInfo::boxed(
                "duplicate key value violates unique constraint \
                 \"shopping_carts_user_id_recipe_id_key\"\n\
                 DETAIL: Key (user_id, recipe_id)=(3, 9) already exists.",
                Some("shopping_carts_user_id_recipe_id_key"),
            ),
        );

        match DatabaseErrorConverter::convert_diesel_error(error, "insert cart entry") {
            AppError::Duplicate { entity, field, .. } => {
                assert_eq!(entity, "shopping_cart");
                assert_eq!(field, "recipe_id");
            }
            other => panic!("Expected Duplicate error, got: {:?}", other),
        }
    }

    #[test]
    fn test_missing_ingredient_reference() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            FakeErrorInfo::boxed(
                "insert or update on table \"recipe_ingredients\" violates foreign key \
                 constraint \"recipe_ingredients_ingredient_id_fkey\"\n\
                 DETAIL: Key (ingredient_id)=(404) is not present in table \"ingredients\".",
                Some("recipe_ingredients_ingredient_id_fkey"),
            ),
        );

        match DatabaseErrorConverter::convert_diesel_error(error, "insert recipe") {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "ingredient_id");
                assert!(reason.contains("404"));
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_amount_check_violation() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::CheckViolation,
            FakeErrorInfo::boxed(
                "new row for relation \"recipe_ingredients\" violates check constraint \
                 \"recipe_ingredients_amount_check\"",
                Some("recipe_ingredients_amount_check"),
            ),
        );

        match DatabaseErrorConverter::convert_diesel_error(error, "insert recipe") {
            AppError::Validation { field, .. } => assert_eq!(field, "amount"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_error_keeps_operation() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            FakeErrorInfo::boxed("could not serialize access", None),
        );

        match DatabaseErrorConverter::convert_diesel_error(error, "update recipe") {
            AppError::Database { operation, .. } => assert_eq!(operation, "update recipe"),
            other => panic!("Expected Database error, got: {:?}", other),
        }
    }
}
