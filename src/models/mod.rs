mod ingredient;
mod recipe;
mod relation;
mod user;

pub use ingredient::Ingredient;
pub use recipe::{
    NewRecipe, NewRecipeIngredient, Recipe, RecipeChanges, RecipeIngredientLine,
};
pub use relation::{RelationAction, RelationKind};
pub use user::{NewUser, User};
