use diesel::prelude::*;
use jiff_diesel::Timestamp;

#[derive(Debug, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub cooking_time: i32,
    pub pub_date: Timestamp,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipe {
    pub author_id: i32,
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub cooking_time: i32,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, AsChangeset, Clone, Default)]
#[diesel(table_name = crate::schema::recipes)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub cooking_time: Option<i32>,
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.description.is_none()
            && self.cooking_time.is_none()
    }
}

#[derive(Debug, Insertable, Clone, Copy, PartialEq, Eq)]
#[diesel(table_name = crate::schema::recipe_ingredients)]
pub struct NewRecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub amount: i32,
}

/// One ingredient of a recipe joined with its catalogue entry.
#[derive(Debug, Queryable, Clone, PartialEq, Eq)]
pub struct RecipeIngredientLine {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}
