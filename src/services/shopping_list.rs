//! Shopping list aggregation.
//!
//! Turns the recipes in a user's cart into one line per distinct
//! (ingredient name, measurement unit) pair with the amounts summed, and
//! renders the result as the plain-text document served for download.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::Queryable;

use crate::error::AppResult;

/// File name offered in the `Content-Disposition` header.
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

/// `Content-Disposition` value offering [`SHOPPING_LIST_FILENAME`] as an attachment.
pub const SHOPPING_LIST_DISPOSITION: &str = "attachment; filename=\"shopping_list.txt\"";

/// Header used when none is configured.
pub const DEFAULT_SHOPPING_LIST_HEADER: &str = "Shopping list:";

/// One ingredient occurrence inside a cart recipe.
#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A summed shopping list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Read access to cart membership and recipe composition.
#[async_trait]
pub trait ShoppingCartSource: Send + Sync {
    /// Ids of the recipes currently in `user_id`'s cart.
    async fn cart_recipe_ids(&self, user_id: i32) -> AppResult<Vec<i32>>;

    /// Every ingredient row attached to any of `recipe_ids`.
    async fn ingredient_rows(&self, recipe_ids: &[i32]) -> AppResult<Vec<CartIngredientRow>>;
}

/// Groups rows by (name, unit) and sums their amounts.
///
/// Output is ordered by name (byte-wise, case-sensitive), then by unit.
pub fn aggregate<I>(rows: I) -> Vec<AggregatedLine>
where
    I: IntoIterator<Item = CartIngredientRow>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| AggregatedLine {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

/// Renders the header, a blank line, then `"<name> (<unit>) - <amount>"` per line.
pub fn render(lines: &[AggregatedLine], header: &str) -> String {
    let body = lines
        .iter()
        .map(|line| format!("{} ({}) - {}", line.name, line.measurement_unit, line.amount))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n{}", header, body)
}

#[derive(Clone)]
pub struct ShoppingListService {
    source: Arc<dyn ShoppingCartSource>,
    header: String,
}

impl ShoppingListService {
    pub fn new(source: Arc<dyn ShoppingCartSource>, header: impl Into<String>) -> Self {
        Self {
            source,
            header: header.into(),
        }
    }

    /// Aggregated lines for everything in the user's cart.
    pub async fn generate(&self, user_id: i32) -> AppResult<Vec<AggregatedLine>> {
        let recipe_ids = self.source.cart_recipe_ids(user_id).await?;
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.source.ingredient_rows(&recipe_ids).await?;
        let lines = aggregate(rows);
        tracing::debug!(
            user_id,
            recipes = recipe_ids.len(),
            lines = lines.len(),
            "Shopping list aggregated"
        );
        Ok(lines)
    }

    /// The downloadable document for the user's cart.
    pub async fn render_for(&self, user_id: i32) -> AppResult<String> {
        let lines = self.generate(user_id).await?;
        Ok(render(&lines, &self.header))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Cart contents and recipe composition held in memory.
    #[derive(Default)]
    pub(crate) struct InMemoryCart {
        carts: Mutex<HashMap<i32, Vec<i32>>>,
        recipes: HashMap<i32, Vec<CartIngredientRow>>,
        pub(crate) ingredient_lookups: Mutex<usize>,
    }

    impl InMemoryCart {
        pub(crate) fn with_recipe(mut self, recipe_id: i32, items: &[(&str, &str, i32)]) -> Self {
            self.recipes.insert(recipe_id, items.iter().map(|i| row(i.0, i.1, i.2)).collect());
            self
        }

        pub(crate) fn add_to_cart(&self, user_id: i32, recipe_id: i32) {
            self.carts
                .lock()
                .unwrap()
                .entry(user_id)
                .or_default()
                .push(recipe_id);
        }

        pub(crate) fn remove_from_cart(&self, user_id: i32, recipe_id: i32) {
            if let Some(ids) = self.carts.lock().unwrap().get_mut(&user_id) {
                ids.retain(|id| *id != recipe_id);
            }
        }
    }

    #[async_trait]
    impl ShoppingCartSource for InMemoryCart {
        async fn cart_recipe_ids(&self, user_id: i32) -> AppResult<Vec<i32>> {
            Ok(self
                .carts
                .lock()
                .unwrap()
                .get(&user_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn ingredient_rows(&self, recipe_ids: &[i32]) -> AppResult<Vec<CartIngredientRow>> {
            *self.ingredient_lookups.lock().unwrap() += 1;
            Ok(recipe_ids
                .iter()
                .filter_map(|id| self.recipes.get(id))
                .flatten()
                .cloned()
                .collect())
        }
    }

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn line(name: &str, unit: &str, amount: i64) -> AggregatedLine {
        AggregatedLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn service(source: Arc<InMemoryCart>) -> ShoppingListService {
        ShoppingListService::new(source, DEFAULT_SHOPPING_LIST_HEADER)
    }

    #[test]
    fn test_disposition_names_the_file() {
        assert_eq!(
            SHOPPING_LIST_DISPOSITION,
            format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME)
        );
    }

    #[tokio::test]
    async fn test_empty_cart_renders_header_only() {
        let source = Arc::new(InMemoryCart::default().with_recipe(1, &[("Flour", "g", 100)]));
        let service = service(source.clone());

        assert!(service.generate(7).await.unwrap().is_empty());
        assert_eq!(service.render_for(7).await.unwrap(), "Shopping list:\n\n");
        assert_eq!(*source.ingredient_lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_ingredient_across_recipes_is_summed() {
        let source = Arc::new(
            InMemoryCart::default()
                .with_recipe(1, &[("Flour", "g", 200)])
                .with_recipe(2, &[("Flour", "g", 150)]),
        );
        source.add_to_cart(1, 1);
        source.add_to_cart(1, 2);

        let lines = service(source).generate(1).await.unwrap();
        assert_eq!(lines, vec![line("Flour", "g", 350)]);
    }

    #[tokio::test]
    async fn test_repeated_generation_is_identical() {
        let source = Arc::new(
            InMemoryCart::default()
                .with_recipe(1, &[("Milk", "ml", 300), ("Egg", "pcs", 2)])
                .with_recipe(2, &[("Egg", "pcs", 3)]),
        );
        source.add_to_cart(4, 1);
        source.add_to_cart(4, 2);
        let service = service(source);

        let first = service.render_for(4).await.unwrap();
        let second = service.render_for(4).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "Shopping list:\n\nEgg (pcs) - 5\nMilk (ml) - 300");
    }

    #[test]
    fn test_lines_are_sorted_by_name() {
        let lines = aggregate(vec![
            row("Sugar", "g", 1),
            row("Apple", "pcs", 1),
            row("Milk", "ml", 1),
        ]);
        let names: Vec<_> = lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Milk", "Sugar"]);
    }

    #[test]
    fn test_sorting_is_case_sensitive_and_ties_use_unit() {
        let lines = aggregate(vec![
            row("apple", "pcs", 1),
            row("Salt", "tsp", 1),
            row("Salt", "g", 5),
            row("Banana", "pcs", 2),
        ]);
        assert_eq!(
            lines,
            vec![
                line("Banana", "pcs", 2),
                line("Salt", "g", 5),
                line("Salt", "tsp", 1),
                line("apple", "pcs", 1),
            ]
        );
    }

    #[test]
    fn test_grouping_collapses_same_name_and_unit() {
        let lines = aggregate(vec![row("Salt", "g", 5), row("Salt", "g", 10)]);
        assert_eq!(lines, vec![line("Salt", "g", 15)]);
    }

    #[test]
    fn test_sum_does_not_overflow_i32() {
        let lines = aggregate(vec![row("Water", "ml", i32::MAX), row("Water", "ml", i32::MAX)]);
        assert_eq!(lines[0].amount, 2 * i64::from(i32::MAX));
    }

    #[tokio::test]
    async fn test_removing_recipe_drops_its_unique_ingredients() {
        let source = Arc::new(
            InMemoryCart::default()
                .with_recipe(1, &[("Flour", "g", 200), ("Yeast", "g", 7)])
                .with_recipe(2, &[("Flour", "g", 150)]),
        );
        source.add_to_cart(2, 1);
        source.add_to_cart(2, 2);
        let service = service(source.clone());

        assert_eq!(
            service.generate(2).await.unwrap(),
            vec![line("Flour", "g", 350), line("Yeast", "g", 7)]
        );

        source.remove_from_cart(2, 1);
        assert_eq!(service.generate(2).await.unwrap(), vec![line("Flour", "g", 150)]);
    }

    #[tokio::test]
    async fn test_custom_header() {
        let source = Arc::new(InMemoryCart::default().with_recipe(1, &[("Rice", "g", 80)]));
        source.add_to_cart(3, 1);
        let service = ShoppingListService::new(source, "Список покупок:");

        assert_eq!(
            service.render_for(3).await.unwrap(),
            "Список покупок:\n\nRice (g) - 80"
        );
    }

    fn arb_row() -> impl Strategy<Value = CartIngredientRow> {
        (
            prop::sample::select(vec!["Flour", "flour", "Salt", "Sugar", "Egg"]),
            prop::sample::select(vec!["g", "kg", "pcs"]),
            1..=i32::MAX,
        )
            .prop_map(|(name, unit, amount)| row(name, unit, amount))
    }

    proptest! {
        #[test]
        fn prop_aggregation_preserves_totals_and_order(rows in prop::collection::vec(arb_row(), 0..40)) {
            let lines = aggregate(rows.clone());

            let total_in: i64 = rows.iter().map(|r| i64::from(r.amount)).sum();
            let total_out: i64 = lines.iter().map(|l| l.amount).sum();
            prop_assert_eq!(total_in, total_out);

            for pair in lines.windows(2) {
                let a = (&pair[0].name, &pair[0].measurement_unit);
                let b = (&pair[1].name, &pair[1].measurement_unit);
                prop_assert!(a < b);
            }

            for l in &lines {
                let expected: i64 = rows
                    .iter()
                    .filter(|r| r.name == l.name && r.measurement_unit == l.measurement_unit)
                    .map(|r| i64::from(r.amount))
                    .sum();
                prop_assert_eq!(l.amount, expected);
            }
        }
    }
}
