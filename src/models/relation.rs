use std::fmt;

/// The three user-to-target links that share one add/remove flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// user → recipe, table `favorites`
    Favorite,
    /// user → recipe, table `shopping_carts`
    ShoppingCart,
    /// user → author, table `subscriptions`
    Subscription,
}

impl RelationKind {
    /// Whether the target of this relation is a recipe (otherwise a user).
    pub fn targets_recipe(self) -> bool {
        !matches!(self, RelationKind::Subscription)
    }

    /// Entity name used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorite",
            RelationKind::ShoppingCart => "shopping_cart",
            RelationKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping cart",
            RelationKind::Subscription => "subscriptions",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationAction {
    Add,
    Remove,
}
