//! The root aggregate and its persisted subset.

use crate::model::{
    CartEntry, EntityId, ExpenseRecord, MealPlan, Product, Recipe, ShoppingList,
};
use crate::decode;
use serde::{Deserialize, Serialize};

/// Progress of the initial load
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPhase {
    /// Bootstrap has not been requested yet
    #[default]
    Idle,
    /// The seed is being resolved
    InFlight,
    /// The seed has been applied; propagation is allowed
    Completed,
}

/// Application state owned by the store
///
/// The seven collections form the persisted subset (see [`Snapshot`]); the
/// remaining fields are transient and never leave the process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Product catalog
    pub products: Vec<Product>,
    /// Shopping lists
    pub shopping_lists: Vec<ShoppingList>,
    /// Recipes
    pub recipes: Vec<Recipe>,
    /// Meal plans, at most one per date
    pub meal_plans: Vec<MealPlan>,
    /// Expense records
    pub expenses: Vec<ExpenseRecord>,
    /// Cart, at most one entry per product
    pub cart: Vec<CartEntry>,
    /// Favorite ids, no duplicates
    pub favorites: Vec<EntityId>,

    /// Whether the initial load is running
    pub loading: bool,
    /// Last user-visible error
    pub error: Option<String>,
    /// Progress of the initial load
    pub load_phase: LoadPhase,
    /// Set when a persisted collection changed while the load was in flight
    pub edited_during_load: bool,
}

impl AppState {
    /// Whether the initial load has completed and nothing is loading
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.load_phase, LoadPhase::Completed) && !self.loading
    }

    /// Copy out the persisted subset
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            products: self.products.clone(),
            shopping_lists: self.shopping_lists.clone(),
            recipes: self.recipes.clone(),
            meal_plans: self.meal_plans.clone(),
            expenses: self.expenses.clone(),
            cart: self.cart.clone(),
            favorites: self.favorites.clone(),
        }
    }

    /// Whether the persisted subset equals `snapshot`
    ///
    /// Compares in place, without cloning the collections.
    #[must_use]
    pub fn persisted_eq(&self, snapshot: &Snapshot) -> bool {
        self.products == snapshot.products
            && self.shopping_lists == snapshot.shopping_lists
            && self.recipes == snapshot.recipes
            && self.meal_plans == snapshot.meal_plans
            && self.expenses == snapshot.expenses
            && self.cart == snapshot.cart
            && self.favorites == snapshot.favorites
    }

    /// Replace every collection present in `partial`
    pub fn merge(&mut self, partial: PartialSnapshot) {
        let PartialSnapshot {
            products,
            shopping_lists,
            recipes,
            meal_plans,
            expenses,
            cart,
            favorites,
        } = partial;

        if let Some(products) = products {
            self.products = products;
        }
        if let Some(shopping_lists) = shopping_lists {
            self.shopping_lists = shopping_lists;
        }
        if let Some(recipes) = recipes {
            self.recipes = recipes;
        }
        if let Some(meal_plans) = meal_plans {
            self.meal_plans = meal_plans;
        }
        if let Some(expenses) = expenses {
            self.expenses = expenses;
        }
        if let Some(cart) = cart {
            self.cart = cart;
        }
        if let Some(favorites) = favorites {
            self.favorites = favorites;
        }
    }
}

/// The persisted subset of [`AppState`]
///
/// This is the exact JSON shape written to the local cache and sent to the
/// remote user-data resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Product catalog
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub products: Vec<Product>,
    /// Shopping lists
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub shopping_lists: Vec<ShoppingList>,
    /// Recipes
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub recipes: Vec<Recipe>,
    /// Meal plans
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub meal_plans: Vec<MealPlan>,
    /// Expense records
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub expenses: Vec<ExpenseRecord>,
    /// Cart entries
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub cart: Vec<CartEntry>,
    /// Favorite ids
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub favorites: Vec<EntityId>,
}

impl From<Snapshot> for PartialSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            products: Some(snapshot.products),
            shopping_lists: Some(snapshot.shopping_lists),
            recipes: Some(snapshot.recipes),
            meal_plans: Some(snapshot.meal_plans),
            expenses: Some(snapshot.expenses),
            cart: Some(snapshot.cart),
            favorites: Some(snapshot.favorites),
        }
    }
}

/// A snapshot where every collection is optional
///
/// Absent collections leave the state's collection untouched when merged.
/// Collections decode record by record: a record that does not fit is
/// skipped, the rest of the collection is kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSnapshot {
    /// Product catalog
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub products: Option<Vec<Product>>,
    /// Shopping lists
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub shopping_lists: Option<Vec<ShoppingList>>,
    /// Recipes
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub recipes: Option<Vec<Recipe>>,
    /// Meal plans
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub meal_plans: Option<Vec<MealPlan>>,
    /// Expense records
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub expenses: Option<Vec<ExpenseRecord>>,
    /// Cart entries
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub cart: Option<Vec<CartEntry>>,
    /// Favorite ids
    #[serde(
        default,
        deserialize_with = "decode::elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub favorites: Option<Vec<EntityId>>,
}

impl PartialSnapshot {
    /// Whether no collection is present
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.products.is_none()
            && self.shopping_lists.is_none()
            && self.recipes.is_none()
            && self.meal_plans.is_none()
            && self.expenses.is_none()
            && self.cart.is_none()
            && self.favorites.is_none()
    }

    /// Only products
    #[must_use]
    pub fn products(products: Vec<Product>) -> Self {
        Self {
            products: Some(products),
            ..Self::default()
        }
    }

    /// Only shopping lists
    #[must_use]
    pub fn shopping_lists(lists: Vec<ShoppingList>) -> Self {
        Self {
            shopping_lists: Some(lists),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_only_present_collections() {
        let mut state = AppState {
            products: vec![Product::new("old", "Old")],
            recipes: vec![Recipe::new("r1", "Soup")],
            ..AppState::default()
        };

        state.merge(PartialSnapshot::products(vec![Product::new("new", "New")]));

        assert_eq!(state.products.len(), 1);
        assert_eq!(state.products[0].id.as_str(), "new");
        assert_eq!(state.recipes.len(), 1);
    }

    #[test]
    fn snapshot_excludes_transient_fields() {
        let state = AppState {
            loading: true,
            error: Some("boom".into()),
            favorites: vec!["p1".into()],
            ..AppState::default()
        };

        let json = serde_json::to_value(state.snapshot()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();

        assert_eq!(keys.len(), 7);
        assert!(keys.contains(&"shoppingLists"));
        assert!(keys.contains(&"mealPlans"));
        assert!(!keys.contains(&"loading"));
        assert!(!keys.contains(&"error"));
    }

    #[test]
    fn persisted_eq_ignores_flags() {
        let state = AppState {
            products: vec![Product::new("p1", "Rice")],
            ..AppState::default()
        };
        let snapshot = state.snapshot();
        let flagged = AppState {
            loading: true,
            error: Some("x".into()),
            ..state
        };

        assert!(flagged.persisted_eq(&snapshot));
    }

    #[test]
    fn partial_snapshot_tolerates_unknown_and_missing_keys() {
        let partial: PartialSnapshot =
            serde_json::from_str(r#"{"products":[],"theme":"dark"}"#).unwrap();

        assert_eq!(partial.products, Some(vec![]));
        assert!(partial.recipes.is_none());
        assert!(!partial.is_empty());
        assert!(PartialSnapshot::default().is_empty());
    }

    #[test]
    fn full_snapshot_round_trips_through_partial() {
        let snapshot = Snapshot {
            cart: vec![CartEntry::new("p1", 2)],
            ..Snapshot::default()
        };
        let mut state = AppState::default();
        state.merge(snapshot.clone().into());

        assert!(state.persisted_eq(&snapshot));
    }
}
