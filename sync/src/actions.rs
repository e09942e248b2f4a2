//! Every mutation a collaborator can request, plus the internal load actions.

use crate::model::{
    EntityId, ExpenseRecord, MealPlan, Product, Recipe, ShoppingItem, ShoppingList,
};
use crate::state::PartialSnapshot;
use serde::{Deserialize, Serialize};

/// Where the startup seed came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    /// The remote user-data resource answered with data
    Remote,
    /// The remote was unavailable; the local cache was used
    LocalCache,
    /// Neither source had data
    Empty,
}

impl SeedSource {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::LocalCache => "local_cache",
            Self::Empty => "empty",
        }
    }

    /// Whether a seed from this source clears a previous error
    #[must_use]
    pub const fn clears_error(self) -> bool {
        matches!(self, Self::Remote)
    }
}

impl std::fmt::Display for SeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving the startup seed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome {
    /// The seed to merge, if any source had data
    pub seed: Option<PartialSnapshot>,
    /// Which source produced the seed
    pub source: SeedSource,
}

impl LoadOutcome {
    /// Seed fetched from the remote
    #[must_use]
    pub const fn remote(seed: PartialSnapshot) -> Self {
        Self {
            seed: Some(seed),
            source: SeedSource::Remote,
        }
    }

    /// Seed read from the local cache
    #[must_use]
    pub const fn local_cache(seed: PartialSnapshot) -> Self {
        Self {
            seed: Some(seed),
            source: SeedSource::LocalCache,
        }
    }

    /// No seed available
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            seed: None,
            source: SeedSource::Empty,
        }
    }
}

/// Actions accepted by [`AppReducer`](crate::reducer::AppReducer)
///
/// Domain actions never fail: unknown ids are silently ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppAction {
    // ========== Products ==========
    /// Append a product
    AddProduct(Product),
    /// Replace the product with the same id
    UpdateProduct(Product),
    /// Remove a product
    DeleteProduct(EntityId),

    // ========== Recipes ==========
    /// Append a recipe
    AddRecipe(Recipe),
    /// Replace the recipe with the same id
    UpdateRecipe(Recipe),
    /// Remove a recipe
    DeleteRecipe(EntityId),

    // ========== Shopping lists ==========
    /// Append a shopping list
    AddShoppingList(ShoppingList),
    /// Replace the list with the same id
    UpdateShoppingList(ShoppingList),
    /// Remove a list and its items
    DeleteShoppingList(EntityId),

    /// Append an item to a list
    AddShoppingItem {
        /// Parent list
        list_id: EntityId,
        /// Item to append
        item: ShoppingItem,
    },
    /// Replace the item with the same id inside a list
    UpdateShoppingItem {
        /// Parent list
        list_id: EntityId,
        /// Replacement item
        item: ShoppingItem,
    },
    /// Remove an item from a list
    DeleteShoppingItem {
        /// Parent list
        list_id: EntityId,
        /// Item to remove
        item_id: EntityId,
    },

    // ========== Meal plans ==========
    /// Plan meals for a day, replacing any plan already on that date
    AddMealPlan(MealPlan),
    /// Replace the plan with the same id
    UpdateMealPlan(MealPlan),
    /// Remove a plan
    DeleteMealPlan(EntityId),

    // ========== Expenses ==========
    /// Record an expense
    AddExpense(ExpenseRecord),
    /// Replace the expense with the same id
    UpdateExpense(ExpenseRecord),
    /// Remove an expense
    DeleteExpense(EntityId),

    // ========== Cart ==========
    /// Add units of a product, summing into an existing entry
    AddToCart {
        /// Product to add
        product_id: EntityId,
        /// Units to add
        quantity: u32,
    },
    /// Set the units of a product already in the cart (`0` removes it)
    UpdateCartQuantity {
        /// Product in the cart
        product_id: EntityId,
        /// New unit count
        quantity: u32,
    },
    /// Remove a product from the cart
    RemoveFromCart {
        /// Product to remove
        product_id: EntityId,
    },
    /// Empty the cart
    ClearCart,

    // ========== Favorites ==========
    /// Add the id to favorites, or remove it if already present
    ToggleFavorite {
        /// Id to toggle
        id: EntityId,
    },

    // ========== Bulk & flags ==========
    /// Replace every collection present in the payload
    LoadData(PartialSnapshot),
    /// Set the loading flag
    SetLoading(bool),
    /// Set or clear the error message
    SetError(Option<String>),

    // ========== Load orchestration ==========
    /// Resolve the startup seed (runs once per store)
    Bootstrap,
    /// The startup seed has been resolved
    SeedResolved(LoadOutcome),
}

impl AppAction {
    /// Stable name used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AddProduct(_) => "ADD_PRODUCT",
            Self::UpdateProduct(_) => "UPDATE_PRODUCT",
            Self::DeleteProduct(_) => "DELETE_PRODUCT",
            Self::AddRecipe(_) => "ADD_RECIPE",
            Self::UpdateRecipe(_) => "UPDATE_RECIPE",
            Self::DeleteRecipe(_) => "DELETE_RECIPE",
            Self::AddShoppingList(_) => "ADD_SHOPPING_LIST",
            Self::UpdateShoppingList(_) => "UPDATE_SHOPPING_LIST",
            Self::DeleteShoppingList(_) => "DELETE_SHOPPING_LIST",
            Self::AddShoppingItem { .. } => "ADD_SHOPPING_ITEM",
            Self::UpdateShoppingItem { .. } => "UPDATE_SHOPPING_ITEM",
            Self::DeleteShoppingItem { .. } => "DELETE_SHOPPING_ITEM",
            Self::AddMealPlan(_) => "ADD_MEAL_PLAN",
            Self::UpdateMealPlan(_) => "UPDATE_MEAL_PLAN",
            Self::DeleteMealPlan(_) => "DELETE_MEAL_PLAN",
            Self::AddExpense(_) => "ADD_EXPENSE",
            Self::UpdateExpense(_) => "UPDATE_EXPENSE",
            Self::DeleteExpense(_) => "DELETE_EXPENSE",
            Self::AddToCart { .. } => "ADD_TO_CART",
            Self::UpdateCartQuantity { .. } => "UPDATE_CART_QUANTITY",
            Self::RemoveFromCart { .. } => "REMOVE_FROM_CART",
            Self::ClearCart => "CLEAR_CART",
            Self::ToggleFavorite { .. } => "TOGGLE_FAVORITE",
            Self::LoadData(_) => "LOAD_DATA",
            Self::SetLoading(_) => "SET_LOADING",
            Self::SetError(_) => "SET_ERROR",
            Self::Bootstrap => "BOOTSTRAP",
            Self::SeedResolved(_) => "SEED_RESOLVED",
        }
    }

    /// Whether the action can change the persisted subset
    #[must_use]
    pub const fn touches_persisted(&self) -> bool {
        !matches!(
            self,
            Self::SetLoading(_) | Self::SetError(_) | Self::Bootstrap | Self::SeedResolved(_)
        )
    }
}
