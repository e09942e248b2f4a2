//! State Reducer
//!
//! Pure transitions over [`AppState`]. The reducer never rejects an action and
//! never panics: updates and deletes for unknown ids leave the state untouched.
//!
//! Every action returns no effects except [`AppAction::Bootstrap`], which
//! returns the future that resolves the startup seed.

use crate::actions::{AppAction, LoadOutcome};
use crate::environment::AppEnvironment;
use crate::model::{CartEntry, EntityId, Identified, MealPlan, ShoppingList};
use crate::state::{AppState, LoadPhase};
use pantry_core::effect::Effect;
use pantry_core::reducer::Reducer;
use pantry_core::{SmallVec, smallvec};

/// Reducer for the whole application state
#[derive(Clone, Copy, Debug, Default)]
pub struct AppReducer;

impl AppReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn bootstrap(state: &mut AppState, env: &AppEnvironment) -> SmallVec<[Effect<AppAction>; 4]> {
        if state.load_phase != LoadPhase::Idle {
            tracing::debug!(phase = ?state.load_phase, "Ignoring repeated bootstrap");
            return SmallVec::new();
        }

        state.loading = true;
        state.load_phase = LoadPhase::InFlight;

        let orchestrator = env.orchestrator();
        smallvec![Effect::future(async move {
            Some(AppAction::SeedResolved(orchestrator.resolve_seed().await))
        })]
    }

    fn seed_resolved(state: &mut AppState, outcome: LoadOutcome) {
        let LoadOutcome { seed, source } = outcome;

        if let Some(seed) = seed {
            state.merge(seed);
        }
        if source.clears_error() {
            state.error = None;
        }

        state.loading = false;
        state.load_phase = LoadPhase::Completed;
        tracing::debug!(%source, "Initial load completed");
    }

    /// Apply a domain action; flags and orchestration are handled by the caller
    #[allow(clippy::too_many_lines)] // One arm per action
    fn apply(state: &mut AppState, action: AppAction) {
        match action {
            // Products
            AppAction::AddProduct(product) => state.products.push(product),
            AppAction::UpdateProduct(product) => replace_by_id(&mut state.products, product),
            AppAction::DeleteProduct(id) => remove_by_id(&mut state.products, &id),

            // Recipes
            AppAction::AddRecipe(recipe) => state.recipes.push(recipe),
            AppAction::UpdateRecipe(recipe) => replace_by_id(&mut state.recipes, recipe),
            AppAction::DeleteRecipe(id) => remove_by_id(&mut state.recipes, &id),

            // Shopping lists
            AppAction::AddShoppingList(mut list) => {
                list.sync_completion();
                state.shopping_lists.push(list);
            },
            AppAction::UpdateShoppingList(mut list) => {
                list.sync_completion();
                replace_by_id(&mut state.shopping_lists, list);
            },
            AppAction::DeleteShoppingList(id) => remove_by_id(&mut state.shopping_lists, &id),

            AppAction::AddShoppingItem { list_id, item } => {
                with_list(&mut state.shopping_lists, &list_id, |list| list.items.push(item));
            },
            AppAction::UpdateShoppingItem { list_id, item } => {
                with_list(&mut state.shopping_lists, &list_id, |list| {
                    replace_by_id(&mut list.items, item);
                });
            },
            AppAction::DeleteShoppingItem { list_id, item_id } => {
                with_list(&mut state.shopping_lists, &list_id, |list| {
                    remove_by_id(&mut list.items, &item_id);
                });
            },

            // Meal plans
            AppAction::AddMealPlan(plan) => add_meal_plan(&mut state.meal_plans, plan),
            AppAction::UpdateMealPlan(plan) => update_meal_plan(&mut state.meal_plans, plan),
            AppAction::DeleteMealPlan(id) => remove_by_id(&mut state.meal_plans, &id),

            // Expenses
            AppAction::AddExpense(expense) => state.expenses.push(expense),
            AppAction::UpdateExpense(expense) => replace_by_id(&mut state.expenses, expense),
            AppAction::DeleteExpense(id) => remove_by_id(&mut state.expenses, &id),

            // Cart
            AppAction::AddToCart {
                product_id,
                quantity,
            } => add_to_cart(&mut state.cart, product_id, quantity),
            AppAction::UpdateCartQuantity {
                product_id,
                quantity,
            } => {
                if quantity == 0 {
                    state.cart.retain(|entry| entry.product_id != product_id);
                } else if let Some(entry) =
                    state.cart.iter_mut().find(|entry| entry.product_id == product_id)
                {
                    entry.quantity = quantity;
                }
            },
            AppAction::RemoveFromCart { product_id } => {
                state.cart.retain(|entry| entry.product_id != product_id);
            },
            AppAction::ClearCart => state.cart.clear(),

            // Favorites
            AppAction::ToggleFavorite { id } => {
                if state.favorites.contains(&id) {
                    state.favorites.retain(|favorite| *favorite != id);
                } else {
                    state.favorites.push(id);
                }
            },

            // Bulk & flags
            AppAction::LoadData(partial) => state.merge(partial),
            AppAction::SetLoading(loading) => state.loading = loading,
            AppAction::SetError(error) => state.error = error,

            AppAction::Bootstrap | AppAction::SeedResolved(_) => {},
        }
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        tracing::trace!(action = action.kind(), "Reducing");

        match action {
            AppAction::Bootstrap => Self::bootstrap(state, env),
            AppAction::SeedResolved(outcome) => {
                Self::seed_resolved(state, outcome);
                SmallVec::new()
            },
            action => {
                if state.load_phase == LoadPhase::InFlight && action.touches_persisted() {
                    state.edited_during_load = true;
                }
                Self::apply(state, action);
                SmallVec::new()
            },
        }
    }
}

/// Replace the first element with the same id as `item`
fn replace_by_id<T: Identified>(items: &mut [T], item: T) {
    if let Some(slot) = items.iter_mut().find(|existing| existing.id() == item.id()) {
        *slot = item;
    }
}

/// Remove every element with id `id`
fn remove_by_id<T: Identified>(items: &mut Vec<T>, id: &EntityId) {
    items.retain(|item| item.id() != id);
}

/// Run `f` on the list with id `list_id`, then re-derive its completion flag
fn with_list<F>(lists: &mut [ShoppingList], list_id: &EntityId, f: F)
where
    F: FnOnce(&mut ShoppingList),
{
    if let Some(list) = lists.iter_mut().find(|list| &list.id == list_id) {
        f(list);
        list.sync_completion();
    }
}

fn add_meal_plan(plans: &mut Vec<MealPlan>, plan: MealPlan) {
    match plans.iter_mut().find(|existing| existing.date == plan.date) {
        Some(slot) => *slot = plan,
        None => plans.push(plan),
    }
}

fn update_meal_plan(plans: &mut Vec<MealPlan>, plan: MealPlan) {
    let Some(index) = plans.iter().position(|existing| existing.id == plan.id) else {
        return;
    };

    let date = plan.date;
    plans[index] = plan;

    let mut position = 0;
    plans.retain(|existing| {
        let keep = position == index || existing.date != date;
        position += 1;
        keep
    });
}

fn add_to_cart(cart: &mut Vec<CartEntry>, product_id: EntityId, quantity: u32) {
    if quantity == 0 {
        return;
    }

    match cart.iter_mut().find(|entry| entry.product_id == product_id) {
        Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
        None => cart.push(CartEntry::new(product_id, quantity)),
    }
}
