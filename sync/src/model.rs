//! Domain entities held in [`AppState`](crate::state::AppState).
//!
//! Every entity serializes with camelCase field names, which is the format of
//! both the local cache and the remote user-data resource. Fields other than
//! `id` fall back to defaults when missing or malformed so older caches keep
//! parsing. Fields this model does not declare are kept in `extra` and written
//! back unchanged.

use crate::decode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Fields of a record that this model does not declare
pub type Extra = serde_json::Map<String, serde_json::Value>;

const fn one() -> u32 {
    1
}

const fn one_unit() -> f64 {
    1.0
}

/// Opaque identifier of a product, list, item, recipe, plan or expense
///
/// Ids are supplied by callers. Remote payloads sometimes carry numeric ids;
/// those are accepted and kept in their decimal string form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id (UUID v4)
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Unsigned(id) => Self(id.to_string()),
            RawId::Signed(id) => Self(id.to_string()),
        })
    }
}

/// Entities addressed by id in the reducer
pub trait Identified {
    /// The entity's id
    fn id(&self) -> &EntityId;
}

macro_rules! identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> &EntityId {
                    &self.id
                }
            }
        )*
    };
}

identified!(Product, ShoppingList, ShoppingItem, Recipe, MealPlan, ExpenseRecord);

/// Catalog entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier
    pub id: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Category label (e.g. "grains", "dairy")
    #[serde(default)]
    pub category: String,
    /// Unit price
    #[serde(default, deserialize_with = "decode::amount")]
    pub price: f64,
    /// Units in stock
    #[serde(default, deserialize_with = "decode::count")]
    pub stock: u32,
    /// Unit of measure (e.g. "kg")
    #[serde(default)]
    pub unit: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}

impl Product {
    /// Create a product with the given id and name
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            price: 0.0,
            stock: 0,
            unit: String::new(),
            description: None,
            image: None,
            extra: Extra::new(),
        }
    }

    /// Set the unit price
    #[must_use]
    pub const fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Set the stock count
    #[must_use]
    pub const fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// One line on a shopping list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    /// Identifier, unique within its list
    pub id: EntityId,
    /// What to buy
    #[serde(default)]
    pub name: String,
    /// How much to buy
    #[serde(default = "one_unit", deserialize_with = "decode::amount")]
    pub quantity: f64,
    /// Unit of `quantity`
    #[serde(default)]
    pub unit: String,
    /// Whether the item has been picked up
    #[serde(default)]
    pub completed: bool,
    /// Catalog product this item refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<EntityId>,
    /// Expected price
    #[serde(
        default,
        deserialize_with = "decode::optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}


impl ShoppingItem {
    /// Create an open item
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity: 1.0,
            unit: String::new(),
            completed: false,
            product_id: None,
            price: None,
            extra: Extra::new(),
        }
    }

    /// Mark the item as picked up (or not)
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// A named shopping list owning an ordered collection of items
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    /// Unique identifier
    pub id: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Items in display order
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub items: Vec<ShoppingItem>,
    /// Whether every item has been picked up
    #[serde(default)]
    pub completed: bool,
    /// Creation time
    #[serde(
        default,
        deserialize_with = "decode::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}


impl ShoppingList {
    /// Create an empty list
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items: Vec::new(),
            completed: false,
            created_at: None,
            extra: Extra::new(),
        }
    }

    /// Replace the items
    #[must_use]
    pub fn with_items(mut self, items: Vec<ShoppingItem>) -> Self {
        self.items = items;
        self
    }

    /// Whether the list has items and all of them are completed
    #[must_use]
    pub fn all_items_completed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.completed)
    }

    /// Re-derive `completed` from the items
    ///
    /// A list without items keeps whatever flag it was given.
    pub fn sync_completion(&mut self) {
        if !self.items.is_empty() {
            self.completed = self.all_items_completed();
        }
    }
}

/// Ingredient line of a recipe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    /// Ingredient name
    #[serde(default)]
    pub name: String,
    /// Amount needed
    #[serde(default, deserialize_with = "decode::amount")]
    pub quantity: f64,
    /// Unit of `quantity`
    #[serde(default)]
    pub unit: String,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}


impl Ingredient {
    /// Create an ingredient line
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            extra: Extra::new(),
        }
    }
}

/// A recipe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Unique identifier
    pub id: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Category label
    #[serde(default)]
    pub category: String,
    /// Ingredients in display order
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub ingredients: Vec<Ingredient>,
    /// Preparation steps
    #[serde(default, deserialize_with = "decode::elements_or_empty")]
    pub instructions: Vec<String>,
    /// Preparation time
    #[serde(default, deserialize_with = "decode::count")]
    pub prep_time_minutes: u32,
    /// Number of servings
    #[serde(default = "one", deserialize_with = "decode::count")]
    pub servings: u32,
    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}


impl Recipe {
    /// Create a recipe with the given id and name
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            prep_time_minutes: 0,
            servings: one(),
            image: None,
            extra: Extra::new(),
        }
    }
}

/// Meals planned for one day
///
/// Recipes are held by value so a plan stays readable after the recipe is
/// edited or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    /// Unique identifier
    pub id: EntityId,
    /// The planned day (ISO `YYYY-MM-DD`; date-times are cut to their date)
    #[serde(deserialize_with = "decode::date")]
    pub date: NaiveDate,
    /// Breakfast recipe
    #[serde(
        default,
        deserialize_with = "decode::optional_record",
        skip_serializing_if = "Option::is_none"
    )]
    pub breakfast: Option<Recipe>,
    /// Lunch recipe
    #[serde(
        default,
        deserialize_with = "decode::optional_record",
        skip_serializing_if = "Option::is_none"
    )]
    pub lunch: Option<Recipe>,
    /// Dinner recipe
    #[serde(
        default,
        deserialize_with = "decode::optional_record",
        skip_serializing_if = "Option::is_none"
    )]
    pub dinner: Option<Recipe>,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}


impl MealPlan {
    /// Create an empty plan for a day
    #[must_use]
    pub fn new(id: impl Into<EntityId>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
            breakfast: None,
            lunch: None,
            dinner: None,
            extra: Extra::new(),
        }
    }

    /// Set the dinner recipe
    #[must_use]
    pub fn with_dinner(mut self, recipe: Recipe) -> Self {
        self.dinner = Some(recipe);
        self
    }
}

/// A recorded household expense
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    /// Unique identifier
    pub id: EntityId,
    /// Day of the expense (ISO `YYYY-MM-DD`; date-times are cut to their date)
    #[serde(deserialize_with = "decode::date")]
    pub date: NaiveDate,
    /// Amount spent
    #[serde(default, deserialize_with = "decode::amount")]
    pub amount: f64,
    /// Category label
    #[serde(default)]
    pub category: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}

impl ExpenseRecord {
    /// Create an expense record
    #[must_use]
    pub fn new(id: impl Into<EntityId>, date: NaiveDate, amount: f64) -> Self {
        Self {
            id: id.into(),
            date,
            amount,
            category: String::new(),
            description: String::new(),
            extra: Extra::new(),
        }
    }
}

/// Cart line: at most one per product
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    /// Product in the cart
    pub product_id: EntityId,
    /// Units of the product (1 when missing)
    #[serde(default = "one", deserialize_with = "decode::count")]
    pub quantity: u32,
    /// Undeclared fields, preserved on write
    #[serde(flatten)]
    pub extra: Extra,
}

impl CartEntry {
    /// Create a cart entry
    #[must_use]
    pub fn new(product_id: impl Into<EntityId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            extra: Extra::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_accepts_numeric_ids() {
        let ids: Vec<EntityId> = serde_json::from_str(r#"["a1", 42, -7]"#).unwrap();
        assert_eq!(ids, vec![EntityId::from("a1"), EntityId::from("42"), EntityId::from("-7")]);
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(EntityId::generate(), EntityId::generate());
    }

    #[test]
    fn product_parses_with_missing_fields() {
        let product: Product =
            serde_json::from_str(r#"{"id":"1","name":"Rice","price":38000}"#).unwrap();

        assert_eq!(product.id.as_str(), "1");
        assert!((product.price - 38000.0).abs() < f64::EPSILON);
        assert_eq!(product.stock, 0);
        assert_eq!(product.description, None);
    }

    #[test]
    fn shopping_item_uses_camel_case() {
        let mut item = ShoppingItem::new("i1", "Milk");
        item.product_id = Some("p1".into());
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["productId"], "p1");
        assert!(json.get("price").is_none());
    }

    #[test]
    fn list_completion_follows_items() {
        let mut list = ShoppingList::new("L1", "Weekly").with_items(vec![
            ShoppingItem::new("a", "Eggs").with_completed(true),
            ShoppingItem::new("b", "Bread"),
        ]);
        list.sync_completion();
        assert!(!list.completed);

        list.items[1].completed = true;
        list.sync_completion();
        assert!(list.completed);
    }

    #[test]
    fn empty_list_keeps_its_flag() {
        let mut list = ShoppingList::new("L1", "Done");
        list.completed = true;
        list.sync_completion();
        assert!(list.completed);
    }

    #[test]
    fn meal_plan_date_is_iso() {
        let plan = MealPlan::new("m1", NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["date"], "2025-03-09");
    }

    #[test]
    fn undeclared_fields_survive_a_round_trip() {
        let raw = r#"{"id":"1","name":"Rice","price":38000,"expiryDate":"2025-02-01","barcode":"893"}"#;
        let product: Product = serde_json::from_str(raw).unwrap();

        assert_eq!(product.extra["barcode"], "893");

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["expiryDate"], "2025-02-01");
        assert_eq!(json["barcode"], "893");
        assert_eq!(json["name"], "Rice");
    }

    #[test]
    fn dates_written_as_date_times_keep_their_day() {
        let expense: ExpenseRecord = serde_json::from_str(
            r#"{"id":"e1","date":"2025-01-03T10:00:00.000Z","amount":5}"#,
        )
        .unwrap();
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());

        let plan: MealPlan =
            serde_json::from_str(r#"{"id":"m1","date":"2025-03-09T00:00:00Z"}"#).unwrap();
        assert_eq!(serde_json::to_value(&plan).unwrap()["date"], "2025-03-09");
    }

    #[test]
    fn loose_numbers_are_normalized() {
        let products: Vec<Product> = serde_json::from_str(
            r#"[{"id":"a","stock":3.7},{"id":"b","stock":-2},{"id":"c","stock":"5","price":"12.5"}]"#,
        )
        .unwrap();

        let stock: Vec<u32> = products.iter().map(|p| p.stock).collect();
        assert_eq!(stock, vec![4, 0, 5]);
        assert!((products[2].price - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cart_entry_without_quantity_holds_one() {
        let entry: CartEntry = serde_json::from_str(r#"{"productId":"p1"}"#).unwrap();
        assert_eq!(entry, CartEntry::new("p1", 1));
    }

    #[test]
    fn constructors_match_decoded_defaults() {
        let recipe: Recipe = serde_json::from_str(r#"{"id":"r1","name":"Soup"}"#).unwrap();
        assert_eq!(recipe, Recipe::new("r1", "Soup"));
        assert_eq!(recipe.servings, 1);

        let item: ShoppingItem = serde_json::from_str(r#"{"id":"i1","name":"Milk"}"#).unwrap();
        assert_eq!(item, ShoppingItem::new("i1", "Milk"));
    }

    #[test]
    fn broken_nested_records_are_dropped_not_fatal() {
        let list: ShoppingList = serde_json::from_str(
            r#"{"id":"L1","items":[{"id":"a","name":"Eggs"},{"name":"no id"},{"id":"b","name":"Bread"}]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = list.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let plan: MealPlan = serde_json::from_str(
            r#"{"id":"m1","date":"2025-03-09","lunch":{"name":"no id"},"dinner":{"id":"r1","name":"Soup"}}"#,
        )
        .unwrap();
        assert_eq!(plan.lunch, None);
        assert_eq!(plan.dinner, Some(Recipe::new("r1", "Soup")));

        let recipe: Recipe = serde_json::from_str(
            r#"{"id":"r2","ingredients":[{"name":"Salt","quantity":"1"},42]}"#,
        )
        .unwrap();
        assert_eq!(recipe.ingredients, vec![Ingredient::new("Salt", 1.0, "")]);
    }
}
