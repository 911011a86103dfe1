//! Domain records for the restaurant backend
//!
//! Read models mirror the backend documents. Each decodes through a private
//! `Raw*` struct so that alternate spellings (`_id`/`id`, `number`/`name`)
//! may appear together; the first in precedence order wins.
//! Write payloads (`New*`, `*Update`) carry the client-side validation that
//! runs before any request leaves the process.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::wire::{self, DocumentIds, DocumentRef};

// ─────────────────────────────────────────────────────────────────────────────
// Waiter call status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a waiter call: `pending → acknowledged → resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Pending,
    Acknowledged,
    Resolved,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Acknowledged => "acknowledged",
            CallStatus::Resolved => "resolved",
        }
    }

    fn rank(self) -> u8 {
        match self {
            CallStatus::Pending => 0,
            CallStatus::Acknowledged => 1,
            CallStatus::Resolved => 2,
        }
    }

    /// The status a staff action moves this call to, if any.
    pub fn next(self) -> Option<CallStatus> {
        match self {
            CallStatus::Pending => Some(CallStatus::Acknowledged),
            CallStatus::Acknowledged => Some(CallStatus::Resolved),
            CallStatus::Resolved => None,
        }
    }

    /// Whether a staff action may move a call from `self` to `target`.
    ///
    /// Resolving straight from pending is allowed (a waiter can walk over and
    /// handle the call without acknowledging first); going backwards is not.
    pub fn can_advance_to(self, target: CallStatus) -> bool {
        target.rank() > self.rank()
    }

    pub fn is_terminal(self) -> bool {
        self == CallStatus::Resolved
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(CallStatus::Pending),
            "acknowledged" => Ok(CallStatus::Acknowledged),
            "resolved" => Ok(CallStatus::Resolved),
            other => Err(Error::validation(
                "status",
                format!("'{other}' is not one of pending, acknowledged, resolved"),
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users and session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Waiter,
    Kitchen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawUser")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(flatten)]
    ids: DocumentIds,
    name: String,
    email: String,
    #[serde(default)]
    role: UserRole,
    #[serde(default)]
    restaurant_id: Option<DocumentRef>,
    #[serde(default)]
    restaurant: Option<DocumentRef>,
}

impl TryFrom<RawUser> for User {
    type Error = String;

    fn try_from(raw: RawUser) -> std::result::Result<Self, String> {
        Ok(Self {
            id: raw.ids.require()?,
            name: raw.name,
            email: raw.email,
            role: raw.role,
            restaurant_id: DocumentRef::prefer(raw.restaurant_id, raw.restaurant)
                .map(|r| r.id().to_string()),
        })
    }
}

/// The locally persisted authentication state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_email(&self.email)?;
        require_non_empty("password", &self.password)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_email(&self.email)?;
        if self.password.chars().count() < 6 {
            return Err(Error::validation(
                "password",
                "must be at least 6 characters",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        require_some_change(self.name.is_some() || self.email.is_some() || self.role.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Restaurant
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRestaurant")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct RawRestaurant {
    #[serde(flatten)]
    ids: DocumentIds,
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    phone: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<RawRestaurant> for Restaurant {
    type Error = String;

    fn try_from(raw: RawRestaurant) -> std::result::Result<Self, String> {
        Ok(Self {
            id: raw.ids.require()?,
            name: raw.name,
            address: raw.address,
            phone: raw.phone,
            description: raw.description,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RestaurantUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        require_some_change(
            self.name.is_some()
                || self.address.is_some()
                || self.phone.is_some()
                || self.description.is_some(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dishes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDish")]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: Option<String>,
    pub available: bool,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDish {
    #[serde(flatten)]
    ids: DocumentIds,
    name: String,
    #[serde(default)]
    description: String,
    price: f64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    available: Option<bool>,
    #[serde(default)]
    is_available: Option<bool>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl TryFrom<RawDish> for Dish {
    type Error = String;

    fn try_from(raw: RawDish) -> std::result::Result<Self, String> {
        Ok(Self {
            id: raw.ids.require()?,
            name: raw.name,
            description: raw.description,
            price: raw.price,
            category: raw.category,
            // Dishes are on the menu unless the backend says otherwise
            available: wire::first_present([raw.available, raw.is_available]).unwrap_or(true),
            image_url: wire::first_present([raw.image_url, raw.image]),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDish {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub available: bool,
}

impl NewDish {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_price(self.price)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DishUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl DishUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(price) = self.price {
            require_price(price)?;
        }
        require_some_change(
            self.name.is_some()
                || self.description.is_some()
                || self.price.is_some()
                || self.category.is_some()
                || self.available.is_some(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dining tables
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDiningTable")]
pub struct DiningTable {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub status: TableStatus,
}

#[derive(Deserialize)]
struct RawDiningTable {
    #[serde(flatten)]
    ids: DocumentIds,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    name: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    number: Option<String>,
    #[serde(default)]
    capacity: u32,
    #[serde(default)]
    status: TableStatus,
}

impl TryFrom<RawDiningTable> for DiningTable {
    type Error = String;

    fn try_from(raw: RawDiningTable) -> std::result::Result<Self, String> {
        Ok(Self {
            id: raw.ids.require()?,
            name: wire::first_present([raw.name, raw.number]).ok_or_else(|| wire::missing("name"))?,
            capacity: raw.capacity,
            status: raw.status,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTable {
    pub name: String,
    pub capacity: u32,
}

impl NewTable {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_capacity(self.capacity)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TableStatus>,
}

impl TableUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(capacity) = self.capacity {
            require_capacity(capacity)?;
        }
        require_some_change(self.name.is_some() || self.capacity.is_some() || self.status.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Waiter call creation
// ─────────────────────────────────────────────────────────────────────────────

/// Payload a customer-facing client sends to summon staff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWaiterCall {
    pub restaurant_id: String,
    pub table_id: String,
    pub customer_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl NewWaiterCall {
    pub fn validate(&self) -> Result<()> {
        require_id("restaurantId", &self.restaurant_id)?;
        require_id("tableId", &self.table_id)?;
        require_non_empty("customerName", &self.customer_name)?;
        if self.message.chars().count() > 500 {
            return Err(Error::validation("message", "must be at most 500 characters"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Reject an empty or whitespace-only identifier before it lands in a URL.
pub fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<()> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(Error::validation("email", format!("'{value}' is not an email address")));
    }
    Ok(())
}

fn require_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::validation("price", "must be a non-negative amount"));
    }
    Ok(())
}

fn require_capacity(capacity: u32) -> Result<()> {
    if capacity == 0 {
        return Err(Error::validation("capacity", "must be at least 1"));
    }
    Ok(())
}

fn require_some_change(any: bool) -> Result<()> {
    if !any {
        return Err(Error::validation("update", "no fields to change"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_value(CallStatus::Acknowledged).unwrap(),
            json!("acknowledged")
        );
        let s: CallStatus = serde_json::from_value(json!("resolved")).unwrap();
        assert_eq!(s, CallStatus::Resolved);
    }

    #[test]
    fn test_call_status_from_str() {
        assert_eq!("Pending".parse::<CallStatus>().unwrap(), CallStatus::Pending);
        assert!("done".parse::<CallStatus>().is_err());
    }

    #[test]
    fn test_call_status_transitions() {
        assert_eq!(CallStatus::Pending.next(), Some(CallStatus::Acknowledged));
        assert_eq!(CallStatus::Acknowledged.next(), Some(CallStatus::Resolved));
        assert_eq!(CallStatus::Resolved.next(), None);

        assert!(CallStatus::Pending.can_advance_to(CallStatus::Acknowledged));
        assert!(CallStatus::Pending.can_advance_to(CallStatus::Resolved));
        assert!(!CallStatus::Acknowledged.can_advance_to(CallStatus::Acknowledged));
        assert!(!CallStatus::Resolved.can_advance_to(CallStatus::Pending));
        assert!(CallStatus::Resolved.is_terminal());
    }

    #[test]
    fn test_user_accepts_mongo_id() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ana",
            "email": "ana@example.com",
            "role": "manager",
            "restaurant": "r1"
        }))
        .unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, UserRole::Manager);
        assert_eq!(user.restaurant_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_dish_defaults() {
        let dish: Dish = serde_json::from_value(json!({
            "_id": "d1",
            "name": "Paella",
            "price": 14.5
        }))
        .unwrap();
        assert!(dish.available);
        assert!(dish.description.is_empty());
    }

    #[test]
    fn test_dish_missing_price_is_rejected() {
        let r: std::result::Result<Dish, _> =
            serde_json::from_value(json!({"_id": "d1", "name": "Paella"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_table_number_as_name() {
        let table: DiningTable = serde_json::from_value(json!({
            "_id": "t1",
            "number": 12,
            "capacity": 4,
            "status": "occupied"
        }))
        .unwrap();
        assert_eq!(table.name, "12");
        assert_eq!(table.status, TableStatus::Occupied);
    }

    #[test]
    fn test_documents_with_both_id_keys() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "id": "u1",
            "name": "Ana",
            "email": "ana@example.com",
            "restaurant": {"_id": "r1", "name": "Casa"},
            "restaurantId": "r1"
        }))
        .unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.restaurant_id.as_deref(), Some("r1"));

        let restaurant: Restaurant =
            serde_json::from_value(json!({"_id": "r1", "id": "r1", "name": "Casa"})).unwrap();
        assert_eq!(restaurant.id, "r1");

        let dish: Dish = serde_json::from_value(json!({
            "_id": "d1",
            "id": "d1",
            "name": "Paella",
            "price": 14.5,
            "available": false,
            "isAvailable": true,
            "image": "a.png",
            "imageUrl": "b.png"
        }))
        .unwrap();
        assert_eq!(dish.id, "d1");
        assert!(!dish.available);
        assert_eq!(dish.image_url.as_deref(), Some("b.png"));

        let table: DiningTable = serde_json::from_value(json!({
            "_id": "t1",
            "id": "t1",
            "name": "Terrace",
            "number": 12
        }))
        .unwrap();
        assert_eq!(table.name, "Terrace");
    }

    #[test]
    fn test_document_without_id_is_rejected() {
        let r: std::result::Result<Restaurant, _> = serde_json::from_value(json!({"name": "Casa"}));
        assert!(r.is_err());
        let r: std::result::Result<DiningTable, _> = serde_json::from_value(json!({"_id": "t1"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_session_survives_a_round_trip() {
        let session = Session {
            token: "tok".into(),
            user: User {
                id: "u1".into(),
                name: "Ana".into(),
                email: "ana@example.com".into(),
                role: UserRole::Admin,
                restaurant_id: Some("r1".into()),
            },
        };
        let back: Session =
            serde_json::from_value(serde_json::to_value(&session).unwrap()).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("ana@example.com", "secret").validate().is_ok());
        let err = Credentials::new("ana", "secret").validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "email"));
        let err = Credentials::new("ana@example.com", "").validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "password"));
    }

    #[test]
    fn test_new_dish_validation() {
        let mut dish = NewDish {
            name: "Tortilla".into(),
            description: String::new(),
            price: 6.0,
            category: None,
            available: true,
        };
        assert!(dish.validate().is_ok());
        dish.price = -1.0;
        assert!(dish.validate().is_err());
        dish.price = f64::NAN;
        assert!(dish.validate().is_err());
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert!(DishUpdate::default().validate().is_err());
        assert!(TableUpdate::default().validate().is_err());
        assert!(UserUpdate::default().validate().is_err());
        assert!(RestaurantUpdate::default().validate().is_err());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = DishUpdate {
            available: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"available": false}));
    }

    #[test]
    fn test_new_table_zero_capacity() {
        let table = NewTable {
            name: "Terrace 1".into(),
            capacity: 0,
        };
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_new_waiter_call_validation() {
        let call = NewWaiterCall {
            restaurant_id: "r1".into(),
            table_id: " ".into(),
            customer_name: "Bob".into(),
            message: String::new(),
        };
        let err = call.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "tableId"));
    }

    #[test]
    fn test_new_waiter_call_omits_empty_message() {
        let call = NewWaiterCall {
            restaurant_id: "r1".into(),
            table_id: "t1".into(),
            customer_name: "Bob".into(),
            message: String::new(),
        };
        let value = serde_json::to_value(&call).unwrap();
        assert!(value.get("message").is_none());
        assert_eq!(value["customerName"], "Bob");
    }
}
