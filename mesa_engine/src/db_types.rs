use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mesa_common::Money;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// Opaque order identifier, assigned at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generate a fresh random order id (12 hex digits).
    pub fn random() -> Self {
        let id: u64 = rand::thread_rng().gen();
        Self(format!("{:012x}", id & 0xffff_ffff_ffff))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
/// The order lifecycle. `Pending` is the initial state; `Served` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order has been placed and the partner has not acted on it yet.
    Pending,
    /// The partner has accepted the order and is preparing it.
    Processing,
    /// The order has been delivered. Feedback may be attached in this state only.
    Served,
    /// The order was cancelled before being served.
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Served | OrderStatus::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Served => write!(f, "served"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "served" => Ok(Self::Served),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------         Role          -------------------------------------------------------
/// The two identity roles carried by access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Partner,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Partner => write!(f, "partner"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "partner" => Ok(Self::Partner),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------     OwnerIdentity     -------------------------------------------------------
/// The partner-facing identity key: an email-like string, normalized to lowercase and trimmed once at construction
/// so that ownership checks and broker routing never need ad hoc case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OwnerIdentity(String);

impl OwnerIdentity {
    pub fn new<S: AsRef<str>>(value: S) -> Self {
        Self(value.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: AsRef<str>> From<S> for OwnerIdentity {
    fn from(value: S) -> Self {
        Self::new(value)
    }
}

impl Display for OwnerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------       LineItem        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    pub fn new<S: Into<String>>(name: S, quantity: i64, unit_price: Money) -> Self {
        Self { name: name.into(), quantity, unit_price }
    }

    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub establishment_id: String,
    /// Copied from the establishment at creation time. Immutable thereafter, so historical orders survive
    /// establishment edits.
    pub owner_identity: OwnerIdentity,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub contact: Option<String>,
    pub status: OrderStatus,
    pub rating: Option<i64>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub feedback_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn total(&self) -> Money {
        self.items.iter().map(LineItem::subtotal).sum()
    }
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// An order as submitted by a customer, before the engine has resolved the target establishment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: String,
    pub establishment_id: String,
    pub items: Vec<LineItem>,
    /// Optional contact information (an email address) used for the best-effort order confirmation.
    pub contact: Option<String>,
}

impl NewOrder {
    pub fn new<C: Into<String>, E: Into<String>>(customer_id: C, establishment_id: E, items: Vec<LineItem>) -> Self {
        Self {
            customer_id: customer_id.into(),
            establishment_id: establishment_id.into(),
            items,
            contact: None,
        }
    }

    pub fn with_contact<S: Into<String>>(mut self, contact: S) -> Self {
        self.contact = Some(contact.into());
        self
    }
}

//--------------------------------------     Establishment     -------------------------------------------------------
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Establishment {
    pub id: String,
    pub name: String,
    pub owner_identity: OwnerIdentity,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEstablishment {
    pub name: String,
    pub owner_identity: OwnerIdentity,
    pub description: Option<String>,
}

impl NewEstablishment {
    pub fn new<S: Into<String>, O: Into<OwnerIdentity>>(name: S, owner: O) -> Self {
        Self { name: name.into(), owner_identity: owner.into(), description: None }
    }
}

//--------------------------------------     RatingSummary     -------------------------------------------------------
/// The public reputation aggregate for one establishment: mean rating over served, rated orders, to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self { average: 0.0, count: 0 }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn owner_identity_is_canonical() {
        let a = OwnerIdentity::new("  P@X.Com ");
        let b = OwnerIdentity::new("p@x.com");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "p@x.com");
    }

    #[test]
    fn status_round_trips() {
        for s in [OrderStatus::Pending, OrderStatus::Processing, OrderStatus::Served, OrderStatus::Cancelled] {
            assert_eq!(s.to_string().parse::<OrderStatus>().unwrap(), s);
        }
        assert!("paid".parse::<OrderStatus>().is_err());
        assert!(OrderStatus::Served.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn order_totals() {
        let items =
            vec![LineItem::new("flat white", 2, Money::from(450)), LineItem::new("croissant", 1, Money::from(380))];
        let order = NewOrder::new("cust-1", "est-1", items.clone());
        assert_eq!(items.iter().map(LineItem::subtotal).sum::<Money>(), Money::from(1280));
        assert_eq!(order.contact, None);
        assert_eq!(order.with_contact("c@x.com").contact.as_deref(), Some("c@x.com"));
    }
}
