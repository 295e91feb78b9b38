// server/src/models/mod.rs

//! Data structures representing database entities and the values the
//! checkout flow snapshots out of them.

pub mod cart_item;
pub mod discount;
pub mod order;
pub mod order_item;
pub mod payment_intent;
pub mod product;
pub mod user;

pub use cart_item::{CartItem, VariantAttribute};
pub use discount::{Discount, DiscountKind};
pub use order::{
  compute_total, Address, DeliveryType, DraftLine, Order, OrderDraft, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use order_item::OrderItem;
pub use payment_intent::{PaymentIntent, PaymentIntentStatus};
pub use product::Product;
pub use user::User;
