//! Core business logic - framework-agnostic ordering, ledger and table-session operations.
//!
//! Every operation takes the store handle explicitly; multi-record changes run inside a
//! single database transaction and conditional changes are guarded `UPDATE`s.

/// Domain event bus
pub mod events;
/// Gifted products and their redemption
pub mod gift;
/// Balance debits, credits, transfers and payment links
pub mod ledger;
/// User-facing notification records
pub mod notification;
/// Order creation, cancellation and status advance
pub mod order;
/// External payment gateway, webhooks and top-ups
pub mod payment;
/// Menu products
pub mod product;
/// Pure status rules: cancellation eligibility, transitions, display status
pub mod status;
/// Dining tables and table sessions
pub mod table;
/// User accounts
pub mod user;

/// Tolerance when comparing monetary amounts
pub const MONEY_EPSILON: f64 = 0.005;
