//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod balance_transfer;
pub mod dining_table;
pub mod gift;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod payment_link;
pub mod payment_transaction;
pub mod product;
pub mod table_notification;
pub mod table_order;
pub mod table_session;
pub mod user;

// Re-export specific types to avoid conflicts
pub use balance_transfer::{Entity as BalanceTransfer, Model as BalanceTransferModel};
pub use dining_table::{Entity as DiningTable, Model as DiningTableModel, TableStatus};
pub use gift::{Entity as Gift, GiftStatus, Model as GiftModel};
pub use notification::{Entity as Notification, Model as NotificationModel, NotificationKind};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment_link::{Entity as PaymentLink, LinkStatus, Model as PaymentLinkModel};
pub use payment_transaction::{
    Entity as PaymentTransaction, Model as PaymentTransactionModel, PaymentTxKind,
    PaymentTxStatus,
};
pub use product::{Entity as Product, Model as ProductModel};
pub use table_notification::{
    Entity as TableNotification, Model as TableNotificationModel, TableNotificationKind,
};
pub use table_order::{Entity as TableOrder, Model as TableOrderModel};
pub use table_session::{Entity as TableSession, Model as TableSessionModel, SessionStatus};
pub use user::{Entity as User, Model as UserModel};
