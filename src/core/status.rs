//! Pure order status rules.
//!
//! Nothing here touches the store: cancellation eligibility, allowed forward
//! transitions and the display status are all derived from the stored status, the
//! creation timestamp and the current wall-clock time.

use crate::{
    config::OrderPolicy,
    entities::{OrderStatus, order},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status shown to the customer; not persisted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pending,
    Paying,
    /// `paying` past the cancellation window: still waiting on the gateway, no longer cancellable
    AwaitingConfirmation,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
    /// `pending` for longer than the preparation wait without being started
    Expired,
}

/// Read-side view of an order's state at a given instant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub stored_status: OrderStatus,
    pub display_status: DisplayStatus,
    pub cancellable: bool,
    pub elapsed_secs: i64,
    /// Seconds left to cancel; zero once the window has closed
    pub cancel_secs_left: i64,
}

/// Whole seconds between `created_at` and `now`, never negative.
#[must_use]
pub fn elapsed_secs(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().max(0)
}

/// Checks whether an order with the given status and age may be cancelled.
///
/// # Errors
/// - [`Error::NotCancellable`] when the order is `preparing`, `ready`, `delivered` or `cancelled`
/// - [`Error::CancellationWindowExpired`] when it is `pending`/`paying` and the window has elapsed
pub fn check_cancellable(
    order_id: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &OrderPolicy,
) -> Result<()> {
    match status {
        OrderStatus::Pending | OrderStatus::Paying => {
            let elapsed = elapsed_secs(created_at, now);
            if elapsed >= policy.cancellation_window_secs {
                Err(Error::CancellationWindowExpired {
                    order_id,
                    elapsed_secs: elapsed,
                    window_secs: policy.cancellation_window_secs,
                })
            } else {
                Ok(())
            }
        }
        OrderStatus::Preparing
        | OrderStatus::Ready
        | OrderStatus::Delivered
        | OrderStatus::Cancelled => Err(Error::NotCancellable {
            order_id,
            status: status.to_string(),
        }),
    }
}

/// The single status an order may move to from `from`, if any.
#[must_use]
pub const fn next_status(from: OrderStatus) -> Option<OrderStatus> {
    match from {
        OrderStatus::Paying => Some(OrderStatus::Pending),
        OrderStatus::Pending => Some(OrderStatus::Preparing),
        OrderStatus::Preparing => Some(OrderStatus::Ready),
        OrderStatus::Ready => Some(OrderStatus::Delivered),
        OrderStatus::Delivered | OrderStatus::Cancelled => None,
    }
}

/// Rejects any forward move other than the next step.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    if next_status(from) == Some(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Derives the customer-facing view of an order at `now`.
#[must_use]
pub fn describe(order: &order::Model, now: DateTime<Utc>, policy: &OrderPolicy) -> OrderView {
    let elapsed = elapsed_secs(order.created_at, now);
    let within_window = elapsed < policy.cancellation_window_secs;

    let display_status = match order.status {
        OrderStatus::Paying if within_window => DisplayStatus::Paying,
        OrderStatus::Paying => DisplayStatus::AwaitingConfirmation,
        OrderStatus::Pending if elapsed >= policy.preparation_wait_secs => DisplayStatus::Expired,
        OrderStatus::Pending => DisplayStatus::Pending,
        OrderStatus::Preparing => DisplayStatus::Preparing,
        OrderStatus::Ready => DisplayStatus::Ready,
        OrderStatus::Delivered => DisplayStatus::Delivered,
        OrderStatus::Cancelled => DisplayStatus::Cancelled,
    };

    let cancellable =
        check_cancellable(order.id, order.status, order.created_at, now, policy).is_ok();

    OrderView {
        stored_status: order.status,
        display_status,
        cancellable,
        elapsed_secs: elapsed,
        cancel_secs_left: if cancellable {
            policy.cancellation_window_secs - elapsed
        } else {
            0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PaymentMethod;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 21, 0, 0).single().unwrap_or_default()
    }

    fn order_with(status: OrderStatus) -> order::Model {
        order::Model {
            id: 1,
            user_id: 1,
            total_amount: 100.0,
            status,
            payment_method: PaymentMethod::Balance,
            notes: None,
            table_id: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    #[test]
    fn test_cancellable_inside_window() {
        let policy = OrderPolicy::default();
        for status in [OrderStatus::Pending, OrderStatus::Paying] {
            assert!(check_cancellable(1, status, t0(), t0() + Duration::seconds(60), &policy).is_ok());
            assert!(
                check_cancellable(1, status, t0(), t0() + Duration::seconds(119), &policy).is_ok()
            );
        }
    }

    #[test]
    fn test_window_closes_at_exactly_120_seconds() {
        let policy = OrderPolicy::default();
        let result = check_cancellable(
            9,
            OrderStatus::Pending,
            t0(),
            t0() + Duration::seconds(120),
            &policy,
        );
        assert!(matches!(
            result,
            Err(Error::CancellationWindowExpired {
                order_id: 9,
                elapsed_secs: 120,
                window_secs: 120
            })
        ));
    }

    #[test]
    fn test_started_or_finished_orders_are_not_cancellable() {
        let policy = OrderPolicy::default();
        for status in [
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            // Even inside the window
            let result = check_cancellable(2, status, t0(), t0() + Duration::seconds(5), &policy);
            assert!(matches!(result, Err(Error::NotCancellable { order_id: 2, .. })));
        }
    }

    #[test]
    fn test_clock_skew_counts_as_zero_elapsed() {
        assert_eq!(elapsed_secs(t0(), t0() - Duration::seconds(30)), 0);
    }

    #[test]
    fn test_transitions_only_move_one_step_forward() {
        assert!(check_transition(OrderStatus::Paying, OrderStatus::Pending).is_ok());
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Preparing).is_ok());
        assert!(check_transition(OrderStatus::Preparing, OrderStatus::Ready).is_ok());
        assert!(check_transition(OrderStatus::Ready, OrderStatus::Delivered).is_ok());

        assert!(check_transition(OrderStatus::Pending, OrderStatus::Delivered).is_err());
        assert!(check_transition(OrderStatus::Ready, OrderStatus::Preparing).is_err());
        assert!(check_transition(OrderStatus::Delivered, OrderStatus::Cancelled).is_err());
        assert!(check_transition(OrderStatus::Paying, OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_paying_becomes_awaiting_confirmation_after_window() {
        let policy = OrderPolicy::default();
        let order = order_with(OrderStatus::Paying);

        let early = describe(&order, t0() + Duration::seconds(30), &policy);
        assert_eq!(early.display_status, DisplayStatus::Paying);
        assert!(early.cancellable);
        assert_eq!(early.cancel_secs_left, 90);

        let late = describe(&order, t0() + Duration::seconds(200), &policy);
        assert_eq!(late.display_status, DisplayStatus::AwaitingConfirmation);
        assert_eq!(late.stored_status, OrderStatus::Paying);
        assert!(!late.cancellable);
        assert_eq!(late.cancel_secs_left, 0);
    }

    #[test]
    fn test_pending_shows_expired_after_preparation_wait() {
        let policy = OrderPolicy::default();
        let order = order_with(OrderStatus::Pending);

        let waiting = describe(&order, t0() + Duration::seconds(599), &policy);
        assert_eq!(waiting.display_status, DisplayStatus::Pending);
        assert!(!waiting.cancellable);

        let expired = describe(&order, t0() + Duration::seconds(600), &policy);
        assert_eq!(expired.display_status, DisplayStatus::Expired);
        assert_eq!(expired.stored_status, OrderStatus::Pending);
    }

    #[test]
    fn test_preparing_is_never_expired() {
        let policy = OrderPolicy::default();
        let order = order_with(OrderStatus::Preparing);
        let view = describe(&order, t0() + Duration::hours(2), &policy);
        assert_eq!(view.display_status, DisplayStatus::Preparing);
    }
}
