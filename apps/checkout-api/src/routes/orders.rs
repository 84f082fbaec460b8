//! Order lookup for the "thank you" page.
//!
//! While an order still awaits payment the provider is asked again, so a
//! PIX paid a minute ago shows up without waiting for the webhook.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use prolipsi_core::validation::validate_uuid;
use prolipsi_core::{Order, OrderItem, OrderStatus, PaymentStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderView>> {
    validate_uuid(&id)?;
    let orders = state.db.orders();
    let mut order = orders
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &id))?;

    if order.status == OrderStatus::AwaitingPayment {
        if let Some(payment_id) = order.payment_id.clone() {
            match state.payments.get_payment(&payment_id).await {
                Ok(payment) => {
                    let settled = match payment.status {
                        PaymentStatus::Approved => orders.mark_paid(&order.id).await?,
                        PaymentStatus::Failed => orders.mark_failed(&order.id).await?,
                        PaymentStatus::Pending => false,
                    };
                    if settled {
                        info!(
                            order_id = %order.id,
                            payment_id = %payment_id,
                            status = %payment.raw_status,
                            "Order settled on refresh"
                        );
                        order = orders
                            .get_by_id(&id)
                            .await?
                            .ok_or_else(|| ApiError::not_found("Order", &id))?;
                    }
                }
                // The stored status is still valid; the provider is asked
                // again on the next poll.
                Err(e) => warn!(order_id = %order.id, error = %e, "Payment refresh failed"),
            }
        }
    }

    let items = orders.get_items(&order.id).await?;
    Ok(Json(OrderView { order, items }))
}
