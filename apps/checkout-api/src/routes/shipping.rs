//! Stand-alone shipping quotes (product page "calcular frete").

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;
use prolipsi_core::PostalCode;
use prolipsi_gateway::{quote_or_fallback, Package, QuoteOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteShippingRequest {
    pub postal_code: String,
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Packages default to a single small box.
pub(crate) fn packages_or_default(packages: Vec<Package>) -> Vec<Package> {
    if packages.is_empty() {
        vec![Package::default()]
    } else {
        packages
    }
}

pub async fn quote_shipping(
    State(state): State<AppState>,
    Json(request): Json<QuoteShippingRequest>,
) -> ApiResult<Json<QuoteOutcome>> {
    let destination = PostalCode::parse(&request.postal_code)?;
    let packages = packages_or_default(request.packages);

    let outcome = quote_or_fallback(
        state.shipping_quoter(),
        &destination,
        &packages,
        state.shipping_timeout,
    )
    .await;

    Ok(Json(outcome))
}
