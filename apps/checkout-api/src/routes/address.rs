//! Postal code lookup for the identification form.

use axum::extract::{Path, State};
use axum::Json;

use crate::error::ApiResult;
use crate::state::AppState;
use prolipsi_core::{Address, PostalCode};

/// `GET /addresses/{cep}`. Accepts the CEP with or without the dash.
pub async fn lookup_address(
    State(state): State<AppState>,
    Path(cep): Path<String>,
) -> ApiResult<Json<Address>> {
    let postal_code = PostalCode::parse(&cep)?;
    let address = state.address_lookup.lookup(&postal_code).await?;
    Ok(Json(address))
}
