//! ViaCEP address lookup.
//!
//! `GET {base}/ws/{cep}/json/`. An unknown CEP still answers 200, with a
//! body of `{"erro": true}` (older deployments send `"true"` as a string).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use prolipsi_core::{Address, PostalCode};

const SERVICE: &str = "viacep";

/// Resolves a postal code to a street address.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup(&self, postal_code: &PostalCode) -> GatewayResult<Address>;
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    complemento: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(text)) => text == "true",
            _ => false,
        }
    }

    /// The house number is not known to ViaCEP; the buyer fills it in.
    fn into_address(self, postal_code: &PostalCode) -> Address {
        Address {
            postal_code: postal_code.digits().to_string(),
            street: self.logradouro,
            number: String::new(),
            complement: Some(self.complemento).filter(|c| !c.is_empty()),
            neighborhood: self.bairro,
            city: self.localidade,
            state: self.uf,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        Ok(ViaCepClient {
            client: config.http_client()?,
            base_url: config.viacep_url.clone(),
        })
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn lookup(&self, postal_code: &PostalCode) -> GatewayResult<Address> {
        let url = format!("{}/ws/{}/json/", self.base_url, postal_code.digits());
        debug!(cep = %postal_code, "ViaCEP lookup");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(cep = %postal_code, status = status.as_u16(), "ViaCEP lookup failed");
            return Err(GatewayError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let body: ViaCepResponse = response.json().await.map_err(|e| GatewayError::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })?;

        if body.is_error() {
            return Err(GatewayError::PostalCodeNotFound(postal_code.to_string()));
        }

        Ok(body.into_address(postal_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_flag_variants() {
        let as_bool: ViaCepResponse = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(as_bool.is_error());

        let as_string: ViaCepResponse = serde_json::from_str(r#"{"erro": "true"}"#).unwrap();
        assert!(as_string.is_error());

        let found: ViaCepResponse = serde_json::from_str(
            r#"{"cep":"01310-100","logradouro":"Avenida Paulista","complemento":"de 612 a 1510 - lado par","bairro":"Bela Vista","localidade":"São Paulo","uf":"SP"}"#,
        )
        .unwrap();
        assert!(!found.is_error());

        let cep = PostalCode::parse("01310-100").unwrap();
        let address = found.into_address(&cep);
        assert_eq!(address.postal_code, "01310100");
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.state, "SP");
        assert!(address.number.is_empty());
    }

    #[test]
    fn test_empty_complement_is_none() {
        let body: ViaCepResponse =
            serde_json::from_str(r#"{"logradouro":"Rua A","complemento":"","bairro":"Centro","localidade":"Curitiba","uf":"PR"}"#)
                .unwrap();
        let address = body.into_address(&PostalCode::parse("80010000").unwrap());
        assert_eq!(address.complement, None);
    }
}
