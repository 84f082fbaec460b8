//! Gateway clients against in-process stub servers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};

use prolipsi_core::{Money, PaymentMethod, PaymentStatus, PostalCode};
use prolipsi_gateway::{
    idempotency_key, quote_or_fallback, AddressLookup, GatewayConfig, GatewayError,
    MercadoPagoClient, Package, Payer, PaymentGateway, PaymentRequest, QuoteSource,
    ShippingQuoteClient, ShippingQuoter, ViaCepClient,
};

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// =============================================================================
// ViaCEP
// =============================================================================

async fn viacep(Path(cep): Path<String>) -> Json<Value> {
    if cep == "01310100" {
        Json(json!({
            "cep": "01310-100",
            "logradouro": "Avenida Paulista",
            "complemento": "",
            "bairro": "Bela Vista",
            "localidade": "São Paulo",
            "uf": "SP"
        }))
    } else {
        Json(json!({ "erro": true }))
    }
}

#[tokio::test]
async fn test_viacep_lookup() {
    let base = spawn(Router::new().route("/ws/{cep}/json/", get(viacep))).await;
    let client = ViaCepClient::new(&GatewayConfig::new().viacep_url(base)).unwrap();

    let address = client
        .lookup(&PostalCode::parse("01310-100").unwrap())
        .await
        .unwrap();
    assert_eq!(address.street, "Avenida Paulista");
    assert_eq!(address.city, "São Paulo");
    assert_eq!(address.complement, None);

    let missing = client.lookup(&PostalCode::parse("99999-999").unwrap()).await;
    assert!(matches!(missing, Err(GatewayError::PostalCodeNotFound(_))));
}

// =============================================================================
// Shipping
// =============================================================================

async fn quotes(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["from"], "01310100");
    assert_eq!(body["packages"][0]["weightGrams"], 500);
    Json(json!([
        { "id": "pac", "carrier": "Correios", "service": "PAC", "price": 21.9, "deliveryDays": 6 },
        { "id": "sedex", "carrier": "Correios", "service": "SEDEX", "price": 38.4, "deliveryDays": 2 }
    ]))
}

#[tokio::test]
async fn test_live_shipping_quotes() {
    let base = spawn(Router::new().route("/quotes", post(quotes))).await;
    let config = GatewayConfig::new().shipping_quote_url(format!("{base}/quotes"));
    let client = ShippingQuoteClient::new(&config).unwrap().unwrap();
    let dest = PostalCode::parse("20040-020").unwrap();

    let outcome = quote_or_fallback(
        Some(&client as &dyn ShippingQuoter),
        &dest,
        &[Package::default()],
        Duration::from_secs(2),
    )
    .await;

    assert_eq!(outcome.source, QuoteSource::Live);
    assert_eq!(outcome.quotes.len(), 2);
    assert_eq!(outcome.quotes[0].price, Money::from_cents(2_190));
    assert_eq!(outcome.quotes[1].delivery_days, 2);
}

#[tokio::test]
async fn test_shipping_server_error_falls_back() {
    let base = spawn(Router::new().route(
        "/quotes",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;
    let config = GatewayConfig::new().shipping_quote_url(format!("{base}/quotes"));
    let client = ShippingQuoteClient::new(&config).unwrap().unwrap();
    let dest = PostalCode::parse("69005-010").unwrap();

    let direct = client.quote(&dest, &[Package::default()]).await;
    assert!(matches!(
        direct,
        Err(GatewayError::UnexpectedStatus { status: 503, .. })
    ));

    let outcome =
        quote_or_fallback(Some(&client), &dest, &[Package::default()], Duration::from_secs(2)).await;
    assert_eq!(outcome.source, QuoteSource::Fallback);
    assert_eq!(outcome.quotes.len(), 3);
}

#[test]
fn test_shipping_client_disabled_without_url() {
    assert!(ShippingQuoteClient::new(&GatewayConfig::new()).unwrap().is_none());
}

// =============================================================================
// Mercado Pago
// =============================================================================

#[derive(Clone, Default)]
struct Captured {
    headers: Arc<Mutex<Vec<(String, String)>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn create_payment(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    captured.headers.lock().unwrap().push((header("authorization"), header("x-idempotency-key")));
    captured.bodies.lock().unwrap().push(body.clone());

    (
        StatusCode::CREATED,
        Json(json!({
            "id": 555,
            "status": "pending",
            "external_reference": body["external_reference"],
            "point_of_interaction": {
                "transaction_data": { "qr_code": "000201-pix", "qr_code_base64": "aGVsbG8=" }
            }
        })),
    )
}

async fn get_payment(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "555" {
        (
            StatusCode::OK,
            Json(json!({ "id": 555, "status": "approved", "external_reference": "PAG-inv-1" })),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "Payment not found" })))
    }
}

fn pix_request() -> PaymentRequest {
    PaymentRequest {
        amount: Money::from_cents(36_412),
        method: PaymentMethod::Pix,
        reference: "PAG-inv-1".to_string(),
        description: "Mensalidade Pedro Lima".to_string(),
        payer: Payer::from_full_name("Carla Lima", "carla@example.com", Some("52998224725")),
        installments: 1,
        card: None,
        issued_on: NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
    }
}

#[tokio::test]
async fn test_mercado_pago_create_and_get() {
    let captured = Captured::default();
    let router = Router::new()
        .route("/v1/payments", post(create_payment))
        .route("/v1/payments/{id}", get(get_payment))
        .with_state(captured.clone());
    let base = spawn(router).await;

    let config = GatewayConfig::new()
        .mercado_pago_url(base)
        .access_token("TEST-token")
        .notification_url("https://checkout.example.com/webhooks/mercado-pago");
    let client = MercadoPagoClient::new(&config).unwrap();

    let payment = client.create_payment(&pix_request()).await.unwrap();
    assert_eq!(payment.id, "555");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.pix.unwrap().qr_code.as_deref(), Some("000201-pix"));

    let (auth, key) = captured.headers.lock().unwrap()[0].clone();
    assert_eq!(auth, "Bearer TEST-token");
    assert_eq!(key, idempotency_key(&pix_request()));

    let body = captured.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["transaction_amount"], json!(364.12));
    assert_eq!(body["payment_method_id"], "pix");
    assert_eq!(body["external_reference"], "PAG-inv-1");
    assert_eq!(body["payer"]["identification"]["number"], "52998224725");
    assert!(body.get("token").is_none());

    let fetched = client.get_payment("555").await.unwrap();
    assert_eq!(fetched.status, PaymentStatus::Approved);

    let missing = client.get_payment("1").await;
    assert!(matches!(
        missing,
        Err(GatewayError::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_mercado_pago_requires_token() {
    let client = MercadoPagoClient::new(&GatewayConfig::new()).unwrap();
    let result = client.create_payment(&pix_request()).await;
    assert!(matches!(result, Err(GatewayError::MissingCredentials(_))));
}
