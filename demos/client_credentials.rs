//! Demonstrates the authenticated request pipeline against a local mock gateway: token
//! acquisition, a bearer-authenticated call, a signed transfer, and webhook verification.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use paygate_sdk::{
	Client, Config,
	config::Credentials,
	http_types::Method,
	intercept::{LoggingInterceptor, MetricsInterceptor},
	sign,
	token::TOKEN_ENDPOINT,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_ENDPOINT);
			then.status(200).json_body(json!({
				"success": true,
				"data": { "access_token": "demo-access", "expires_in": 900 }
			}));
		})
		.await;
	let balance_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/balance").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!({
				"success": true,
				"data": { "available": 1_250_000, "currency": "IDR" }
			}));
		})
		.await;
	let transfer_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/disbursement/transfer").header_exists("x-signature");
			then.status(200).json_body(json!({ "success": true, "data": { "id": "trf_demo" } }));
		})
		.await;
	let credentials = Credentials::new("demo-client", "super-secret", "demo-partner")
		.with_hmac_validation_key("demo-webhook-key");
	let config = Config::builder(credentials).base_url(server.base_url()).build()?;
	let metrics = Arc::new(MetricsInterceptor::default());
	let client = Client::builder(config)
		.interceptor(Arc::new(LoggingInterceptor))
		.interceptor(metrics.clone())
		.build()?;
	let balance = client.get("/api/v1/balance").await?;

	println!("Available balance: {}.", balance.data()["available"]);

	let transfer = client
		.request_signed(
			Method::POST,
			"/api/v1/disbursement/transfer",
			Some(&json!({ "amount": 50_000, "beneficiary_account": "1234567890" })),
		)
		.await?;

	println!("Transfer accepted: {}.", transfer.data()["id"]);

	let payload = r#"{"event":"disbursement.completed","id":"trf_demo"}"#;
	let signature = sign::webhook_signature("1700000000", payload, "demo-webhook-key")?;

	println!(
		"Webhook signature valid: {}.",
		client.verify_webhook_signature("1700000000", payload, &signature)?
	);
	println!("Request metrics: {:?}.", metrics.snapshot());

	token_mock.assert_async().await;
	balance_mock.assert_async().await;
	transfer_mock.assert_async().await;

	Ok(())
}
