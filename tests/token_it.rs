mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use serde_json::json;
// self
use common::*;
use paygate_sdk::{
	Client,
	cache::{Cache, MemoryCache},
	sign,
	token::TOKEN_ENDPOINT,
};

fn client_with_cache(transport: &Arc<ScriptedTransport>, cache: Arc<MemoryCache>) -> Client {
	Client::builder(config(0))
		.transport(transport.clone())
		.cache(cache)
		.build()
		.expect("Client should build with a shared cache.")
}

#[tokio::test]
async fn token_request_is_signed_and_shaped() {
	let transport = ScriptedTransport::new();

	transport.token("tok-1", 3_600);

	let client = client(&transport, config(0));
	let token = client.access_token().await.expect("Token acquisition should succeed.");

	assert_eq!(token.expose(), "tok-1");
	assert!(client.is_authenticated());

	let request = transport.requests_to(TOKEN_ENDPOINT).pop().expect("Token request should be recorded.");

	assert_eq!(request.method, paygate_sdk::http_types::Method::POST);
	assert_eq!(request.url.as_str(), "http://gateway.test/api/v1.1/access-token/b2b");
	assert_eq!(header(&request, "x-client-id").as_deref(), Some(CLIENT_ID));
	assert_eq!(header(&request, "x-partner-id").as_deref(), Some(API_KEY));
	assert_eq!(header(&request, "x-signature"), Some(sign::auth_signature(CLIENT_ID, CLIENT_SECRET)));
	assert_eq!(header(&request, "accept").as_deref(), Some("application/json"));
	assert_eq!(header(&request, "content-type").as_deref(), Some("application/json"));
	assert!(header(&request, "authorization").is_none());
	assert_eq!(
		request.body.as_deref(),
		Some(br#"{"grant_type":"client_credentials"}"#.as_slice())
	);
}

#[tokio::test]
async fn flat_token_responses_are_accepted() {
	let transport = ScriptedTransport::new();

	transport.reply(
		TOKEN_ENDPOINT,
		200,
		json!({ "success": true, "access_token": "flat-token", "expires_in": 900 }),
	);

	let client = client(&transport, config(0));
	let token = client.access_token().await.expect("Flat token responses should parse.");

	assert_eq!(token.expose(), "flat-token");
}

#[tokio::test]
async fn tokens_are_reused_from_memory() {
	let transport = ScriptedTransport::new();

	transport.token("tok-1", 3_600);

	let client = client(&transport, config(0));

	for _ in 0..3 {
		client.access_token().await.expect("Token should be served.");
	}

	assert_eq!(transport.calls(TOKEN_ENDPOINT), 1);
}

#[tokio::test]
async fn cache_mirror_is_shared_between_clients_with_equal_credentials() {
	let transport = ScriptedTransport::new();
	let cache = Arc::new(MemoryCache::default());

	transport.token("tok-shared", 3_600);

	let first = client_with_cache(&transport, cache.clone());

	first.access_token().await.expect("First client should authenticate.");

	let second = client_with_cache(&transport, cache.clone());

	assert!(!second.is_authenticated());

	let token = second.access_token().await.expect("Second client should reuse the cache.");

	assert_eq!(token.expose(), "tok-shared");
	assert_eq!(transport.calls(TOKEN_ENDPOINT), 1);
	assert_eq!(second.tokens().metrics().cache_hits(), 1);
	assert!(cache.has(first.tokens().cache_key()).await.expect("Cache probe should succeed."));
}

#[tokio::test]
async fn short_lived_tokens_are_not_cached() {
	let transport = ScriptedTransport::new();
	let cache = Arc::new(MemoryCache::default());

	transport.token("tok-short", 100);

	let client = client_with_cache(&transport, cache.clone());

	client.access_token().await.expect("Token acquisition should succeed.");

	assert!(cache.is_empty());
}

#[tokio::test]
async fn refresh_clears_memory_and_cache_then_reauthenticates() {
	let transport = ScriptedTransport::new();
	let cache = Arc::new(MemoryCache::default());

	transport.token("tok-1", 3_600).token("tok-2", 3_600);

	let client = client_with_cache(&transport, cache.clone());

	client.access_token().await.expect("Initial token should be acquired.");

	let refreshed = client.refresh_token().await.expect("Refresh should succeed.");
	let cached = cache
		.get(client.tokens().cache_key())
		.await
		.expect("Cache read should succeed.")
		.expect("Refreshed token should be mirrored.");

	assert_eq!(refreshed.expose(), "tok-2");
	assert!(cached.contains("tok-2"));
	assert_eq!(transport.calls(TOKEN_ENDPOINT), 2);
	assert_eq!(client.tokens().metrics().refreshes(), 1);
}

#[tokio::test]
async fn refresh_is_idempotent_without_a_cached_token() {
	let transport = ScriptedTransport::new();

	transport.token("tok-1", 3_600);

	let client = client(&transport, config(0));
	let token = client.refresh_token().await.expect("Refresh without prior state should succeed.");

	assert_eq!(token.expose(), "tok-1");
}

#[tokio::test]
async fn unsuccessful_token_bodies_are_authentication_errors() {
	let transport = ScriptedTransport::new();

	transport.reply(
		TOKEN_ENDPOINT,
		200,
		json!({ "success": false, "error": { "message": "invalid signature", "code": 4010 } }),
	);

	let client = client(&transport, config(3));
	let err = client.access_token().await.expect_err("Unsuccessful token bodies must fail.");

	assert!(err.is_authentication());
	assert_eq!(err.message(), "invalid signature");
	assert_eq!(err.code(), 4010);
	assert!(!client.is_authenticated());
	assert_eq!(client.tokens().metrics().failures(), 1);
}

#[tokio::test]
async fn token_endpoint_failures_are_relabeled_and_not_retried() {
	let transport = ScriptedTransport::new();

	transport.reply(TOKEN_ENDPOINT, 503, json!({ "success": false, "message": "busy" }));

	let client = client(&transport, config(3));
	let err = client.get("/api/v1/balance").await.expect_err("Token failures must propagate.");

	assert!(err.is_authentication());
	assert_eq!(err.code(), 503);
	assert_eq!(transport.calls(TOKEN_ENDPOINT), 1);
	assert_eq!(transport.calls("/api/v1/balance"), 0);
}

#[tokio::test]
async fn missing_access_token_is_an_authentication_error() {
	let transport = ScriptedTransport::new();

	transport.reply(TOKEN_ENDPOINT, 200, json!({ "success": true, "data": { "expires_in": 3600 } }));

	let client = client(&transport, config(0));
	let err = client.access_token().await.expect_err("Responses without tokens must fail.");

	assert!(err.is_authentication());
	assert!(!client.is_authenticated());
}

#[tokio::test]
async fn network_failures_during_authentication_keep_code_zero() {
	let transport = ScriptedTransport::new();

	transport.fail(TOKEN_ENDPOINT, "dns failure");

	let client = client(&transport, config(0));
	let err = client.access_token().await.expect_err("Network failures must fail.");

	assert!(err.is_authentication());
	assert_eq!(err.code(), 0);
	assert_eq!(err.status(), None);
}

#[tokio::test]
async fn cached_token_round_trip_respects_ttl() {
	let cache = MemoryCache::default();

	cache
		.set("paygate:test", "value".into(), Some(Duration::from_millis(150)))
		.await
		.expect("Cache write should succeed.");

	assert_eq!(
		cache.get("paygate:test").await.expect("Cache read should succeed."),
		Some("value".into())
	);

	tokio::time::sleep(Duration::from_millis(250)).await;

	assert_eq!(cache.get("paygate:test").await.expect("Cache read should succeed."), None);

	cache
		.set("paygate:test", "again".into(), None)
		.await
		.expect("Cache write should succeed.");

	assert!(cache.delete("paygate:test").await.expect("Cache delete should succeed."));
	assert!(!cache.has("paygate:test").await.expect("Cache probe should succeed."));
	assert!(cache.clear().await.expect("Cache clear should succeed."));
}
