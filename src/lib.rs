//! Async client SDK for the PayGate payment-gateway API: cached access tokens, HMAC request
//! signing, retries with backoff, and a typed error taxonomy in one crate.
//!
//! The request pipeline is layered leaves-first:
//!
//! - [`sign`] computes the HMAC signatures used for token acquisition, signed disbursement calls,
//!   and inbound webhook verification.
//! - [`token::TokenManager`] owns the access-token lifecycle (memory + [`cache::Cache`] mirror,
//!   safety margins, single-flight refresh).
//! - [`executor::RequestExecutor`] performs exactly one HTTP exchange through an
//!   [`http::HttpTransport`] and classifies the outcome into [`error::Error`].
//! - [`retry::RetryingClient`] adds the retry/backoff policy and transparent re-authentication.
//! - [`client::Client`] is the facade resource helpers build on.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod intercept;
pub mod obs;
pub mod registry;
pub mod response;
pub mod retry;
pub mod sign;
pub mod token;

pub use client::{Client, ClientBuilder};
pub use config::{Config, Environment};
pub use error::{Error, Result};
pub use response::Response;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::{Duration as StdDuration, Instant},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Value, json};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
