//! The shared HTTP transport.

use crate::configuration::Configuration;
use crate::error::TrendsError;
use crate::utils::retry::RetryMiddleware;

/// The asynchronous client every upstream request goes through.
pub type Client = reqwest_middleware::ClientWithMiddleware;

/// The asynchronous client builder.
pub type ClientBuilder = reqwest::ClientBuilder;

pub use reqwest::{header, redirect, Response, StatusCode};

/// Build the transport: timeouts, cookies, bounded redirects and the retry layer.
///
/// Certificate verification is always on.
pub fn build_client(config: &Configuration) -> Result<Client, TrendsError> {
    let client = ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(config.user_agent_or_default())
        .cookie_store(true)
        .redirect(redirect::Policy::limited(config.redirect_limit))
        .build()
        .map_err(|e| TrendsError::invalid(format!("could not build http client: {}", e)))?;

    let retry = match config.seed {
        Some(seed) => RetryMiddleware::with_seed(config.retry, seed),
        None => RetryMiddleware::new(config.retry),
    };

    Ok(reqwest_middleware::ClientBuilder::new(client)
        .with(retry)
        .build())
}
