//! Secrets loaded from environment variables.
//!
//! Credentials never live in config.toml; they are read from the process environment,
//! which `main` populates from `.env` when present.

/// Environment variable holding the payment gateway access token.
pub const GATEWAY_TOKEN_VAR: &str = "MERCADO_PAGO_ACCESS_TOKEN";

/// Gets the payment gateway access token, if configured.
///
/// Returns `None` when the variable is unset or blank, in which case webhook
/// processing is disabled.
#[must_use]
pub fn gateway_access_token() -> Option<String> {
    std::env::var(GATEWAY_TOKEN_VAR)
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
