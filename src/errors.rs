use miette::Diagnostic;
use thiserror::Error;

/// Login and session-store failures. Authorization denials are never
/// errors; they are boolean outcomes from the evaluator.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("No account found for `{0}`")]
    #[diagnostic(code(fleetgate::auth::not_found))]
    NotFound(String),

    #[error("Invalid credentials")]
    #[diagnostic(code(fleetgate::auth::invalid_credentials))]
    InvalidCredentials,

    #[error("Account `{0}` is disabled")]
    #[diagnostic(code(fleetgate::auth::account_disabled))]
    AccountDisabled(String),

    #[error("Failed to write session store `{path}`")]
    #[diagnostic(
        code(fleetgate::auth::store),
        help("Check that the session store path is writable")
    )]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    #[diagnostic(code(fleetgate::auth::serde))]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(fleetgate::auth::io))]
    Io(#[from] std::io::Error),
}
