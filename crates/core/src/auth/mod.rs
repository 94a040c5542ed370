mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create an authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Box<dyn Authenticator> {
    match config.method {
        AuthMethod::None => Box::new(NoneAuthenticator::new()),
        AuthMethod::ApiKey => Box::new(ApiKeyAuthenticator::new(
            config.api_key.clone().unwrap_or_default(),
        )),
    }
}
