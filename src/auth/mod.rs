//! Service-account credentials for outbound calls to the interpretation
//! service.

pub mod token_cache;

pub use token_cache::{
    AdminTokenIssuer, ServiceAccountToken, TokenCache, TokenIssuer, REFRESH_BUFFER_MS,
};
