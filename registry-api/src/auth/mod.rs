mod extractor;
mod token;

pub use extractor::ApiToken;
pub use token::TokenVerifier;

#[cfg(test)]
pub(crate) use token::test_support;
