pub mod error;
pub mod types;

#[cfg(feature = "payment")]
pub mod payment;

#[cfg(feature = "quotes")]
pub mod quotes;

#[cfg(feature = "quotes")]
pub mod settings;

pub use error::LeaseQuoteError;
pub use types::*;

/// Standard result type for all lease-quote operations
pub type LeaseQuoteResult<T> = Result<T, LeaseQuoteError>;
