//! Authentication schemes, credentials, and the resolver that validates them.

pub mod credentials;
pub mod scheme;
pub mod secret;

pub use credentials::*;
pub use scheme::*;
pub use secret::*;
