//! roll-auth: login names, initial passwords and password hashing for
//! newly allocated identifiers.

pub mod credentials;
pub mod hasher;
pub mod password;
pub mod username;

pub use credentials::{CredentialConfig, CredentialDeriver, Credentials};
pub use hasher::{HasherConfig, PasswordHasher};
pub use password::PasswordMode;
