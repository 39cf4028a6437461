//! Credential derivation: username, initial password, hash.

use std::collections::BTreeMap;
use std::fmt;

use roll_core::{Identifier, PersonType, RecordStore, RollConfigSnapshot, RollError, RollResult};
use tracing::debug;

use crate::hasher::PasswordHasher;
use crate::password::{self, PasswordMode, MIN_RANDOM_LENGTH};
use crate::username;

#[derive(Clone, Debug)]
pub struct CredentialConfig {
    pub max_username_len: usize,
    /// Highest numeric suffix tried when a username is taken.
    pub max_username_suffix: u32,
    pub password_length: usize,
    pub suffix_bytes: usize,
    pub suffix_delimiter: char,
    /// Keep a plaintext copy on the credentials for admin reset screens.
    pub keep_display_copy: bool,
    pub modes: BTreeMap<PersonType, PasswordMode>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        let modes = PersonType::ALL
            .into_iter()
            .map(|t| {
                let mode = match t {
                    PersonType::Student | PersonType::Parent => PasswordMode::RandomSecure,
                    _ => PasswordMode::IdentifierSuffixed,
                };
                (t, mode)
            })
            .collect();

        Self {
            max_username_len: 30,
            max_username_suffix: 20,
            password_length: 8,
            suffix_bytes: 3,
            suffix_delimiter: '@',
            keep_display_copy: false,
            modes,
        }
    }
}

impl CredentialConfig {
    pub fn with_password_length(mut self, length: usize) -> Self {
        self.password_length = length;
        self
    }

    pub fn with_max_username_suffix(mut self, cap: u32) -> Self {
        self.max_username_suffix = cap;
        self
    }

    pub fn with_mode(mut self, person_type: PersonType, mode: PasswordMode) -> Self {
        self.modes.insert(person_type, mode);
        self
    }

    pub fn keep_display_copy(mut self) -> Self {
        self.keep_display_copy = true;
        self
    }

    pub fn mode_for(&self, person_type: PersonType) -> PasswordMode {
        self.modes
            .get(&person_type)
            .copied()
            .unwrap_or(PasswordMode::RandomSecure)
    }

    pub fn from_snapshot(snapshot: &RollConfigSnapshot) -> RollResult<Self> {
        let mut config = Self::default();

        if let Some(v) = snapshot.get_usize("credentials.max_username_len")? {
            config.max_username_len = v;
        }
        if let Some(v) = snapshot.get_u32("credentials.max_username_suffix")? {
            config.max_username_suffix = v;
        }
        if let Some(v) = snapshot.get_usize("credentials.password_length")? {
            config.password_length = v;
        }
        if let Some(v) = snapshot.get_usize("credentials.suffix_bytes")? {
            config.suffix_bytes = v;
        }
        if let Some(v) = snapshot.get("credentials.suffix_delimiter") {
            let mut chars = v.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => config.suffix_delimiter = c,
                _ => {
                    return Err(RollError::invalid_config(
                        "credentials.suffix_delimiter",
                        "must be a single character",
                    ))
                }
            }
        }
        if let Some(v) = snapshot.get_bool("credentials.keep_display_copy")? {
            config.keep_display_copy = v;
        }
        for t in PersonType::ALL {
            let key = format!("credentials.mode.{}", t.name());
            if let Some(raw) = snapshot.get(&key) {
                let mode = PasswordMode::parse(raw).ok_or_else(|| {
                    RollError::invalid_config(&key, format!("unknown password mode '{raw}'"))
                })?;
                config.modes.insert(t, mode);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RollResult<()> {
        let longest_prefix = PersonType::ALL
            .iter()
            .map(|t| t.role_prefix().len())
            .max()
            .unwrap_or_default();

        if self.max_username_len <= longest_prefix {
            return Err(RollError::invalid_config(
                "credentials.max_username_len",
                "must leave room after the role prefix",
            ));
        }
        if self.password_length < MIN_RANDOM_LENGTH {
            return Err(RollError::invalid_config(
                "credentials.password_length",
                format!("must be at least {MIN_RANDOM_LENGTH}"),
            ));
        }
        if self.suffix_bytes == 0 {
            return Err(RollError::invalid_config(
                "credentials.suffix_bytes",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Finished credentials for a new or reset record.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    /// Shown once to the caller, never persisted by the allocator.
    pub plaintext_password: String,
    pub hashed_password: String,
    pub must_change_password: bool,
    pub display_password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("plaintext_password", &"<redacted>")
            .field("hashed_password", &self.hashed_password)
            .field("must_change_password", &self.must_change_password)
            .field("display_password", &self.display_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Turns a finalized identifier into a login name and an initial secret.
#[derive(Clone, Debug, Default)]
pub struct CredentialDeriver {
    config: CredentialConfig,
    hasher: PasswordHasher,
}

impl CredentialDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CredentialConfig, hasher: PasswordHasher) -> RollResult<Self> {
        config.validate()?;
        Ok(Self { config, hasher })
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Deterministic username before any disambiguation.
    pub fn username_for(&self, identifier: &Identifier, person_type: PersonType) -> String {
        username::username_for(identifier, person_type.role_prefix(), self.config.max_username_len)
    }

    /// Derived username, suffixed until the store reports it free.
    pub async fn claim_username<S>(
        &self,
        store: &S,
        identifier: &Identifier,
        person_type: PersonType,
    ) -> RollResult<String>
    where
        S: RecordStore + ?Sized,
    {
        let base = self.username_for(identifier, person_type);
        username::claim(
            store,
            &base,
            person_type.role_prefix().len(),
            self.config.max_username_len,
            self.config.max_username_suffix,
        )
        .await
    }

    pub fn password_for(&self, identifier: &Identifier, mode: PasswordMode) -> RollResult<String> {
        match mode {
            PasswordMode::RandomSecure => {
                password::random_secure(&mut rand::thread_rng(), self.config.password_length)
            }
            PasswordMode::IdentifierSuffixed => Ok(password::identifier_suffixed(
                identifier,
                self.config.suffix_delimiter,
                self.config.suffix_bytes,
            )),
        }
    }

    /// Mint and hash an initial password for an already claimed username.
    pub async fn issue(
        &self,
        identifier: &Identifier,
        person_type: PersonType,
        username: String,
    ) -> RollResult<Credentials> {
        let mode = self.config.mode_for(person_type);
        let plaintext = self.password_for(identifier, mode)?;
        let hashed = self.hasher.hash_password(&plaintext).await?;

        debug!(%identifier, ?mode, "issued initial credentials");

        Ok(Credentials {
            username,
            display_password: self.config.keep_display_copy.then(|| plaintext.clone()),
            plaintext_password: plaintext,
            hashed_password: hashed,
            must_change_password: true,
        })
    }

    /// Regenerate the password of an existing record; identifier and
    /// username are kept as they are.
    pub async fn reset(
        &self,
        identifier: &Identifier,
        person_type: PersonType,
        username: &str,
    ) -> RollResult<Credentials> {
        self.issue(identifier, person_type, username.to_string()).await
    }
}
