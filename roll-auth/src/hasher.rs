//! Password hashing.

use bcrypt::{hash, verify};
use roll_core::{RollConfigSnapshot, RollError, RollResult};

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

#[derive(Clone, Debug)]
pub struct HasherConfig {
    /// bcrypt work factor.
    pub cost: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self { cost: 12 }
    }
}

impl HasherConfig {
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn from_snapshot(snapshot: &RollConfigSnapshot) -> RollResult<Self> {
        let mut config = Self::default();
        if let Some(cost) = snapshot.get_u32("hasher.cost")? {
            config.cost = cost;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RollResult<()> {
        if !(MIN_COST..=MAX_COST).contains(&self.cost) {
            return Err(RollError::invalid_config(
                "hasher.cost",
                format!("bcrypt cost must be within {MIN_COST}..={MAX_COST}"),
            ));
        }
        Ok(())
    }
}

/// Salted, adaptive one-way hashing of initial passwords.
///
/// Failures are fatal; there is no weaker fallback scheme.
#[derive(Clone, Debug, Default)]
pub struct PasswordHasher {
    config: HasherConfig,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HasherConfig) -> RollResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn cost(&self) -> u32 {
        self.config.cost
    }

    /// Hash on the blocking pool; bcrypt at cost 12 takes hundreds of ms.
    pub async fn hash_password(&self, password: &str) -> RollResult<String> {
        let password = password.to_owned();
        let cost = self.config.cost;

        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(RollError::hashing)?
            .map_err(RollError::hashing)
    }

    pub async fn verify(&self, password: &str, hashed: &str) -> RollResult<bool> {
        let password = password.to_owned();
        let hashed = hashed.to_owned();

        tokio::task::spawn_blocking(move || verify(password, &hashed))
            .await
            .map_err(RollError::hashing)?
            .map_err(RollError::hashing)
    }
}
