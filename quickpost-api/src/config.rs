use quickpost_common::model::auth::{InvalidTokenLifetimeError, TokenLifetime};
use serde::Deserialize;
use std::{
    fmt::{Debug, Formatter},
    net::{IpAddr, Ipv4Addr},
};

/// Used when `JWT_SECRET` is unset. Only fit for local demos.
pub const DEMO_JWT_SECRET: &str = "quickpost-demo-secret-change-me";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// Internal error details are included in responses.
    #[default]
    Development,
    Production,
}

#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(transparent)]
pub struct JwtSecret(String);

impl JwtSecret {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn is_demo_secret(&self) -> bool {
        self.0 == DEMO_JWT_SECRET
    }
}

impl Default for JwtSecret {
    fn default() -> Self {
        Self(DEMO_JWT_SECRET.to_owned())
    }
}

impl Debug for JwtSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(<redacted>)")
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    #[serde(default = "default_server_address")]
    pub server_address: IpAddr,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub jwt_secret: JwtSecret,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,
    #[serde(default)]
    pub app_env: AppMode,
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_server_port() -> u16 {
    4000
}

fn default_token_ttl_hours() -> u32 {
    24
}

fn default_seed_demo_data() -> bool {
    true
}

impl Env {
    pub fn token_lifetime(&self) -> Result<TokenLifetime, InvalidTokenLifetimeError> {
        TokenLifetime::from_hours(self.token_ttl_hours)
    }
}
