use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::transport::DEFAULT_PORT;

/// `owner/name` identifier of a hosted environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointId {
    owner: String,
    name: String,
}

impl EndpointId {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for EndpointId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidEndpoint(format!("expected 'owner/name', got '{s}'"));
        let (owner, name) = s.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Maps an endpoint id to a network address the connector understands.
pub trait Resolver: Send + Sync {
    fn resolve(&self, endpoint: &EndpointId) -> Result<String>;
}

/// Hosted-space naming: `owner/name` → `{owner}-{name}.{domain}:{port}`,
/// lowercased, with `_` and `.` folded to `-` as host labels require.
///
/// The port defaults to the one envhub servers listen on, since the
/// address is dialed with the plain framed protocol.
#[derive(Debug, Clone)]
pub struct HostedResolver {
    pub domain: String,
    pub port: u16,
}

impl Default for HostedResolver {
    fn default() -> Self {
        Self {
            domain: "hf.space".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Resolver for HostedResolver {
    fn resolve(&self, endpoint: &EndpointId) -> Result<String> {
        let label = format!("{}-{}", endpoint.owner(), endpoint.name())
            .to_lowercase()
            .replace(['_', '.'], "-");
        Ok(format!("{label}.{}:{}", self.domain, self.port))
    }
}

/// Fixed table of endpoint ids to addresses.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    routes: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, endpoint_id: impl Into<String>, addr: impl Into<String>) -> Self {
        self.routes.insert(endpoint_id.into(), addr.into());
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, endpoint: &EndpointId) -> Result<String> {
        self.routes
            .get(&endpoint.to_string())
            .cloned()
            .ok_or_else(|| Error::InvalidEndpoint(format!("no route for '{endpoint}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let id: EndpointId = "acme/demo".parse().unwrap();
        assert_eq!(id.owner(), "acme");
        assert_eq!(id.name(), "demo");
        assert_eq!(id.to_string(), "acme/demo");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["acme", "/demo", "acme/", "acme/demo/extra", ""] {
            let err = bad.parse::<EndpointId>().unwrap_err();
            assert!(matches!(err, Error::InvalidEndpoint(_)), "{bad}");
        }
    }

    #[test]
    fn hosted_resolution_is_deterministic() {
        let resolver = HostedResolver::default();
        let id: EndpointId = "Acme/grid_world".parse().unwrap();
        assert_eq!(resolver.resolve(&id).unwrap(), "acme-grid-world.hf.space:7860");
        assert_eq!(resolver.resolve(&id).unwrap(), resolver.resolve(&id).unwrap());
    }

    #[test]
    fn hosted_default_dials_the_server_default_port() {
        let addr = HostedResolver::default()
            .resolve(&"acme/demo".parse().unwrap())
            .unwrap();
        let served = crate::transport::ServerConfig::default().bind_addr;
        let port = |a: &str| a.rsplit_once(':').map(|(_, p)| p.to_string());
        assert_eq!(port(&addr), port(&served));
    }

    #[test]
    fn static_routes() {
        let resolver = StaticResolver::new().route("acme/demo", "127.0.0.1:9000");
        let known: EndpointId = "acme/demo".parse().unwrap();
        let unknown: EndpointId = "acme/other".parse().unwrap();
        assert_eq!(resolver.resolve(&known).unwrap(), "127.0.0.1:9000");
        assert!(matches!(
            resolver.resolve(&unknown),
            Err(Error::InvalidEndpoint(_))
        ));
    }
}
