mod client;
mod endpoint;

pub use client::RemoteEnvironment;
pub use endpoint::{EndpointId, HostedResolver, Resolver, StaticResolver};
