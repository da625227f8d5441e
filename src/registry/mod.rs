//! Registry module for Docker registry interactions
//!
//! Read-only subset of the Docker Registry HTTP API v2: reference
//! resolution, the anonymous bearer token handshake, paginated tag listing
//! and header-only manifest digest lookup.

pub mod auth;
pub mod client;
pub mod manifest;
pub mod reference;
pub mod tags;

pub use auth::{AuthManager, AuthToken, BearerChallenge};
pub use client::{RegistryClient, RegistryClientBuilder};
pub use manifest::{MANIFEST_MEDIA_TYPES, manifest_accept_header};
pub use reference::{DOCKER_HUB_REGISTRY, ImageReference, resolve};
pub use tags::{TagPage, parse_link_header};
