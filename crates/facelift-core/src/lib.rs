//! Core types and configuration shared across Facelift crates.
//!
//! This crate holds the pieces that both the HTTP layer and the image pipeline
//! need to agree on: the server configuration loaded from the environment, and
//! the enhancement gateway boundary (the trait the HTTP handlers call and the
//! value types that cross it).

pub mod config;
pub mod gateway;

pub use config::ServerConfig;
pub use gateway::{
    EnhanceMode, EnhanceParams, EnhancedImage, EnhancementGateway, GatewayError, StageTiming,
};
