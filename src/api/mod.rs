//! HTTP surface: identity verification, middleware and route handlers.

pub mod jwt;
pub mod middleware;
pub mod services;
