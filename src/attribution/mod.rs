//! Attribution: signed cookie payload and the precedence resolver.

pub mod cookie;
pub mod payload;
pub mod resolver;

pub use cookie::AttributionCookies;
pub use payload::{Attribution, AttributionMethod, AttributionPayload, AttributionResult};
pub use resolver::{
    AttributionResolver, AttributionSource, CookieSource, LeadMatchSource, ResolutionInput,
};
