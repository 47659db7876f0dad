pub mod backend;
pub mod models;
pub mod traits;

pub use backend::{SeaOrmStorage, infer_backend_from_url};
pub use models::{
    CodeClaim, CodeKind, CodeState, LeadRecord, Profile, ReferrerType, Role, ShortLink,
    TrackingCodeRecord, VanitySlug, WriteOutcome,
};
pub use traits::{
    CodeRegistry, LeadDirectory, ProfileDirectory, ShortLinkStore, TrackingCodeStore,
    VanitySlugStore,
};
