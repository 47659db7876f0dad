pub mod code_registry;
pub mod lead;
pub mod profile;
pub mod short_link;
pub mod tracking_code;
pub mod vanity_slug;

pub use code_registry::Entity as CodeRegistryEntity;
pub use lead::Entity as LeadEntity;
pub use profile::Entity as ProfileEntity;
pub use short_link::Entity as ShortLinkEntity;
pub use tracking_code::Entity as TrackingCodeEntity;
pub use vanity_slug::Entity as VanitySlugEntity;
