//! Configuration module

mod site;

pub use site::BuildConfig;
pub use site::CompilerConfig;
pub use site::SiteConfig;
pub use site::SiteMetadata;
