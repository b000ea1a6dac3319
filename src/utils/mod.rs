//! 通用工具模块
pub mod domain;
pub mod header_converter;
pub mod version_extractor;

pub use self::domain::{normalize_domain, normalize_domains, validate_domain};
pub use self::header_converter::HeaderConverter;
pub use self::version_extractor::VersionExtractor;
