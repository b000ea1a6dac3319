//! 提取模块：响应快照与 script-src 查找
pub mod artifact_extractor;
pub mod script_finder;

pub use self::artifact_extractor::ArtifactExtractor;
pub use self::script_finder::ScriptSourceFinder;
