//! 扫描模块：单域名扫描编排、外部证据来源、批量扫描
pub mod batch;
pub mod enrichment;
pub mod scanner;

pub use self::batch::{BatchReport, BatchScanner};
pub use self::enrichment::EvidenceProvider;
pub use self::scanner::DomainScanner;
