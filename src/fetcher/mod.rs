//! 抓取模块：带重试、超时与取消的 HTTP 抓取
pub mod fetcher;

pub use self::fetcher::{FetchExhausted, Fetched, ResilientFetcher};
