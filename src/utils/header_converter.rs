//! Header格式转换工具
//! 负责 Header 扁平化与 Set-Cookie 拆分

use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::warn;

/// 单个响应最多处理的 Header 条目数
const MAX_HEADER_ENTRIES: usize = 1000;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap扁平化为小写键的单值HashMap，同名Header后写覆盖
    pub fn flatten(header_map: &HeaderMap) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(header_map.keys_len());

        for (iter_count, (key, value)) in header_map.iter().enumerate() {
            if iter_count >= MAX_HEADER_ENTRIES {
                warn!("Header迭代超过{}次，强制终止", MAX_HEADER_ENTRIES);
                break;
            }

            let value_str = String::from_utf8_lossy(value.as_bytes()).into_owned();
            // HeaderName 本身已是小写
            map.insert(key.as_str().to_string(), value_str);
        }

        map
    }

    /// 读取所有 Set-Cookie 并拆分为独立的 Cookie 串
    pub fn cookies(header_map: &HeaderMap) -> Vec<String> {
        header_map
            .get_all(SET_COOKIE)
            .iter()
            .flat_map(|value| Self::split_set_cookie(&String::from_utf8_lossy(value.as_bytes())))
            .collect()
    }

    /// 按逗号拆分合并后的 Set-Cookie 值
    /// 引号内的逗号不拆分；`Expires=` 属性值（HTTP 日期）中的逗号也不拆分
    /// 引号未闭合时按普通字符处理，避免后续 Cookie 被整段吞掉
    pub fn split_set_cookie(raw: &str) -> Vec<String> {
        Self::split_with_quotes(raw, true)
            .unwrap_or_else(|| Self::split_with_quotes(raw, false).unwrap_or_default())
    }

    /// 引号在结尾仍未闭合时返回 None
    fn split_with_quotes(raw: &str, honor_quotes: bool) -> Option<Vec<String>> {
        let mut cookies = Vec::new();
        let mut in_quotes = false;
        let mut start = 0;
        // 当前属性（上一个 ';' 或拆分点之后）的起始位置
        let mut attr_start = 0;

        for (idx, ch) in raw.char_indices() {
            match ch {
                '"' if honor_quotes => in_quotes = !in_quotes,
                ';' if !in_quotes => attr_start = idx + 1,
                ',' if !in_quotes && !Self::is_expires_attr(&raw[attr_start..idx]) => {
                    Self::push_trimmed(&mut cookies, &raw[start..idx]);
                    start = idx + 1;
                    attr_start = idx + 1;
                }
                _ => {}
            }
        }
        if in_quotes {
            return None;
        }
        Self::push_trimmed(&mut cookies, &raw[start..]);

        Some(cookies)
    }

    /// HTTP 日期只含一个逗号（星期之后），已出现过逗号的 Expires 值不再保护
    fn is_expires_attr(attr: &str) -> bool {
        let attr = attr.trim_start();
        attr.get(..8)
            .is_some_and(|name| name.eq_ignore_ascii_case("expires="))
            && !attr.contains(',')
    }

    fn push_trimmed(cookies: &mut Vec<String>, segment: &str) {
        let segment = segment.trim();
        if !segment.is_empty() {
            cookies.push(segment.to_string());
        }
    }
}
