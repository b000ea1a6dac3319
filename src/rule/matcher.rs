//! 匹配器模型
//! 字符串匹配统一忽略 ASCII 大小写，正则匹配由表达式自身决定

use regex::Regex;

#[derive(Debug, Clone)]
pub enum Matcher {
    Contains(String), // 包含匹配（忽略大小写）
    EndsWith(String), // 后缀匹配（忽略大小写）
    Regex(Regex),     // 正则匹配
}

impl Matcher {
    pub fn contains(needle: &str) -> Self {
        Matcher::Contains(needle.to_ascii_lowercase())
    }

    pub fn ends_with(needle: &str) -> Self {
        Matcher::EndsWith(needle.to_ascii_lowercase())
    }

    /// 简单匹配判断
    pub fn is_match(&self, input: &str) -> bool {
        self.find(input).is_some()
    }

    /// 返回命中的原始片段，用于证据的 matched_value
    pub fn find<'a>(&self, input: &'a str) -> Option<&'a str> {
        match self {
            Matcher::Contains(s) => {
                find_ignore_ascii_case(input, s).map(|start| &input[start..start + s.len()])
            }
            Matcher::EndsWith(s) => {
                let start = input.len().checked_sub(s.len())?;
                let tail = input.get(start..)?;
                tail.eq_ignore_ascii_case(s).then_some(tail)
            }
            Matcher::Regex(regex) => regex.find(input).map(|m| m.as_str()),
        }
    }
}

/// 忽略 ASCII 大小写的子串查找，needle 需已转小写
/// 返回的偏移量总是落在 UTF-8 字符边界上（needle 为 ASCII 时）
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() {
        return Some(0);
    }
    if pat.len() > hay.len() {
        return None;
    }
    hay.windows(pat.len())
        .position(|w| w.iter().zip(pat).all(|(a, b)| a.to_ascii_lowercase() == *b))
}
