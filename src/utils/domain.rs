//! 域名校验与标准化工具

use std::collections::HashSet;

use url::Url;

use crate::error::{AspNetError, AspResult};

/// 扫描前的域名校验：去除首尾空白后不能为空，必须包含 '.'，且能组成合法的请求 URL
pub fn validate_domain(domain: &str) -> AspResult<&str> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(AspNetError::InvalidInput("域名为空".to_string()));
    }
    if !trimmed.contains('.') {
        return Err(AspNetError::InvalidInput(format!(
            "域名缺少 '.'：{}",
            trimmed
        )));
    }
    Url::parse(&format!("http://{}/", trimmed))?;
    Ok(trimmed)
}

/// 标准化单个域名：去掉协议前缀、前导点、路径/查询部分，并转小写
/// 标准化后为空则返回 None
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut value = raw.trim();

    if let Some(pos) = value.find("://") {
        value = &value[pos + 3..];
    }
    if let Some(end) = value.find(['/', '?', '#']) {
        value = &value[..end];
    }
    let value = value.trim_start_matches('.').trim_end_matches('.').trim();

    (!value.is_empty()).then(|| value.to_ascii_lowercase())
}

/// 批量标准化并去重（大小写不敏感），保持首次出现的顺序
pub fn normalize_domains<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|d| normalize_domain(d.as_ref()))
        .filter(|d| seen.insert(d.clone()))
        .collect()
}
