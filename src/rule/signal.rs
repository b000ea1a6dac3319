//! 信号目录：所有检测信号及其默认权重
//! 目录构建完成后只读，通过 Arc 在并发扫描间共享

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::matcher::Matcher;

/// 检测信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    HeaderVersionMarker,
    HeaderPoweredBy,
    HeaderServer,
    CookieCoreRuntime,
    CookieLegacyRuntime,
    HtmlStateMarker,
    HtmlViewTemplate,
    HtmlDirectivePattern,
    HtmlResourceHandler,
    FinalUrlExtension,
    EnrichmentTechProfile,
    EnrichmentContent,
}

impl Signal {
    pub const ALL: [Signal; 12] = [
        Signal::HeaderVersionMarker,
        Signal::HeaderPoweredBy,
        Signal::HeaderServer,
        Signal::CookieCoreRuntime,
        Signal::CookieLegacyRuntime,
        Signal::HtmlStateMarker,
        Signal::HtmlViewTemplate,
        Signal::HtmlDirectivePattern,
        Signal::HtmlResourceHandler,
        Signal::FinalUrlExtension,
        Signal::EnrichmentTechProfile,
        Signal::EnrichmentContent,
    ];

    /// 默认权重表
    pub const fn default_weight(self) -> i32 {
        match self {
            Signal::HeaderVersionMarker => 4,
            Signal::HeaderPoweredBy => 3,
            Signal::HeaderServer => 2,
            Signal::CookieCoreRuntime => 3,
            Signal::CookieLegacyRuntime => 3,
            Signal::HtmlStateMarker => 4,
            Signal::HtmlViewTemplate => 2,
            Signal::HtmlDirectivePattern => 3,
            Signal::HtmlResourceHandler => 2,
            Signal::FinalUrlExtension => 2,
            Signal::EnrichmentTechProfile => 3,
            Signal::EnrichmentContent => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Signal::HeaderVersionMarker => "header_version_marker",
            Signal::HeaderPoweredBy => "header_powered_by",
            Signal::HeaderServer => "header_server",
            Signal::CookieCoreRuntime => "cookie_core_runtime",
            Signal::CookieLegacyRuntime => "cookie_legacy_runtime",
            Signal::HtmlStateMarker => "html_state_marker",
            Signal::HtmlViewTemplate => "html_view_template",
            Signal::HtmlDirectivePattern => "html_directive_pattern",
            Signal::HtmlResourceHandler => "html_resource_handler",
            Signal::FinalUrlExtension => "final_url_extension",
            Signal::EnrichmentTechProfile => "enrichment_tech_profile",
            Signal::EnrichmentContent => "enrichment_content",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ASP.NET 指纹规则（编译后）
#[derive(Debug)]
pub struct AspNetRules {
    /// 版本标记头，按顺序取第一个存在的
    pub version_headers: &'static [&'static str],
    pub powered_by: Matcher,
    pub server: Vec<Matcher>,
    pub core_cookie: Matcher,
    pub legacy_cookie: Matcher,
    pub state_marker: Matcher,
    pub view_template: Matcher,
    pub directive: Matcher,
    pub resource_handlers: Vec<Matcher>,
    pub page_extension: Matcher,
}

static ASPNET_RULES: Lazy<AspNetRules> = Lazy::new(|| AspNetRules {
    version_headers: &["x-aspnet-version", "x-aspnetmvc-version"],
    powered_by: Matcher::contains("asp.net"),
    server: vec![Matcher::contains("microsoft-iis"), Matcher::contains("kestrel")],
    core_cookie: Matcher::Regex(Regex::new(r"(?i)^\s*\.AspNetCore\.[^=;,\s]*=").unwrap()),
    legacy_cookie: Matcher::Regex(
        Regex::new(
            r"(?i)^\s*(?:ASP\.NET_SessionId|\.ASPXAUTH|\.ASPXANONYMOUS|__RequestVerificationToken[^=;,\s]*)=",
        )
        .unwrap(),
    ),
    state_marker: Matcher::contains("__VIEWSTATE"),
    view_template: Matcher::contains(".cshtml"),
    directive: Matcher::Regex(
        Regex::new(
            r"(?i)<%@\s*(?:page|control|master|import|register)\b|@(?:model|inject|addTagHelper)\s+[A-Za-z_*]",
        )
        .unwrap(),
    ),
    resource_handlers: vec![
        Matcher::contains("webresource.axd"),
        Matcher::contains("scriptresource.axd"),
    ],
    page_extension: Matcher::ends_with(".aspx"),
});

/// 信号目录：权重表 + 编译后规则
#[derive(Debug, Clone)]
pub struct SignalCatalog {
    weights: HashMap<Signal, i32>,
    rules: &'static AspNetRules,
}

impl Default for SignalCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalCatalog {
    /// 使用默认权重表创建目录
    pub fn new() -> Self {
        Self {
            weights: Signal::ALL
                .iter()
                .map(|signal| (*signal, signal.default_weight()))
                .collect(),
            rules: Lazy::force(&ASPNET_RULES),
        }
    }

    /// 覆盖单个信号的权重
    pub fn with_weight(mut self, signal: Signal, weight: i32) -> Self {
        self.weights.insert(signal, weight);
        self
    }

    pub fn weight(&self, signal: Signal) -> i32 {
        self.weights
            .get(&signal)
            .copied()
            .unwrap_or_else(|| signal.default_weight())
    }

    pub fn rules(&self) -> &'static AspNetRules {
        self.rules
    }
}
