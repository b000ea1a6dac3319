//! 检测分析器：负责Header/Cookie/HTML/URL各维度的信号匹配
//! 分析器只追加证据，不做任何 I/O

use tracing::debug;

use crate::extractor::ScriptSourceFinder;
use crate::rule::{ArtifactSnapshot, Evidence, Signal, SignalCatalog};

/// 所有分析器的通用抽象
pub trait Analyzer {
    /// 分析器类型名称，用于日志标准化输出 (如URL/Header/Cookie)
    const TYPE_NAME: &'static str;

    /// 对快照执行匹配，命中的证据按顺序追加到 `evidence`
    fn analyze(catalog: &SignalCatalog, snapshot: &ArtifactSnapshot, evidence: &mut Vec<Evidence>);
}

/// 匹配成功通用处理器 - 标准日志输出+证据追加
#[inline(always)]
fn handle_match_success(
    analyzer_type: &str,
    catalog: &SignalCatalog,
    signal: Signal,
    description: String,
    matched_value: &str,
    evidence: &mut Vec<Evidence>,
) {
    let weight = catalog.weight(signal);
    debug!(
        "[{}]匹配成功 | 信号: {} | 内容: {} | 权重: {}",
        analyzer_type, signal, matched_value, weight
    );
    evidence.push(Evidence::new(signal, description, matched_value, weight));
}

/// Header分析器
pub struct HeaderAnalyzer;

impl Analyzer for HeaderAnalyzer {
    const TYPE_NAME: &'static str = "Header";

    fn analyze(catalog: &SignalCatalog, snapshot: &ArtifactSnapshot, evidence: &mut Vec<Evidence>) {
        let rules = catalog.rules();

        // 版本标记头：取第一个存在的
        if let Some((name, value)) = rules
            .version_headers
            .iter()
            .find_map(|name| snapshot.header(name).map(|value| (*name, value)))
        {
            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                Signal::HeaderVersionMarker,
                format!("Version marker header `{}` present", name),
                value,
                evidence,
            );
        }

        if let Some(value) = snapshot.header("x-powered-by") {
            if rules.powered_by.is_match(value) {
                handle_match_success(
                    Self::TYPE_NAME,
                    catalog,
                    Signal::HeaderPoweredBy,
                    "X-Powered-By mentions ASP.NET".to_string(),
                    value,
                    evidence,
                );
            }
        }

        if let Some(value) = snapshot.server_header() {
            if rules.server.iter().any(|m| m.is_match(value)) {
                handle_match_success(
                    Self::TYPE_NAME,
                    catalog,
                    Signal::HeaderServer,
                    "Server header names a .NET host".to_string(),
                    value,
                    evidence,
                );
            }
        }
    }
}

/// Cookie分析器
/// 每个 Cookie 串最多命中一个类别，先判断 ASP.NET Core
pub struct CookieAnalyzer;

impl Analyzer for CookieAnalyzer {
    const TYPE_NAME: &'static str = "Cookie";

    fn analyze(catalog: &SignalCatalog, snapshot: &ArtifactSnapshot, evidence: &mut Vec<Evidence>) {
        let rules = catalog.rules();

        for cookie in &snapshot.cookies {
            let (signal, description) = if rules.core_cookie.is_match(cookie) {
                (Signal::CookieCoreRuntime, "ASP.NET Core cookie")
            } else if rules.legacy_cookie.is_match(cookie) {
                (Signal::CookieLegacyRuntime, "ASP.NET session/auth cookie")
            } else {
                continue;
            };

            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                signal,
                description.to_string(),
                cookie_name(cookie),
                evidence,
            );
        }
    }
}

/// Cookie 串中 `=` 之前的名称部分
fn cookie_name(cookie: &str) -> &str {
    cookie
        .split_once('=')
        .map_or(cookie, |(name, _)| name)
        .trim()
}

/// HTML分析器
/// 响应体为空时整体跳过
pub struct HtmlAnalyzer;

impl Analyzer for HtmlAnalyzer {
    const TYPE_NAME: &'static str = "HTML";

    fn analyze(catalog: &SignalCatalog, snapshot: &ArtifactSnapshot, evidence: &mut Vec<Evidence>) {
        let Some(html) = snapshot.body() else {
            return;
        };
        let rules = catalog.rules();

        if let Some(found) = rules.state_marker.find(html) {
            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                Signal::HtmlStateMarker,
                "Web Forms view state marker in HTML".to_string(),
                found,
                evidence,
            );
        }

        if let Some(found) = rules.view_template.find(html) {
            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                Signal::HtmlViewTemplate,
                "Razor view file extension in HTML".to_string(),
                found,
                evidence,
            );
        }

        if let Some(found) = rules.directive.find(html) {
            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                Signal::HtmlDirectivePattern,
                "Template directive syntax in HTML".to_string(),
                found,
                evidence,
            );
        }

        // 脚本资源处理器，仅记录第一个命中的 script-src
        if let Some(src) = ScriptSourceFinder::new(&rules.resource_handlers).find(html) {
            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                Signal::HtmlResourceHandler,
                "Script served by an .axd resource handler".to_string(),
                &src,
                evidence,
            );
        }
    }
}

/// URL分析器
pub struct UrlAnalyzer;

impl Analyzer for UrlAnalyzer {
    const TYPE_NAME: &'static str = "URL";

    fn analyze(catalog: &SignalCatalog, snapshot: &ArtifactSnapshot, evidence: &mut Vec<Evidence>) {
        let Some(url) = &snapshot.final_url else {
            return;
        };

        if catalog.rules().page_extension.is_match(url.path()) {
            handle_match_success(
                Self::TYPE_NAME,
                catalog,
                Signal::FinalUrlExtension,
                "Final URL is a Web Forms page".to_string(),
                url.as_str(),
                evidence,
            );
        }
    }
}
