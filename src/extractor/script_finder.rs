//! `<script src>` 资源处理器查找
//! 对 HTML 做一次 html5ever 分词，返回第一个命中资源处理器规则的 script-src
//! 命中后立即暂停分词，剩余文档不再处理

use std::cell::{Cell, RefCell};

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::interface::TokenizerResult;
use tendril::StrTendril;
use tracing::debug;

use crate::rule::Matcher;

/// 分词回调：逐个检查 script 起始标签的 src 属性
pub struct ScriptSourceFinder<'a> {
    handlers: &'a [Matcher],
    matched: RefCell<Option<String>>,
    scripts_seen: Cell<usize>,
}

impl TokenSink for ScriptSourceFinder<'_> {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        else {
            return TokenSinkResult::Continue;
        };
        if name.as_ref() != "script" {
            return TokenSinkResult::Continue;
        }
        self.scripts_seen.set(self.scripts_seen.get() + 1);

        let src = attrs
            .iter()
            .find(|a| a.name.local.as_ref() == "src")
            .map(|a| a.value.trim())
            .filter(|src| !src.is_empty());

        if let Some(src) = src {
            if self.handlers.iter().any(|m| m.is_match(src)) {
                *self.matched.borrow_mut() = Some(src.to_string());
                // 借用 Script 结果让 feed 提前返回
                return TokenSinkResult::Script(());
            }
        }
        // 脚本内容按 script data 处理，避免把字符串里的 "<script" 当成标签
        TokenSinkResult::RawData(RawKind::ScriptData)
    }
}

impl<'a> ScriptSourceFinder<'a> {
    pub fn new(handlers: &'a [Matcher]) -> Self {
        Self {
            handlers,
            matched: RefCell::new(None),
            scripts_seen: Cell::new(0),
        }
    }

    /// 返回第一个命中的 script-src（已做实体解码与首尾空白裁剪）
    pub fn find(self, html: &str) -> Option<String> {
        if self.handlers.is_empty() {
            return None;
        }

        let tokenizer = Tokenizer::new(self, TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        if let TokenizerResult::Done = tokenizer.feed(&queue) {
            tokenizer.end();
        }

        let sink = tokenizer.sink;
        debug!(
            "[ScriptScan] 扫描 script 标签 {} 个 | 命中: {:?}",
            sink.scripts_seen.get(),
            sink.matched.borrow()
        );
        sink.matched.into_inner()
    }
}
