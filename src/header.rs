//! 内容头参数解析与原始头部容器。
//!
//! `Content-Type`、`Content-Disposition` 这类头部的值由一个主值和若干
//! `; key=value` 参数组成。`parse_content_header` 把它们拆成 [`ContentHeader`]，
//! 结果只取决于输入字符串，因此放在进程级 LRU 缓存里复用。

use crate::{
    cache::ParseCache,
    param::{CONTENT_PARAM, PARSER_CACHE_CAPACITY, QUOTE_PLACEHOLDER},
    parsers::decode_latin1,
};

use lazy_static::lazy_static;
use log::debug;

lazy_static! {
    static ref CONTENT_HEADER_CACHE: ParseCache<String, ContentHeader> =
        ParseCache::from_capacity(PARSER_CACHE_CAPACITY);
}

/// 解析后的内容头：小写的主值和按出现顺序排列的参数。
///
/// 参数名统一转成小写；同名参数后出现的覆盖先出现的，但保留第一次出现的位置。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentHeader {
    value: String,
    params: Vec<(String, String)>,
}

impl ContentHeader {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// 按（小写）参数名查询参数值
    pub fn param(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set_param(&mut self, key: String, value: String) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }
}

/// 解析 `Content-Type` / `Content-Disposition` 一类的头部值。
///
/// 格式不完整的参数片段会被直接跳过，不会报错。
pub fn parse_content_header(raw: &str) -> ContentHeader {
    CONTENT_HEADER_CACHE.get_or_insert_with(raw.to_string(), || parse_uncached(raw))
}

fn parse_uncached(raw: &str) -> ContentHeader {
    let value = restore_misescaped_quotes(raw);
    let mut header = ContentHeader::default();

    let main = match value.find(';') {
        Some(position) => {
            let tail = &value[position..];
            let mut matched = 0;
            for caps in CONTENT_PARAM.captures_iter(tail) {
                matched += 1;
                let key = caps[1].to_ascii_lowercase();
                let param = match (caps.get(2), caps.get(3)) {
                    (Some(token), _) => token.as_str().to_string(),
                    (None, Some(quoted)) => quoted.as_str().replace(QUOTE_PLACEHOLDER, "\""),
                    (None, None) => continue,
                };
                header.set_param(key, param);
            }
            if matched == 0 && !tail.trim_start_matches(';').trim().is_empty() {
                debug!("内容头参数无法解析，已忽略：{}", tail);
            }
            &value[..position]
        }
        None => value.as_str(),
    };
    header.value = main.trim().to_lowercase();
    header
}

/// 把不符合规范的 `\"` 转义替换为占位符。
///
/// 部分浏览器会在带引号的参数里写出 `\"`，
/// 只有当它后面紧跟 `; ` 或者位于行尾时才是真正的结束引号。
fn restore_misescaped_quotes(raw: &str) -> String {
    if !raw.contains("\\\"") {
        return raw.to_string();
    }
    let mut output = String::with_capacity(raw.len() + 8);
    let mut rest = raw;
    while let Some(index) = rest.find("\\\"") {
        let after = &rest[index + 2..];
        output.push_str(&rest[..index]);
        if after.starts_with("; ") || after.trim().is_empty() {
            output.push_str("\\\"");
        } else {
            output.push_str(QUOTE_PLACEHOLDER);
        }
        rest = after;
    }
    output.push_str(rest);
    output
}

/// 原始头部列表，保持顺序，字段名大小写不敏感。
///
/// 字段名以小写字节保存，值按 latin-1 解码为字符串。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    raw: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 ASGI scope 的原始字节对构建
    pub fn from_raw(raw: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        let raw = raw
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self { raw }
    }

    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Self {
        let raw = pairs
            .iter()
            .map(|(k, v)| {
                (
                    k.as_ref().to_ascii_lowercase().into_bytes(),
                    v.as_ref().as_bytes().to_vec(),
                )
            })
            .collect();
        Self { raw }
    }

    pub fn raw(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.raw
    }

    pub fn append(&mut self, key: &str, value: &str) {
        self.raw.push((
            key.to_ascii_lowercase().into_bytes(),
            value.as_bytes().to_vec(),
        ));
    }

    /// 第一个同名头部的值
    pub fn get(&self, key: &str) -> Option<String> {
        let key = key.to_ascii_lowercase();
        self.raw
            .iter()
            .find(|(k, _)| k.as_slice() == key.as_bytes())
            .map(|(_, v)| decode_latin1(v))
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        let key = key.to_ascii_lowercase();
        self.raw
            .iter()
            .filter(|(k, _)| k.as_slice() == key.as_bytes())
            .map(|(_, v)| decode_latin1(v))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.raw.iter().any(|(k, _)| k.as_slice() == key.as_bytes())
    }

    pub fn keys(&self) -> Vec<String> {
        self.raw.iter().map(|(k, _)| decode_latin1(k)).collect()
    }

    pub fn items(&self) -> Vec<(String, String)> {
        self.raw
            .iter()
            .map(|(k, v)| (decode_latin1(k), decode_latin1(v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
