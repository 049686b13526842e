//! 查询字符串、Cookie 与 urlencoded 表单的解析。
//!
//! 这些函数都是输入的纯函数，结果保存在进程级的 LRU 缓存中，
//! 重复出现的头部值（同一个 Cookie、同一个查询串）不会被重复解析。

use std::{borrow::Cow, collections::HashMap};

use crate::{
    cache::ParseCache,
    exception::Exception,
    multidict::{FieldValue, MultiDict},
    param::PARSER_CACHE_CAPACITY,
};

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// `quote_plus` 保留不编码的字符：字母数字以及 `-_.~`
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type Pairs = Vec<(String, String)>;

lazy_static! {
    static ref QUERY_CACHE: ParseCache<String, Pairs> =
        ParseCache::from_capacity(PARSER_CACHE_CAPACITY);
    static ref COOKIE_CACHE: ParseCache<String, HashMap<String, String>> =
        ParseCache::from_capacity(PARSER_CACHE_CAPACITY);
    static ref FORM_CACHE: ParseCache<Vec<u8>, Vec<(String, FieldValue<String>)>> =
        ParseCache::from_capacity(PARSER_CACHE_CAPACITY);
}

/// 按 latin-1 把字节逐个映射成字符，不会失败。
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// 百分号解码，非法的 `%` 序列原样保留，非法 UTF-8 用替换字符代替。
pub fn unquote(value: &str) -> String {
    if value.contains('%') {
        percent_decode_str(value).decode_utf8_lossy().into_owned()
    } else {
        value.to_string()
    }
}

/// 与 [`unquote`] 相同，但先把 `+` 视作空格。
pub fn unquote_plus(value: &str) -> String {
    if value.contains('+') {
        unquote(&value.replace('+', " "))
    } else {
        unquote(value)
    }
}

/// 查询串编码：空格写成 `+`，其余保留字符写成 `%XX`。
pub fn quote_plus(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// 把键值对编码成 `a=1&b=2` 形式的查询串。
pub fn urlencode<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", quote_plus(k.as_ref()), quote_plus(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// 解析查询串为有序键值对。
///
/// 字段以 `&` 分隔；没有 `=` 的字段得到空值；空字段被跳过。
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    QUERY_CACHE.get_or_insert_with(query.to_string(), || split_query(query))
}

/// 原始字节形式的查询串，按 latin-1 解码后再解析。
pub fn parse_query_bytes(query: &[u8]) -> Vec<(String, String)> {
    parse_query_string(&decode_latin1(query))
}

fn split_query(query: &str) -> Pairs {
    query
        .split('&')
        .filter(|field| !field.is_empty())
        .map(|field| match field.split_once('=') {
            Some((key, value)) => (unquote_plus(key), unquote_plus(value)),
            None => (unquote_plus(field), String::new()),
        })
        .collect()
}

/// 解析 `Cookie` 头部。
///
/// 没有 `=` 的片段视作匿名值 `("", segment)`；键和值都去掉两端空白；
/// 键值都为空的片段被丢弃；同名键以最后一次出现为准。
pub fn parse_cookie_string(cookie_string: &str) -> HashMap<String, String> {
    COOKIE_CACHE.get_or_insert_with(cookie_string.to_string(), || {
        let mut cookies = HashMap::new();
        for chunk in cookie_string.split(';') {
            let (key, value) = match chunk.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => ("", chunk.trim()),
            };
            if key.is_empty() && value.is_empty() {
                continue;
            }
            cookies.insert(key.to_string(), unquote(&unquote_cookie(value)));
        }
        cookies
    })
}

/// 去掉旧式 Cookie 值外层的双引号，并还原其中的 `\ooo` 八进制与 `\x` 转义。
pub fn unquote_cookie(value: &str) -> String {
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return value.to_string();
    }
    let inner = &value[1..value.len() - 1];
    let chars: Vec<char> = inner.chars().collect();
    let mut output = String::with_capacity(inner.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 == chars.len() {
            output.push(chars[i]);
            i += 1;
            continue;
        }
        let octal = &chars[i + 1..chars.len().min(i + 4)];
        let is_octal = octal.len() == 3
            && ('0'..='3').contains(&octal[0])
            && octal[1..].iter().all(|c| ('0'..='7').contains(c));
        if is_octal {
            let code = octal
                .iter()
                .fold(0u32, |acc, c| acc * 8 + c.to_digit(8).unwrap_or(0));
            output.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            i += 4;
        } else {
            output.push(chars[i + 1]);
            i += 2;
        }
    }
    output
}

/// 解析 `application/x-www-form-urlencoded` 请求体。
///
/// 按键分组并保持首次出现的顺序：只出现一次的键得到标量，多次出现的键得到列表。
pub fn parse_url_encoded_form(encoded: &[u8]) -> Vec<(String, FieldValue<String>)> {
    FORM_CACHE.get_or_insert_with(encoded.to_vec(), || {
        let mut fields = MultiDict::new();
        for (key, value) in split_query(&decode_latin1(encoded)) {
            fields.append(key, value);
        }
        fields.into_grouped()
    })
}

/// 按字符集名称解码字节。
///
/// 字符集标签按 WHATWG Encoding 标准解析，`_` 视同 `-`。`latin-1` 一族严格按
/// ISO-8859-1 逐字节映射，`ascii` 拒绝高位字节。
/// 无法识别的字符集返回 `UnsupportedCharset`；字节与字符集不符时返回 `Ok(None)`。
pub fn decode_charset(bytes: &[u8], charset: &str) -> Result<Option<String>, Exception> {
    let label = charset.trim().to_ascii_lowercase();
    match label.replace('_', "-").as_str() {
        "latin-1" | "latin1" | "l1" | "iso-8859-1" | "iso8859-1" => {
            return Ok(Some(decode_latin1(bytes)))
        }
        "ascii" | "us-ascii" => {
            return Ok(bytes.is_ascii().then(|| decode_latin1(bytes)));
        }
        _ => {}
    }
    let encoding = Encoding::for_label(label.as_bytes())
        .or_else(|| Encoding::for_label(label.replace('_', "-").as_bytes()));
    let encoding = match encoding {
        Some(encoding) => encoding,
        None => return Err(Exception::UnsupportedCharset(label)),
    };
    Ok(encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned))
}
