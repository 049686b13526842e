// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # URL 模块
//!
//! 不可变的 URL 值类型。构造时拆分为 scheme/netloc/path/query/fragment，
//! 用户名、密码、主机名与端口在访问时从 netloc 中解析。
//!
//! 所有修改操作（`replace`、`include_query_params`、`remove_query_params`）
//! 都返回新的实例。两个 URL 是否相等只比较渲染后的字符串。

use std::{fmt, hash, str::FromStr};

use crate::{
    header::Headers,
    multidict::QueryParams,
    param::{default_port, PASSWORD_MASK},
};

use log::debug;

/// 允许出现在 scheme 中的字符（首字符必须是字母）
const SCHEME_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-.";

/// 即使 netloc 为空也要写出 `//` 的 scheme
const USES_NETLOC: &[&str] = &[
    "", "ftp", "http", "gopher", "nntp", "telnet", "imap", "wais", "file", "mms", "https", "shttp",
    "snews", "prospero", "rtsp", "rtsps", "rtspu", "rsync", "svn", "svn+ssh", "sftp", "nfs", "git",
    "git+ssh", "ws", "wss",
];

/// 网络地址
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

/// 构造 URL 所需的 ASGI scope 字段
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub scheme: String,
    pub server: Option<Address>,
    pub root_path: String,
    pub path: String,
    pub query_string: Vec<u8>,
    pub headers: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            server: None,
            root_path: String::new(),
            path: "/".to_string(),
            query_string: Vec::new(),
            headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Components {
    scheme: String,
    netloc: String,
    path: String,
    query: String,
    fragment: String,
}

impl Components {
    fn split(url: &str) -> Self {
        let cleaned: String = url
            .trim_matches(|c: char| c <= ' ')
            .chars()
            .filter(|c| !matches!(*c, '\t' | '\r' | '\n'))
            .collect();
        let mut rest = cleaned.as_str();
        let mut components = Components::default();

        if let Some(index) = rest.find(':') {
            let prefix = &rest[..index];
            let valid = prefix
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && prefix.chars().all(|c| SCHEME_CHARS.contains(c));
            if valid {
                components.scheme = prefix.to_ascii_lowercase();
                rest = &rest[index + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after
                .find(|c: char| matches!(c, '/' | '?' | '#'))
                .unwrap_or(after.len());
            components.netloc = after[..end].to_string();
            rest = &after[end..];
        }

        if let Some(index) = rest.find('#') {
            components.fragment = rest[index + 1..].to_string();
            rest = &rest[..index];
        }
        if let Some(index) = rest.find('?') {
            components.query = rest[index + 1..].to_string();
            rest = &rest[..index];
        }
        components.path = rest.to_string();
        components
    }

    fn unsplit(&self) -> String {
        let mut url = self.path.clone();
        if !self.netloc.is_empty() {
            if !url.is_empty() && !url.starts_with('/') {
                url.insert(0, '/');
            }
            url = format!("//{}{}", self.netloc, url);
        } else if url.starts_with("//")
            || (!self.scheme.is_empty()
                && USES_NETLOC.contains(&self.scheme.as_str())
                && (url.is_empty() || url.starts_with('/')))
        {
            url = format!("//{}", url);
        }
        if !self.scheme.is_empty() {
            url = format!("{}:{}", self.scheme, url);
        }
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            url.push('#');
            url.push_str(&self.fragment);
        }
        url
    }

    fn userinfo(&self) -> Option<&str> {
        self.netloc.rsplit_once('@').map(|(userinfo, _)| userinfo)
    }

    fn hostinfo(&self) -> &str {
        match self.netloc.rsplit_once('@') {
            Some((_, hostinfo)) => hostinfo,
            None => &self.netloc,
        }
    }

    /// 主机部分与端口部分（IPv6 字面量保留方括号外的端口）
    fn host_and_port(&self) -> (&str, &str) {
        let hostinfo = self.hostinfo();
        if let Some(bracketed) = hostinfo.strip_prefix('[') {
            return match bracketed.split_once(']') {
                Some((host, after)) => (host, after.split_once(':').map_or("", |(_, p)| p)),
                None => (bracketed, ""),
            };
        }
        match hostinfo.split_once(':') {
            Some((host, port)) => (host, port),
            None => (hostinfo, ""),
        }
    }
}

/// 对 URL 组件的替换请求，配合 [`URL::replace`] 使用。
///
/// 设置了 username、password、hostname、port 中的任何一个时，netloc 会被重新组合。
#[derive(Debug, Clone, Default)]
pub struct Replace {
    scheme: Option<String>,
    netloc: Option<String>,
    path: Option<String>,
    query: Option<String>,
    fragment: Option<String>,
    username: Option<Option<String>>,
    password: Option<Option<String>>,
    hostname: Option<String>,
    port: Option<Option<u16>>,
}

impl Replace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    pub fn netloc(mut self, netloc: &str) -> Self {
        self.netloc = Some(netloc.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn fragment(mut self, fragment: &str) -> Self {
        self.fragment = Some(fragment.to_string());
        self
    }

    pub fn username(mut self, username: Option<&str>) -> Self {
        self.username = Some(username.map(str::to_string));
        self
    }

    pub fn password(mut self, password: Option<&str>) -> Self {
        self.password = Some(password.map(str::to_string));
        self
    }

    pub fn hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = Some(port);
        self
    }

    fn touches_netloc_parts(&self) -> bool {
        self.username.is_some()
            || self.password.is_some()
            || self.hostname.is_some()
            || self.port.is_some()
    }
}

/// 不可变 URL
#[derive(Clone)]
pub struct URL {
    url: String,
    components: Components,
}

impl URL {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            components: Components::split(url),
        }
    }

    fn from_components(components: Components) -> Self {
        Self::new(&components.unsplit())
    }

    /// 从 ASGI scope 构造。
    ///
    /// `host` 头部优先于 `server`；两者都没有时得到只含路径的 URL。
    /// 只有使用 `server` 时，与 scheme 默认端口相同的端口才会被省略。
    pub fn from_scope(scope: &Scope) -> Self {
        let path = format!("{}{}", scope.root_path, scope.path);
        let host_header = Headers::from_raw(scope.headers.clone()).get("host");

        let mut url = match (host_header, &scope.server) {
            (Some(host), _) => format!("{}://{}{}", scope.scheme, host, path),
            (None, None) => path,
            (None, Some(server)) => match default_port(&scope.scheme) {
                Some(port) if port == server.port => {
                    format!("{}://{}{}", scope.scheme, server.host, path)
                }
                _ => format!("{}://{}:{}{}", scope.scheme, server.host, server.port, path),
            },
        };
        if !scope.query_string.is_empty() {
            url.push('?');
            url.push_str(&String::from_utf8_lossy(&scope.query_string));
        }
        Self::new(&url)
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.components.scheme
    }

    pub fn netloc(&self) -> &str {
        &self.components.netloc
    }

    pub fn path(&self) -> &str {
        &self.components.path
    }

    pub fn query(&self) -> &str {
        &self.components.query
    }

    pub fn fragment(&self) -> &str {
        &self.components.fragment
    }

    pub fn username(&self) -> Option<&str> {
        self.components
            .userinfo()
            .map(|userinfo| userinfo.split_once(':').map_or(userinfo, |(user, _)| user))
    }

    pub fn password(&self) -> Option<&str> {
        self.components
            .userinfo()
            .and_then(|userinfo| userinfo.split_once(':').map(|(_, password)| password))
    }

    /// 小写的主机名，IPv6 字面量不带方括号
    pub fn hostname(&self) -> Option<String> {
        let (host, _) = self.components.host_and_port();
        if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        }
    }

    pub fn port(&self) -> Option<u16> {
        let (_, port) = self.components.host_and_port();
        if port.is_empty() {
            return None;
        }
        match port.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                debug!("URL端口无法解析，按未指定端口处理：{}", port);
                None
            }
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self.scheme(), "https" | "wss")
    }

    pub fn query_params(&self) -> QueryParams {
        QueryParams::from_query(self.query())
    }

    /// 返回替换了指定组件的新 URL
    pub fn replace(&self, replace: Replace) -> Self {
        let mut components = self.components.clone();
        if replace.touches_netloc_parts() {
            components.netloc = self.compose_netloc(&replace);
        }
        if let Some(scheme) = replace.scheme {
            components.scheme = scheme;
        }
        if let Some(netloc) = replace.netloc {
            components.netloc = netloc;
        }
        if let Some(path) = replace.path {
            components.path = path;
        }
        if let Some(query) = replace.query {
            components.query = query;
        }
        if let Some(fragment) = replace.fragment {
            components.fragment = fragment;
        }
        Self::from_components(components)
    }

    fn compose_netloc(&self, replace: &Replace) -> String {
        let hostname = match &replace.hostname {
            Some(hostname) => hostname.clone(),
            None => {
                let hostinfo = self.components.hostinfo();
                if hostinfo.ends_with(']') {
                    hostinfo.to_string()
                } else {
                    hostinfo
                        .rsplit_once(':')
                        .map_or(hostinfo, |(host, _)| host)
                        .to_string()
                }
            }
        };
        let port = replace.port.unwrap_or_else(|| self.port());
        let username = match &replace.username {
            Some(username) => username.clone(),
            None => self.username().map(str::to_string),
        };
        let password = match &replace.password {
            Some(password) => password.clone(),
            None => self.password().map(str::to_string),
        };

        let mut netloc = hostname;
        if let Some(port) = port {
            netloc = format!("{}:{}", netloc, port);
        }
        if let Some(username) = username {
            let userpass = match password {
                Some(password) => format!("{}:{}", username, password),
                None => username,
            };
            netloc = format!("{}@{}", userpass, netloc);
        }
        netloc
    }

    /// 设置查询参数：已存在的键原位替换，新键追加到末尾。
    pub fn include_query_params<K: AsRef<str>, V: ToString>(&self, params: &[(K, V)]) -> Self {
        let mut query = self.query_params();
        query.update(
            params
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.to_string())),
        );
        self.replace(Replace::new().query(&query.to_query()))
    }

    /// 用给定的参数整体替换查询串
    pub fn replace_query_params<K: AsRef<str>, V: ToString>(&self, params: &[(K, V)]) -> Self {
        let query: QueryParams = params
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect();
        self.replace(Replace::new().query(&query.to_query()))
    }

    /// 删除给定键的全部出现
    pub fn remove_query_params<K: AsRef<str>>(&self, keys: &[K]) -> Self {
        let mut query = self.query_params();
        for key in keys {
            query.remove(&key.as_ref().to_string());
        }
        self.replace(Replace::new().query(&query.to_query()))
    }
}

impl fmt::Display for URL {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// 调试输出不暴露密码
impl fmt::Debug for URL {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.password().is_some() {
            let masked = self.replace(Replace::new().password(Some(PASSWORD_MASK)));
            write!(f, "URL({:?})", masked.url)
        } else {
            write!(f, "URL({:?})", self.url)
        }
    }
}

impl PartialEq for URL {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for URL {}

impl hash::Hash for URL {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl PartialEq<str> for URL {
    fn eq(&self, other: &str) -> bool {
        self.url == other
    }
}

impl PartialEq<&str> for URL {
    fn eq(&self, other: &&str) -> bool {
        self.url == *other
    }
}

impl From<&str> for URL {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for URL {
    fn from(url: String) -> Self {
        Self::new(&url)
    }
}

impl FromStr for URL {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
