// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模板编译模块
//!
//! 把 `/items/{id:int}` 这样的模板编译成三部分：
//! - 首尾锚定的匹配正则，每个占位符对应一个命名捕获组；
//! - 用于反向生成 URL 的格式串，占位符保留为 `{name}`；
//! - 参数名到转换器的映射。
//!
//! 不以 `/` 开头的模板视为主机模板，末尾字面量只取第一个 `:` 之前的部分，
//! 因此 `{sub}.example.org:8000` 也能匹配不带端口的主机名。
//!
//! 编译发生在路由注册阶段，结果按模板缓存。

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    cache::ParseCache,
    convertor::{Convertor, ConvertorRegistry, PathValue, DEFAULT_CONVERTORS},
    exception::Exception,
    param::{PARSER_CACHE_CAPACITY, PATH_PARAM},
};

use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;

lazy_static! {
    static ref PATH_CACHE: ParseCache<String, CompiledPath> =
        ParseCache::from_capacity(PARSER_CACHE_CAPACITY);
}

/// 格式串的组成片段，反向生成时逐段拼接
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// 编译后的路由模板
#[derive(Clone)]
pub struct CompiledPath {
    template: String,
    regex: Regex,
    format_string: String,
    segments: Vec<Segment>,
    convertors: Vec<(String, Arc<dyn Convertor>)>,
}

/// 使用内置转换器编译模板，结果会被缓存
pub fn compile_path(template: &str) -> Result<CompiledPath, Exception> {
    PATH_CACHE.try_get_or_insert_with(template.to_string(), || {
        compile_path_with(template, &DEFAULT_CONVERTORS)
    })
}

/// 使用给定注册表编译模板
pub fn compile_path_with(
    template: &str,
    registry: &ConvertorRegistry,
) -> Result<CompiledPath, Exception> {
    let is_host = !template.starts_with('/');

    let mut path_regex = String::from("^");
    let mut format_string = String::new();
    let mut segments = Vec::new();
    let mut convertors: Vec<(String, Arc<dyn Convertor>)> = Vec::new();
    let mut duplicated: Vec<String> = Vec::new();
    let mut index = 0;

    for caps in PATH_PARAM.captures_iter(template) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let name = &caps[1];
        let convertor_type = caps
            .get(2)
            .map_or("str", |m| m.as_str().trim_start_matches(':'));
        let convertor = registry.get(convertor_type)?;

        let literal = &template[index..whole.start()];
        path_regex.push_str(&regex::escape(literal));
        path_regex.push_str(&format!("(?P<{}>{})", name, convertor.regex()));

        format_string.push_str(literal);
        format_string.push('{');
        format_string.push_str(name);
        format_string.push('}');
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal.to_string()));
        }
        segments.push(Segment::Param(name.to_string()));

        if convertors.iter().any(|(existing, _)| existing == name) {
            if !duplicated.iter().any(|d| d == name) {
                duplicated.push(name.to_string());
            }
        } else {
            convertors.push((name.to_string(), convertor));
        }
        index = whole.end();
    }

    if !duplicated.is_empty() {
        duplicated.sort();
        return Err(Exception::DuplicatedParams {
            names: duplicated,
            path: template.to_string(),
        });
    }

    let tail = &template[index..];
    if is_host {
        let hostname = tail.split(':').next().unwrap_or("");
        path_regex.push_str(&regex::escape(hostname));
    } else {
        path_regex.push_str(&regex::escape(tail));
    }
    path_regex.push('$');
    format_string.push_str(tail);
    if !tail.is_empty() {
        segments.push(Segment::Literal(tail.to_string()));
    }

    let regex = Regex::new(&path_regex).map_err(|e| {
        error!("路由模板{}生成的正则无效：{}", template, e);
        Exception::InvalidPattern(format!("{}: {}", template, e))
    })?;

    Ok(CompiledPath {
        template: template.to_string(),
        regex,
        format_string,
        segments,
        convertors,
    })
}

impl CompiledPath {
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn format_string(&self) -> &str {
        &self.format_string
    }

    pub fn is_host(&self) -> bool {
        !self.template.starts_with('/')
    }

    /// 参数名，按在模板中出现的顺序
    pub fn param_names(&self) -> Vec<&str> {
        self.convertors.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn convertor(&self, name: &str) -> Option<&Arc<dyn Convertor>> {
        self.convertors
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, convertor)| convertor)
    }

    /// 整串匹配，成功时返回转换后的参数
    pub fn matches(&self, candidate: &str) -> Option<HashMap<String, PathValue>> {
        let caps = self.regex.captures(candidate)?;
        let mut params = HashMap::with_capacity(self.convertors.len());
        for (name, convertor) in &self.convertors {
            let raw = caps.name(name).map_or("", |m| m.as_str());
            match convertor.convert(raw) {
                Ok(value) => {
                    params.insert(name.clone(), value);
                }
                Err(e) => {
                    debug!("路径{}的参数{}无法转换，按未匹配处理：{}", candidate, name, e);
                    return None;
                }
            }
        }
        Some(params)
    }

    /// 反向生成路径。参数必须与模板中的参数一一对应。
    pub fn url_path_for(&self, params: &HashMap<String, PathValue>) -> Result<String, Exception> {
        for name in params.keys() {
            if self.convertor(name).is_none() {
                error!("反向生成{}时传入了模板中不存在的参数{}", self.template, name);
                return Err(Exception::UnexpectedParam(name.clone()));
            }
        }

        let mut rendered = HashMap::with_capacity(self.convertors.len());
        for (name, convertor) in &self.convertors {
            let value = match params.get(name) {
                Some(value) => value,
                None => {
                    error!("反向生成{}时缺少参数{}", self.template, name);
                    return Err(Exception::MissingParam(name.clone()));
                }
            };
            let text = convertor.to_string(value).map_err(|e| {
                error!("反向生成{}时参数{}的值{:?}非法：{}", self.template, name, value, e);
                e
            })?;
            rendered.insert(name.as_str(), text);
        }

        // 参数值不再参与替换，值里出现的 `{name}` 原样保留
        let mut path = String::with_capacity(self.format_string.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(name) => {
                    if let Some(text) = rendered.get(name.as_str()) {
                        path.push_str(text);
                    }
                }
            }
        }
        Ok(path)
    }
}

impl fmt::Debug for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPath")
            .field("regex", &self.regex.as_str())
            .field("format_string", &self.format_string)
            .field("params", &self.param_names())
            .finish()
    }
}
