// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求门面模块
//!
//! 把 ASGI scope 与已经完整接收的请求体组合成 `Request`，并按需调用解析核心：
//! 1. URL：由 scope 中的 scheme、server、host 头部与路径拼出。
//! 2. 查询参数与 Cookie：走带缓存的纯函数解析器。
//! 3. 表单：根据 `Content-Type` 在 multipart 与 urlencoded 之间分派，解析结果缓存在请求内。
//! 4. JSON：通过 `serde_json` 反序列化为调用方指定的类型。
//!
//! 每个请求携带一个全局 ID，所有日志以 `[ID{}]` 开头，便于在多任务环境下追踪。

use std::collections::HashMap;

use crate::{
    config::ParserConfig,
    exception::Exception,
    header::{parse_content_header, ContentHeader, Headers},
    multidict::QueryParams,
    multipart::{FormData, MultipartParser},
    parsers::{parse_cookie_string, parse_query_bytes, parse_url_encoded_form},
    url::{Scope, URL},
};

use bytes::Bytes;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;

const MULTIPART_FORM: &str = "multipart/form-data";
const URL_ENCODED_FORM: &str = "application/x-www-form-urlencoded";

/// 一个已接收完整请求体的请求。
///
/// 表单在第一次调用 [`Request::form`] 时解析，之后重复调用直接返回缓存结果。
/// 请求结束前调用 [`Request::close_uploads`] 释放上传文件占用的临时存储。
#[derive(Debug)]
pub struct Request {
    id: u128,
    scope: Scope,
    headers: Headers,
    url: URL,
    body: Bytes,
    form: Option<FormData>,
}

impl Request {
    /// # 参数
    /// * `scope` - ASGI scope 中与解析相关的字段。
    /// * `body` - 完整的请求体。
    /// * `id` - 全局请求 ID，用于日志追踪。
    pub fn new(scope: Scope, body: Bytes, id: u128) -> Self {
        let headers = Headers::from_raw(scope.headers.clone());
        let url = URL::from_scope(&scope);
        debug!("[ID{}]构建请求：{}，请求体{}字节", id, url, body.len());
        Self {
            id,
            scope,
            headers,
            url,
            body,
            form: None,
        }
    }

    /// 解析 `Content-Type`，缺失时得到空值
    pub fn content_type(&self) -> ContentHeader {
        parse_content_header(&self.headers.get("content-type").unwrap_or_default())
    }

    /// 查询参数，原始查询串按 latin-1 解码
    pub fn query_params(&self) -> QueryParams {
        QueryParams::from_pairs(parse_query_bytes(&self.scope.query_string))
    }

    /// 所有 `Cookie` 头部合并后的键值，同名时后出现的值生效
    pub fn cookies(&self) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for cookie_header in self.headers.get_all("cookie") {
            cookies.extend(parse_cookie_string(&cookie_header));
        }
        cookies
    }

    /// 解析表单。
    ///
    /// `multipart/form-data` 与 `application/x-www-form-urlencoded` 以外的内容类型得到空表单。
    pub fn form(&mut self, config: &ParserConfig) -> Result<&FormData, Exception> {
        if self.form.is_none() {
            let form = self.parse_form(config)?;
            self.form = Some(form);
        }
        Ok(self.form.get_or_insert_with(FormData::new))
    }

    fn parse_form(&self, config: &ParserConfig) -> Result<FormData, Exception> {
        let raw_content_type = self.headers.get("content-type").unwrap_or_default();
        let content_type = parse_content_header(&raw_content_type);
        match content_type.value() {
            MULTIPART_FORM => {
                let parser = MultipartParser::from_content_type(&raw_content_type, config)
                    .map_err(|e| {
                        warn!("[ID{}]multipart请求缺少边界：{}", self.id, raw_content_type);
                        e
                    })?;
                let form = parser.parse(&self.body).map_err(|e| {
                    warn!("[ID{}]multipart请求体解析失败：{}", self.id, e);
                    e
                })?;
                debug!(
                    "[ID{}]解析multipart表单，{}个字段，{}个文件",
                    self.id,
                    form.len(),
                    form.files().len()
                );
                Ok(form)
            }
            URL_ENCODED_FORM => {
                let form = FormData::from_url_encoded(parse_url_encoded_form(&self.body));
                debug!("[ID{}]解析urlencoded表单，{}个字段", self.id, form.len());
                Ok(form)
            }
            other => {
                debug!("[ID{}]内容类型{:?}不是表单，返回空表单", self.id, other);
                Ok(FormData::new())
            }
        }
    }

    /// 把请求体反序列化为 `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Exception> {
        serde_json::from_slice(&self.body).map_err(|e| {
            warn!("[ID{}]请求体不是合法的JSON：{}", self.id, e);
            Exception::InvalidJson(e.to_string())
        })
    }

    /// 关闭已解析表单中的全部上传文件
    pub async fn close_uploads(&self) -> Result<(), Exception> {
        if let Some(form) = &self.form {
            if let Err(e) = form.close().await {
                error!("[ID{}]关闭上传文件失败：{}", self.id, e);
                return Err(e);
            }
        }
        Ok(())
    }
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn url(&self) -> &URL {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 去掉挂载前缀之前的路径
    pub fn path(&self) -> &str {
        &self.scope.path
    }
}
