// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # multipart/form-data 解析模块
//!
//! 把以边界分隔的请求体拆成若干分段，逐段解析头部并物化为表单字段：
//! 1. 按 `--{boundary}` 切分，最多切 `limit + 3` 次，丢弃前导与结尾片段。
//!    分段数超过上限时直接失败，限制恶意请求体的内存与 CPU 开销。
//! 2. 每个分段以 CRLF 开头，随后是若干头部行，空行之后是正文。
//!    头部行按 UTF-8 解码，浏览器会把非 ASCII 的字段名和文件名原样写入。
//! 3. 从 `Content-Disposition` 取字段名与文件名（支持 RFC 2231 的 `filename*`），
//!    从 `Content-Type` 取字符集。
//! 4. 有文件名的分段成为 [`UploadFile`]，否则按字符集解码为文本；空正文得到 `Empty`。
//! 5. 同名字段按出现顺序聚合，只出现一次的字段折叠为标量。

use crate::{
    config::ParserConfig,
    exception::Exception,
    header::{parse_content_header, Headers},
    multidict::{FieldValue, MultiDict},
    param::{BOUNDARY_PREFIX, CRLF, DEFAULT_MAX_PARTS, HEADER_TERMINATOR},
    parsers::decode_charset,
    upload::UploadFile,
};

use log::{debug, warn};
use memchr::memmem;
use percent_encoding::percent_decode_str;

/// 表单中的单个值
#[derive(Debug)]
pub enum FormValue {
    Text(String),
    File(UploadFile),
    /// 分段存在但正文为空
    Empty,
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadFile> {
        match self {
            FormValue::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FormValue::Empty)
    }
}

/// 解析完成的表单，字段按首次出现的顺序排列。
#[derive(Debug, Default)]
pub struct FormData {
    fields: Vec<(String, FieldValue<FormValue>)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 urlencoded 表单的解析结果构建
    pub fn from_url_encoded(fields: Vec<(String, FieldValue<String>)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name, value.map(FormValue::Text)))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue<FormValue>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// 字段最后一个值的文本
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)?.last()?.as_text()
    }

    /// 字段最后一个值的上传文件
    pub fn file(&self, name: &str) -> Option<&UploadFile> {
        self.get(name)?.last()?.as_file()
    }

    pub fn fields(&self) -> &[(String, FieldValue<FormValue>)] {
        &self.fields
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 全部上传文件
    pub fn files(&self) -> Vec<&UploadFile> {
        self.fields
            .iter()
            .flat_map(|(_, value)| value.values())
            .filter_map(FormValue::as_file)
            .collect()
    }

    /// 关闭表单中所有上传文件
    pub async fn close(&self) -> Result<(), Exception> {
        for file in self.files() {
            file.close().await?;
        }
        Ok(())
    }
}

/// multipart 请求体解析器
#[derive(Debug, Clone)]
pub struct MultipartParser {
    boundary: Vec<u8>,
    max_parts: usize,
    spool_max_size: usize,
    default_charset: String,
}

impl MultipartParser {
    pub fn new(boundary: &str, config: &ParserConfig) -> Self {
        Self {
            boundary: boundary.as_bytes().to_vec(),
            max_parts: config.max_parts(),
            spool_max_size: config.spool_max_size(),
            default_charset: config.default_charset().to_string(),
        }
    }

    /// 从 `Content-Type` 头部取出边界后构造
    pub fn from_content_type(content_type: &str, config: &ParserConfig) -> Result<Self, Exception> {
        let header = parse_content_header(content_type);
        match header.param("boundary") {
            Some(boundary) if !boundary.is_empty() => Ok(Self::new(boundary, config)),
            _ => Err(Exception::MissingBoundary),
        }
    }

    pub fn max_parts(&self) -> usize {
        self.max_parts
    }

    pub fn parse(&self, body: &[u8]) -> Result<FormData, Exception> {
        let parts = self.split(body)?;
        let mut fields = MultiDict::new();
        for part in parts {
            if let Some((name, value)) = self.parse_part(part)? {
                fields.append(name, value);
            }
        }
        Ok(FormData {
            fields: fields.into_grouped(),
        })
    }

    /// 按边界切分，返回去掉前导与结尾片段后的分段
    fn split<'a>(&self, body: &'a [u8]) -> Result<Vec<&'a [u8]>, Exception> {
        let mut marker = BOUNDARY_PREFIX.to_vec();
        marker.extend_from_slice(&self.boundary);

        let max_splits = self.max_parts.saturating_add(3);
        let mut fragments = Vec::new();
        let mut start = 0;
        for position in memmem::find_iter(body, &marker) {
            if fragments.len() == max_splits {
                break;
            }
            fragments.push(&body[start..position]);
            start = position + marker.len();
        }
        fragments.push(&body[start..]);

        if fragments.len() < 2 {
            debug!("请求体中没有找到边界，按空表单处理");
            return Ok(Vec::new());
        }
        let parts = fragments[1..fragments.len() - 1].to_vec();
        if parts.len() > self.max_parts {
            warn!("multipart分段数超过上限{}，拒绝解析", self.max_parts);
            return Err(Exception::TooManyParts {
                limit: self.max_parts,
            });
        }
        Ok(parts)
    }

    fn parse_part(&self, part: &[u8]) -> Result<Option<(String, FormValue)>, Exception> {
        let part = part.strip_prefix(CRLF.as_bytes()).unwrap_or(part);
        let (head, body) = if part.starts_with(CRLF.as_bytes()) {
            (&part[..0], &part[CRLF.len()..])
        } else {
            match memmem::find(part, HEADER_TERMINATOR) {
                Some(index) => (&part[..index], &part[index + HEADER_TERMINATOR.len()..]),
                None => (part, &part[part.len()..]),
            }
        };
        let body = body.strip_suffix(CRLF.as_bytes()).unwrap_or(body);

        let mut headers = Headers::new();
        let mut name = None;
        let mut filename = None;
        let mut encoded_filename = None;
        let mut charset = self.default_charset.clone();

        for line in head.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let line = match std::str::from_utf8(line) {
                Ok(line) => line.to_string(),
                Err(_) => {
                    let lossy = String::from_utf8_lossy(line).into_owned();
                    warn!("multipart分段头部不是合法的UTF-8：{:?}", lossy);
                    return Err(Exception::MalformedHeaderLine(lossy));
                }
            };
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field.trim().to_ascii_lowercase(), value.trim()),
                None => {
                    warn!("multipart分段头部格式错误：{:?}", line);
                    return Err(Exception::MalformedHeaderLine(line));
                }
            };
            match field.as_str() {
                "content-disposition" => {
                    let disposition = parse_content_header(value);
                    name = disposition.param("name").map(str::to_string);
                    filename = disposition.param("filename").map(str::to_string);
                    encoded_filename = disposition.param("filename*").map(str::to_string);
                }
                "content-type" => {
                    if let Some(declared) = parse_content_header(value).param("charset") {
                        charset = declared.to_string();
                    }
                }
                _ => {}
            }
            headers.append(&field, value);
        }

        let name = match name {
            Some(name) => name,
            None => {
                debug!("multipart分段缺少name参数，已跳过");
                return Ok(None);
            }
        };

        let filename = match (filename, encoded_filename) {
            (Some(filename), _) => Some(filename),
            (None, Some(encoded)) => Some(decode_rfc2231(&encoded, &charset, &name)?),
            (None, None) => None,
        };

        let value = match filename {
            Some(filename) => {
                FormValue::File(UploadFile::new(&filename, body, self.spool_max_size, headers)?)
            }
            None if body.is_empty() => FormValue::Empty,
            None => match decode_charset(body, &charset)? {
                Some(text) => FormValue::Text(text),
                None => return Err(Exception::InvalidEncoding { field: name }),
            },
        };
        Ok(Some((name, value)))
    }
}

/// 解码 RFC 2231 扩展参数值：`charset'language'percent-encoded`。
///
/// 没有声明字符集时使用分段的字符集。
pub fn decode_rfc2231(value: &str, fallback_charset: &str, field: &str) -> Result<String, Exception> {
    let pieces: Vec<&str> = value.splitn(3, '\'').collect();
    let (charset, encoded) = match pieces.as_slice() {
        [charset, _language, encoded] if !charset.is_empty() => (*charset, *encoded),
        [_, _, encoded] => (fallback_charset, *encoded),
        _ => (fallback_charset, value),
    };
    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    match decode_charset(&bytes, charset)? {
        Some(decoded) => Ok(decoded),
        None => Err(Exception::InvalidEncoding {
            field: field.to_string(),
        }),
    }
}

/// 使用默认配置解析，只指定分段数上限。
pub fn parse_multipart(body: &[u8], boundary: &str, limit: usize) -> Result<FormData, Exception> {
    let config = ParserConfig::new().with_max_parts(limit);
    MultipartParser::new(boundary, &config).parse(body)
}

/// 默认上限下的解析
pub fn parse_multipart_default(body: &[u8], boundary: &str) -> Result<FormData, Exception> {
    parse_multipart(body, boundary, DEFAULT_MAX_PARTS)
}
