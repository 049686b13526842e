// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了解析核心在处理请求体、头部、URL 以及编译路由模板时可能抛出的各类异常。
//!
//! ## 错误分类
//! - **请求级错误**：multipart 分段过多、分段头格式错误、正文无法解码等，
//!   上层应将其转化为 4xx 响应。
//! - **注册期错误**：未知的路径转换器类型、重复的路径参数名，属于启动期的致命错误。
//! - **反向渲染错误**：使用非法参数值生成 URL（负数、NaN、含 `/` 的字符串段等），
//!   属于调用方的编程错误。

use std::fmt;

/// 解析核心处理过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// multipart 正文的分段数超过了配置的上限。携带上限值便于诊断。
    TooManyParts { limit: usize },
    /// `multipart/form-data` 的 Content-Type 中缺少 `boundary` 参数。
    MissingBoundary,
    /// 分段头部的某一行缺少 `:` 分隔符。
    MalformedHeaderLine(String),
    /// 分段声明了无法识别的字符集。
    UnsupportedCharset(String),
    /// 文本字段的字节无法按声明的字符集解码。
    InvalidEncoding { field: String },
    /// 路由模板引用了未注册的转换器类型。
    UnknownConvertor(String),
    /// 同一个路由模板中出现了重复的参数名。
    DuplicatedParams { names: Vec<String>, path: String },
    /// 路由模板与转换器片段拼出的正则无法编译。
    InvalidPattern(String),
    /// 反向渲染时传入了负数。
    NegativeValue,
    /// 反向渲染时传入了 NaN。
    NotANumber,
    /// 反向渲染时传入了无穷大。
    InfiniteValue,
    /// 字符串路径段中包含 `/`。
    PathSeparator,
    /// 字符串路径段为空。
    EmptySegment,
    /// 参数值的类型与转换器不一致。
    TypeMismatch { expected: &'static str },
    /// 不是合法的 UUID 文本。
    InvalidUuid(String),
    /// 反向渲染缺少模板需要的参数。
    MissingParam(String),
    /// 反向渲染传入了模板中不存在的参数。
    UnexpectedParam(String),
    /// 请求体不是合法的 JSON，或者与目标类型不匹配。
    InvalidJson(String),
    /// 上传文件已经关闭，不能再读写。
    UploadClosed,
    /// 上传文件底层 I/O 失败。
    Io(String),
    /// 配置文件无法读取。
    ConfigUnreadable(String),
}

use Exception::*;

impl Exception {
    /// 是否属于请求级错误（应映射为 400 Bad Request）。
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            TooManyParts { .. }
                | MissingBoundary
                | MalformedHeaderLine(_)
                | UnsupportedCharset(_)
                | InvalidEncoding { .. }
                | InvalidJson(_)
        )
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TooManyParts { limit } => {
                write!(f, "Too many multipart parts, the limit is {}", limit)
            }
            MissingBoundary => write!(f, "Missing boundary in multipart content type"),
            MalformedHeaderLine(line) => write!(f, "Malformed multipart header line: {:?}", line),
            UnsupportedCharset(charset) => write!(f, "Unsupported charset \"{}\"", charset),
            InvalidEncoding { field } => {
                write!(f, "Field \"{}\" can't be decoded with its charset", field)
            }
            UnknownConvertor(name) => write!(f, "Unknown path convertor \"{}\"", name),
            DuplicatedParams { names, path } => {
                let ending = if names.len() > 1 { "s" } else { "" };
                write!(
                    f,
                    "Duplicated param name{} {} at path {}",
                    ending,
                    names.join(", "),
                    path
                )
            }
            InvalidPattern(e) => write!(f, "Invalid route pattern: {}", e),
            NegativeValue => write!(f, "Negative numbers are not supported"),
            NotANumber => write!(f, "NaN values are not supported"),
            InfiniteValue => write!(f, "Infinite values are not supported"),
            PathSeparator => write!(f, "May not contain path separators"),
            EmptySegment => write!(f, "Must not be empty"),
            TypeMismatch { expected } => write!(f, "Expected a {} value", expected),
            InvalidUuid(value) => write!(f, "Invalid UUID \"{}\"", value),
            MissingParam(name) => write!(f, "Missing path param \"{}\"", name),
            UnexpectedParam(name) => write!(f, "Unexpected path param \"{}\"", name),
            InvalidJson(e) => write!(f, "Invalid JSON body: {}", e),
            UploadClosed => write!(f, "Upload file is already closed"),
            Io(e) => write!(f, "Upload file I/O failed: {}", e),
            ConfigUnreadable(e) => write!(f, "Config file can't be read: {}", e),
        }
    }
}

impl std::error::Error for Exception {}

impl From<std::io::Error> for Exception {
    fn from(e: std::io::Error) -> Self {
        Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicated_params_message() {
        let single = DuplicatedParams {
            names: vec!["id".to_string()],
            path: "/{id}/{id}".to_string(),
        };
        assert_eq!(single.to_string(), "Duplicated param name id at path /{id}/{id}");

        let multiple = DuplicatedParams {
            names: vec!["a".to_string(), "b".to_string()],
            path: "/{a}/{b}/{a}/{b}".to_string(),
        };
        assert_eq!(
            multiple.to_string(),
            "Duplicated param names a, b at path /{a}/{b}/{a}/{b}"
        );
    }

    #[test]
    fn test_bad_request_classification() {
        assert!(TooManyParts { limit: 3 }.is_bad_request());
        assert!(MalformedHeaderLine("x".to_string()).is_bad_request());
        assert!(!UnknownConvertor("x".to_string()).is_bad_request());
        assert!(!NegativeValue.is_bad_request());
    }
}
