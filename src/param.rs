// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 解析层协议参数与常量模块
//!
//! 该模块集中定义了解析核心所遵循的协议常量与预编译正则，包括：
//! - multipart 报文中的分隔符号（CRLF、边界前缀）。
//! - 各 URL scheme 的默认端口。
//! - 解析器缓存容量、上传文件内存阈值等默认限制。
//! - 内容头参数、路径模板占位符等固定文法的正则表达式。

use lazy_static::lazy_static;
use regex::Regex;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// multipart 边界标记前缀，完整的分隔行为 `--{boundary}`
pub const BOUNDARY_PREFIX: &[u8] = b"--";

/// 头部与正文之间的空行
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// 纯函数解析器的 LRU 缓存容量
pub const PARSER_CACHE_CAPACITY: usize = 1024;

/// 单个请求允许的 multipart 分段数上限（默认值）
pub const DEFAULT_MAX_PARTS: usize = 1000;

/// 1 MiB，上传文件在内存中保存的默认上限，超出后转存到临时文件
pub const ONE_MEGABYTE: usize = 1024 * 1024;

/// 未声明 charset 时正文使用的默认编码
pub const DEFAULT_CHARSET: &str = "utf-8";

/// `URL` 的 `Debug` 输出中用于替换密码的掩码
pub const PASSWORD_MASK: &str = "**********";

/// 错误转义的引号 `\"` 在参数解析期间被替换成的占位符
pub const QUOTE_PLACEHOLDER: &str = "%22";

/// 返回 scheme 对应的默认端口。
///
/// 仅 `http`/`https`/`ws`/`wss` 有默认端口，其余 scheme 返回 `None`。
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}

lazy_static! {
    /// 内容头参数：`; key=token` 或 `; key="quoted"`
    pub static ref CONTENT_PARAM: Regex = Regex::new(
        r#";\s*([A-Za-z0-9_!#$%&'*+\-.^`|~]+)=(?:([A-Za-z0-9_!#$%&'*+\-.^`|~]+)|"([^"]*)")"#
    )
    .expect("常量正则");

    /// 路径模板占位符：`{name}` 或 `{name:type}`
    pub static ref PATH_PARAM: Regex =
        Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)(:[a-zA-Z_][a-zA-Z0-9_]*)?\}").expect("常量正则");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(default_port("http"), Some(80));
        assert_eq!(default_port("ws"), Some(80));
        assert_eq!(default_port("https"), Some(443));
        assert_eq!(default_port("wss"), Some(443));
        assert_eq!(default_port("ftp"), None);
    }

    #[test]
    fn test_path_param_regex() {
        let caps = PATH_PARAM.captures("/items/{id:int}").unwrap();
        assert_eq!(&caps[1], "id");
        assert_eq!(&caps[2], ":int");
        assert!(PATH_PARAM.captures("/items/{1abc}").is_none());
    }
}
