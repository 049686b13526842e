// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod security_tests {
    //! # 恶意输入回归测试套件
    //!
    //! 模拟常见的攻击性请求体，验证解析核心在面对畸形输入时的行为：
    //! - 资源耗尽 (分段数过多 / 超大上传文件)
    //! - 协议畸形 (缺少冒号的头部行 / 缺少 boundary / 缺少 name 的分段)
    //! - 编码攻击 (未知字符集 / 非法字节序列 / 伪造的引号转义)

    use webcore::{
        parse_cookie_string, parse_multipart, Exception, FormValue, MultipartParser,
        ParserConfig,
    };

    const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    fn field(name: &str, value: &str) -> String {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
    }

    fn closing() -> String {
        format!("--{}--\r\n", BOUNDARY)
    }

    /// ## 攻击向量：分段数轰炸
    /// 分段数超过上限时必须在物化任何字段之前失败。
    #[test]
    fn test_too_many_parts_is_rejected() {
        let mut body = String::new();
        for i in 0..50 {
            body.push_str(&field(&format!("f{}", i), "x"));
        }
        body.push_str(&closing());

        let result = parse_multipart(body.as_bytes(), BOUNDARY, 10);
        assert_eq!(result.err(), Some(Exception::TooManyParts { limit: 10 }));

        let result = parse_multipart(body.as_bytes(), BOUNDARY, 50);
        assert_eq!(result.unwrap().len(), 50);
    }

    /// ## 攻击向量：恰好达到上限
    #[test]
    fn test_limit_is_inclusive() {
        let body = format!("{}{}{}", field("a", "1"), field("b", "2"), closing());
        assert_eq!(parse_multipart(body.as_bytes(), BOUNDARY, 2).unwrap().len(), 2);
        assert!(parse_multipart(body.as_bytes(), BOUNDARY, 1).is_err());
    }

    /// ## 协议健壮性：缺少冒号的头部行
    #[test]
    fn test_malformed_header_line() {
        let body = format!(
            "--{}\r\nContent-Disposition form-data; name=\"a\"\r\n\r\nvalue\r\n{}",
            BOUNDARY,
            closing()
        );
        let err = parse_multipart(body.as_bytes(), BOUNDARY, 10).err().unwrap();
        assert!(matches!(err, Exception::MalformedHeaderLine(_)));
        assert!(err.is_bad_request());
    }

    /// ## 协议健壮性：Content-Type 缺少 boundary 参数
    #[test]
    fn test_content_type_without_boundary() {
        let config = ParserConfig::new();
        assert_eq!(
            MultipartParser::from_content_type("multipart/form-data", &config).err(),
            Some(Exception::MissingBoundary)
        );
        assert_eq!(
            MultipartParser::from_content_type("multipart/form-data; boundary=\"\"", &config)
                .err(),
            Some(Exception::MissingBoundary)
        );
    }

    /// ## 资源耗尽：超大上传文件必须转存到磁盘
    #[tokio::test]
    async fn test_large_upload_is_spooled() {
        let payload = vec![b'A'; 64 * 1024];
        let mut body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"blob\"; filename=\"blob.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(&payload);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(closing().as_bytes());

        let config = ParserConfig::new().with_spool_max_size(1024);
        let form = MultipartParser::new(BOUNDARY, &config).parse(&body).unwrap();
        let upload = form.file("blob").unwrap();
        assert!(upload.is_rolled());
        assert_eq!(upload.size().await.unwrap(), payload.len() as u64);
        assert_eq!(upload.read(None).await.unwrap(), payload);
        form.close().await.unwrap();
        assert!(upload.is_closed());
    }

    /// ## 编码攻击：声明了无法识别的字符集
    #[test]
    fn test_unknown_charset() {
        let body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"a\"\r\n\
             Content-Type: text/plain; charset=x-evil\r\n\r\nvalue\r\n{}",
            BOUNDARY,
            closing()
        );
        assert_eq!(
            parse_multipart(body.as_bytes(), BOUNDARY, 10).err(),
            Some(Exception::UnsupportedCharset("x-evil".to_string()))
        );
    }

    /// ## 编码攻击：文本字段不是合法的 UTF-8
    #[test]
    fn test_invalid_utf8_text() {
        let mut body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"bad\"\r\n\r\n",
            BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(closing().as_bytes());
        assert_eq!(
            parse_multipart(&body, BOUNDARY, 10).err(),
            Some(Exception::InvalidEncoding {
                field: "bad".to_string()
            })
        );
    }

    /// ## 注入攻击：文件名中混入错误转义的引号
    #[test]
    fn test_misescaped_quote_in_filename() {
        let body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"f\"; filename=\"evil\\\"name.txt\"\r\n\r\ndata\r\n{}",
            BOUNDARY,
            closing()
        );
        let form = parse_multipart(body.as_bytes(), BOUNDARY, 10).unwrap();
        assert_eq!(form.file("f").unwrap().filename(), "evil\"name.txt");
    }

    /// ## 协议健壮性：缺少 name 的分段被忽略，缺少正文的分段得到空值
    #[test]
    fn test_nameless_and_bodiless_parts() {
        let body = format!(
            "--{}\r\nContent-Disposition: form-data\r\n\r\nignored\r\n\
             --{}\r\nContent-Disposition: form-data; name=\"empty\"\r\n\r\n\r\n{}",
            BOUNDARY,
            BOUNDARY,
            closing()
        );
        let form = parse_multipart(body.as_bytes(), BOUNDARY, 10).unwrap();
        assert_eq!(form.names(), vec!["empty"]);
        assert!(matches!(form.get("empty").unwrap().last(), Some(FormValue::Empty)));
    }

    /// ## 注入攻击：畸形 Cookie 头部不会导致失败
    #[test]
    fn test_hostile_cookie_strings() {
        let cookies = parse_cookie_string("a=1; ;;; =; \"\\\"; b=\"\\042x\\042\"; c");
        assert_eq!(cookies.get("a"), Some(&"1".to_string()));
        assert_eq!(cookies.get("b"), Some(&"\"x\"".to_string()));
        assert_eq!(cookies.get(""), Some(&"c".to_string()));
    }
}
