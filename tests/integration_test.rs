use std::collections::HashMap;

use bytes::Bytes;
use webcore::{
    compile_path, Address, FieldValue, ParserConfig, PathValue, Replace, Request, Scope, URL,
};

/// 构造一个带请求体的 scope
fn scope(path: &str, query: &str, headers: &[(&str, &str)]) -> Scope {
    Scope {
        scheme: "https".to_string(),
        server: Some(Address::new("backend.internal", 8443)),
        root_path: String::new(),
        path: path.to_string(),
        query_string: query.as_bytes().to_vec(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect(),
    }
}

fn multipart_body(boundary: &str) -> String {
    format!(
        concat!(
            "--{b}\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "Quarterly report\r\n",
            "--{b}\r\n",
            "Content-Disposition: form-data; name=\"tags\"\r\n",
            "\r\n",
            "finance\r\n",
            "--{b}\r\n",
            "Content-Disposition: form-data; name=\"tags\"\r\n",
            "\r\n",
            "q3\r\n",
            "--{b}\r\n",
            "Content-Disposition: form-data; name=\"attachment\"; filename*=utf-8''r%C3%A9sum%C3%A9.csv\r\n",
            "Content-Type: text/csv\r\n",
            "\r\n",
            "a,b\n1,2\r\n",
            "--{b}--\r\n"
        ),
        b = boundary
    )
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// 完整流程：路由匹配、查询参数、Cookie、multipart 表单、反向生成 URL
    #[tokio::test]
    async fn test_upload_request_end_to_end() {
        let route = compile_path("/projects/{project:int}/reports").unwrap();
        let body = multipart_body("frontier");
        let mut request = Request::new(
            scope(
                "/projects/17/reports",
                "draft=1&notify=alice&notify=bob",
                &[
                    ("Host", "reports.example.com"),
                    ("Content-Type", "multipart/form-data; boundary=frontier"),
                    ("Cookie", "session=\"abc\\054def\"; lang=en"),
                ],
            ),
            Bytes::from(body),
            42,
        );

        // 路由
        let params = route.matches(request.url().path()).unwrap();
        assert_eq!(params["project"], PathValue::Int(17));

        // URL 与查询参数
        assert_eq!(
            request.url(),
            "https://reports.example.com/projects/17/reports?draft=1&notify=alice&notify=bob"
        );
        let query = request.query_params();
        assert_eq!(query.get_str("notify"), Some("bob"));
        assert_eq!(query.keys(), vec!["draft", "notify"]);

        // Cookie
        let cookies = request.cookies();
        assert_eq!(cookies["session"], "abc,def");
        assert_eq!(cookies["lang"], "en");

        // 表单
        let config = ParserConfig::new();
        let form = request.form(&config).unwrap();
        assert_eq!(form.names(), vec!["title", "tags", "attachment"]);
        assert_eq!(form.text("title"), Some("Quarterly report"));
        match form.get("tags").unwrap() {
            FieldValue::Multi(values) => {
                let tags: Vec<&str> = values.iter().filter_map(|v| v.as_text()).collect();
                assert_eq!(tags, vec!["finance", "q3"]);
            }
            other => panic!("Expected a multi-valued field, got {:?}", other),
        }
        let attachment = form.file("attachment").unwrap();
        assert_eq!(attachment.filename(), "résumé.csv");
        assert_eq!(attachment.content_type(), Some("text/csv".to_string()));
        assert_eq!(attachment.read(None).await.unwrap(), b"a,b\n1,2");

        // 反向生成并拼出重定向地址
        let mut reverse = HashMap::new();
        reverse.insert("project".to_string(), PathValue::Int(18));
        let path = route.url_path_for(&reverse).unwrap();
        let redirect = request
            .url()
            .replace(Replace::new().path(&path))
            .include_query_params(&[("draft", "0")]);
        assert_eq!(
            redirect,
            "https://reports.example.com/projects/18/reports?draft=0&notify=alice&notify=bob"
        );

        request.close_uploads().await.unwrap();
    }

    /// 没有 host 头部时使用 server 地址，非默认端口被保留
    #[test]
    fn test_server_address_fallback() {
        let request = Request::new(scope("/health", "", &[]), Bytes::new(), 1);
        assert_eq!(request.url(), "https://backend.internal:8443/health");
        assert!(request.url().is_secure());
        assert_eq!(request.url().hostname(), Some("backend.internal".to_string()));
    }

    /// urlencoded 表单与查询参数的组合
    #[test]
    fn test_url_encoded_submission() {
        let mut request = Request::new(
            scope(
                "/search",
                "page=2",
                &[("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")],
            ),
            Bytes::from_static(b"q=rust%20web&filter=new&filter=&empty"),
            2,
        );
        let form = request.form(&ParserConfig::new()).unwrap();
        assert_eq!(form.text("q"), Some("rust web"));
        assert_eq!(form.get("filter").map(|v| v.len()), Some(2));
        assert_eq!(form.text("empty"), Some(""));

        let next = request.url().include_query_params(&[("page", 3)]);
        assert_eq!(next.query(), "page=3");
    }

    /// 主机模板与路径模板配合使用
    #[test]
    fn test_host_routing() {
        let host_route = compile_path("{tenant}.example.com:443").unwrap();
        let url = URL::new("https://acme.example.com/dashboard");
        let hostname = url.hostname().unwrap();
        let params = host_route.matches(&hostname).unwrap();
        assert_eq!(params["tenant"], PathValue::Str("acme".to_string()));
        assert!(host_route.matches("acme.example.org").is_none());
    }
}
