//! 解析核心的性质测试

use proptest::prelude::*;
use webcore::{
    parse_multipart, parse_query_string, parsers::urlencode, MultiDict, QueryParams, URL,
};

fn pairs_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((any::<String>(), any::<String>()), 0..8)
}

proptest! {
    /// 编码后的查询串再解析回来，得到原来的键值对
    #[test]
    fn prop_query_string_round_trip(pairs in pairs_strategy()) {
        let encoded = urlencode(&pairs);
        prop_assert_eq!(parse_query_string(&encoded), pairs);
    }

    /// 解析是幂等的：重新编码不会改变查询串
    #[test]
    fn prop_query_reencoding_is_stable(pairs in pairs_strategy()) {
        let once = QueryParams::from_pairs(pairs).to_query();
        let twice = QueryParams::from_query(&once).to_query();
        prop_assert_eq!(once, twice);
    }

    /// 单值查询总是等于全部值中的最后一个
    #[test]
    fn prop_multidict_get_is_last(pairs in prop::collection::vec(("[a-c]", "[0-9]{1,3}"), 0..16)) {
        let dict: MultiDict<String, String> = pairs.iter().cloned().collect();
        for key in ["a", "b", "c"] {
            let key = key.to_string();
            prop_assert_eq!(dict.get(&key), dict.get_all(&key).last().copied());
        }
    }

    /// multipart 文本字段按顺序保留
    #[test]
    fn prop_multipart_text_fields(values in prop::collection::vec("[a-zA-Z0-9 ,.]{1,40}", 1..12)) {
        let boundary = "prop-boundary";
        let mut body = String::new();
        for (i, value) in values.iter().enumerate() {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"f{}\"\r\n\r\n{}\r\n",
                boundary, i, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", boundary));

        let form = parse_multipart(body.as_bytes(), boundary, values.len()).unwrap();
        prop_assert_eq!(form.len(), values.len());
        for (i, value) in values.iter().enumerate() {
            prop_assert_eq!(form.text(&format!("f{}", i)), Some(value.as_str()));
        }
    }

    /// URL 的字符串形式就是构造它的字符串
    #[test]
    fn prop_url_display_is_input(path in "(/[a-z0-9]{1,8}){0,4}", query in "([a-z]=[0-9]){0,1}") {
        let raw = format!("https://example.org{}?{}", path, query);
        let url = URL::new(&raw);
        prop_assert_eq!(url.to_string(), raw.clone());
        prop_assert_eq!(url.path(), path.as_str());
        prop_assert_eq!(url.query(), query.as_str());
    }
}
