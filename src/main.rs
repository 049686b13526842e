// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # form-inspect
//!
//! 命令行工具：读取一个保存在磁盘上的请求体，按给定的 `Content-Type` 解析表单并打印各字段。
//!
//! ```text
//! form-inspect <content-type> <body-file> [parser.toml]
//! ```
//!
//! 日志配置优先读取 `config/log4rs.yaml`，文件不存在时输出到控制台。

use std::{path::Path, process};

use bytes::Bytes;
use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use webcore::{FieldValue, FormValue, ParserConfig, Request, Scope};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const USAGE: &str = "用法：form-inspect <content-type> <body-file> [parser.toml]";

/// 初始化日志系统：有 YAML 配置时按配置，否则只输出到控制台
fn init_logging() {
    if Path::new(LOG_CONFIG).exists() {
        if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
            eprintln!("无法加载日志配置{}：{}", LOG_CONFIG, e);
            process::exit(1);
        }
        return;
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("无法初始化日志系统：{}", e);
            }
        }
        Err(e) => eprintln!("日志配置无效：{}", e),
    }
}

fn describe(value: &FormValue) -> String {
    match value {
        FormValue::Text(text) => format!("{:?}", text),
        FormValue::File(file) => format!(
            "<file {:?}, content-type {:?}, {}>",
            file.filename(),
            file.content_type().unwrap_or_default(),
            if file.is_rolled() { "on disk" } else { "in memory" }
        ),
        FormValue::Empty => "<empty>".to_string(),
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("{}", USAGE);
        process::exit(2);
    }
    let content_type = &args[1];
    let body_path = &args[2];

    let config = match args.get(3) {
        Some(path) => match ParserConfig::from_toml(path) {
            Ok(config) => {
                info!("配置文件{}已载入", path);
                config
            }
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        },
        None => ParserConfig::new(),
    };
    info!(
        "分段上限{}，内存阈值{}字节，默认字符集{}",
        config.max_parts(),
        config.spool_max_size(),
        config.default_charset()
    );

    let body = match tokio::fs::read(body_path).await {
        Ok(body) => body,
        Err(e) => {
            error!("无法读取请求体文件{}：{}", body_path, e);
            process::exit(1);
        }
    };
    info!("读取请求体{}字节", body.len());

    let scope = Scope {
        headers: vec![(b"content-type".to_vec(), content_type.as_bytes().to_vec())],
        ..Scope::default()
    };
    let mut request = Request::new(scope, Bytes::from(body), 0);

    let form = match request.form(&config) {
        Ok(form) => form,
        Err(e) => {
            error!("表单解析失败：{}", e);
            process::exit(1);
        }
    };
    for (name, value) in form.fields() {
        match value {
            FieldValue::Scalar(value) => println!("{} = {}", name, describe(value)),
            FieldValue::Multi(values) => {
                for (index, value) in values.iter().enumerate() {
                    println!("{}[{}] = {}", name, index, describe(value));
                }
            }
        }
    }
    info!("共{}个字段，{}个文件", form.len(), form.files().len());

    if let Err(e) = request.close_uploads().await {
        error!("{}", e);
        process::exit(1);
    }
}
