use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::{
    exception::Exception,
    param::{DEFAULT_CHARSET, DEFAULT_MAX_PARTS, ONE_MEGABYTE},
};

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParserConfig {
    #[serde(default = "default_max_parts")]
    max_parts: usize,
    #[serde(default = "default_spool_max_size")]
    spool_max_size: usize,
    #[serde(default = "default_charset")]
    default_charset: String,
}

fn default_max_parts() -> usize {
    DEFAULT_MAX_PARTS
}

fn default_spool_max_size() -> usize {
    ONE_MEGABYTE // 1MB
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self {
            max_parts: default_max_parts(),
            spool_max_size: default_spool_max_size(),
            default_charset: default_charset(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!("无法打开配置文件{}：{}", filename, e);
                return Err(Exception::ConfigUnreadable(format!("{}: {}", filename, e)));
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}失败：{}", filename, e);
            return Err(Exception::ConfigUnreadable(format!("{}: {}", filename, e)));
        }
        Ok(Self::from_toml_str(&str_val))
    }

    pub fn from_toml_str(str_val: &str) -> Self {
        let mut raw_config: ParserConfig = match toml::from_str(str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                ParserConfig::new()
            }
        };
        if raw_config.max_parts == 0 {
            warn!("max_parts被设置为0，这会拒绝所有multipart请求，因此该值将被改为{}。", DEFAULT_MAX_PARTS);
            raw_config.max_parts = DEFAULT_MAX_PARTS;
        }
        raw_config
    }

    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = max_parts;
        self
    }

    pub fn with_spool_max_size(mut self, spool_max_size: usize) -> Self {
        self.spool_max_size = spool_max_size;
        self
    }
}

impl ParserConfig {
    pub fn max_parts(&self) -> usize {
        self.max_parts
    }

    pub fn spool_max_size(&self) -> usize {
        self.spool_max_size
    }

    pub fn default_charset(&self) -> &str {
        &self.default_charset
    }
}
