//! 路径参数转换器。
//!
//! 每种转换器提供三样东西：嵌入路由正则的片段、把匹配到的文本转成类型化的值、
//! 以及反向渲染时把值转回路径段。转换器按类型名登记在 [`ConvertorRegistry`] 中，
//! 注册表在进程启动时构建，此后只读。

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use crate::exception::Exception;

use lazy_static::lazy_static;

/// 128 位 UUID，文本形式为小写的 8-4-4-4-12 十六进制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid(u128);

impl Uuid {
    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl FromStr for Uuid {
    type Err = Exception;

    /// 接受带或不带连字符、大小写不限、可选 `{}` 或 `urn:uuid:` 包裹的形式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("urn:uuid:").unwrap_or(s);
        let trimmed = trimmed
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or(trimmed);
        let hex: String = trimmed.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Exception::InvalidUuid(s.to_string()));
        }
        u128::from_str_radix(&hex, 16)
            .map(Uuid)
            .map_err(|_| Exception::InvalidUuid(s.to_string()))
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = format!("{:032x}", self.0);
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

/// 路径参数转换后的值
#[derive(Debug, Clone, PartialEq)]
pub enum PathValue {
    Str(String),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
}

impl PathValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PathValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PathValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PathValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            PathValue::Uuid(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for PathValue {
    fn from(value: &str) -> Self {
        PathValue::Str(value.to_string())
    }
}

impl From<String> for PathValue {
    fn from(value: String) -> Self {
        PathValue::Str(value)
    }
}

impl From<i64> for PathValue {
    fn from(value: i64) -> Self {
        PathValue::Int(value)
    }
}

impl From<f64> for PathValue {
    fn from(value: f64) -> Self {
        PathValue::Float(value)
    }
}

impl From<Uuid> for PathValue {
    fn from(value: Uuid) -> Self {
        PathValue::Uuid(value)
    }
}

/// 路径段与类型化值之间的编解码器
pub trait Convertor: Send + Sync {
    /// 嵌入路由正则的片段
    fn regex(&self) -> &str;

    /// 把正则匹配到的文本转成值
    fn convert(&self, value: &str) -> Result<PathValue, Exception>;

    /// 反向渲染：把值写回路径段，违反取值约束时报错
    fn to_string(&self, value: &PathValue) -> Result<String, Exception>;
}

pub struct StringConvertor;

impl Convertor for StringConvertor {
    fn regex(&self) -> &str {
        "[^/]+"
    }

    fn convert(&self, value: &str) -> Result<PathValue, Exception> {
        Ok(PathValue::Str(value.to_string()))
    }

    fn to_string(&self, value: &PathValue) -> Result<String, Exception> {
        let value = match value {
            PathValue::Str(value) => value.clone(),
            PathValue::Int(value) => value.to_string(),
            PathValue::Float(value) => value.to_string(),
            PathValue::Uuid(value) => value.to_string(),
        };
        if value.contains('/') {
            return Err(Exception::PathSeparator);
        }
        if value.is_empty() {
            return Err(Exception::EmptySegment);
        }
        Ok(value)
    }
}

/// 可以跨越 `/` 的路径尾部
pub struct PathConvertor;

impl Convertor for PathConvertor {
    fn regex(&self) -> &str {
        ".*"
    }

    fn convert(&self, value: &str) -> Result<PathValue, Exception> {
        Ok(PathValue::Str(value.to_string()))
    }

    fn to_string(&self, value: &PathValue) -> Result<String, Exception> {
        match value {
            PathValue::Str(value) => Ok(value.clone()),
            PathValue::Int(value) => Ok(value.to_string()),
            PathValue::Float(value) => Ok(value.to_string()),
            PathValue::Uuid(value) => Ok(value.to_string()),
        }
    }
}

pub struct IntegerConvertor;

impl Convertor for IntegerConvertor {
    fn regex(&self) -> &str {
        "[0-9]+"
    }

    fn convert(&self, value: &str) -> Result<PathValue, Exception> {
        value
            .parse::<i64>()
            .map(PathValue::Int)
            .map_err(|_| Exception::TypeMismatch { expected: "integer" })
    }

    fn to_string(&self, value: &PathValue) -> Result<String, Exception> {
        match value {
            PathValue::Int(value) if *value < 0 => Err(Exception::NegativeValue),
            PathValue::Int(value) => Ok(value.to_string()),
            _ => Err(Exception::TypeMismatch { expected: "integer" }),
        }
    }
}

pub struct FloatConvertor;

impl Convertor for FloatConvertor {
    fn regex(&self) -> &str {
        r"[0-9]+(\.[0-9]+)?"
    }

    fn convert(&self, value: &str) -> Result<PathValue, Exception> {
        value
            .parse::<f64>()
            .map(PathValue::Float)
            .map_err(|_| Exception::TypeMismatch { expected: "float" })
    }

    /// 最多 20 位小数，去掉末尾的 `0` 和小数点
    fn to_string(&self, value: &PathValue) -> Result<String, Exception> {
        let value = match value {
            PathValue::Float(value) => *value,
            PathValue::Int(value) => *value as f64,
            _ => return Err(Exception::TypeMismatch { expected: "float" }),
        };
        if value.is_nan() {
            return Err(Exception::NotANumber);
        }
        if value < 0.0 {
            return Err(Exception::NegativeValue);
        }
        if value.is_infinite() {
            return Err(Exception::InfiniteValue);
        }
        let rendered = format!("{:.20}", value);
        Ok(rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string())
    }
}

pub struct UuidConvertor;

impl Convertor for UuidConvertor {
    fn regex(&self) -> &str {
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
    }

    fn convert(&self, value: &str) -> Result<PathValue, Exception> {
        value.parse::<Uuid>().map(PathValue::Uuid)
    }

    fn to_string(&self, value: &PathValue) -> Result<String, Exception> {
        match value {
            PathValue::Uuid(value) => Ok(value.to_string()),
            PathValue::Str(value) => Ok(value.parse::<Uuid>()?.to_string()),
            _ => Err(Exception::TypeMismatch { expected: "uuid" }),
        }
    }
}

/// 按类型名索引的转换器表
#[derive(Clone)]
pub struct ConvertorRegistry {
    convertors: HashMap<String, Arc<dyn Convertor>>,
}

impl Default for ConvertorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("str", StringConvertor);
        registry.register("path", PathConvertor);
        registry.register("int", IntegerConvertor);
        registry.register("float", FloatConvertor);
        registry.register("uuid", UuidConvertor);
        registry
    }
}

impl ConvertorRegistry {
    pub fn empty() -> Self {
        Self {
            convertors: HashMap::new(),
        }
    }

    /// 登记或覆盖一个类型名
    pub fn register<C: Convertor + 'static>(&mut self, name: &str, convertor: C) {
        self.convertors.insert(name.to_string(), Arc::new(convertor));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Convertor>, Exception> {
        self.convertors
            .get(name)
            .cloned()
            .ok_or_else(|| Exception::UnknownConvertor(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.convertors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.convertors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

lazy_static! {
    /// 内置的五种转换器，进程内只读
    pub static ref DEFAULT_CONVERTORS: ConvertorRegistry = ConvertorRegistry::default();
}
