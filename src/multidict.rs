//! 有序多值字典。
//!
//! 查询参数、表单字段都可能出现同名键。[`MultiDict`] 保存所有 `(key, value)`
//! 对的插入顺序，单值查询以最后一次插入为准，`get_all` 按插入顺序返回全部值。

use std::collections::HashMap;
use std::hash::Hash;

use crate::parsers::{parse_query_string, urlencode};

/// 表单字段的取值：只出现一次时为标量，多次出现时为列表。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<T> {
    Scalar(T),
    Multi(Vec<T>),
}

impl<T> FieldValue<T> {
    /// 单个值折叠为标量，多个值保留为列表，空列表返回 `None`。
    pub fn from_values(mut values: Vec<T>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(FieldValue::Scalar),
            _ => Some(FieldValue::Multi(values)),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, FieldValue::Multi(_))
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValue::Scalar(_) => 1,
            FieldValue::Multi(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 最后一个值（标量即其本身）
    pub fn last(&self) -> Option<&T> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            FieldValue::Multi(values) => values.last(),
        }
    }

    pub fn values(&self) -> Vec<&T> {
        match self {
            FieldValue::Scalar(value) => vec![value],
            FieldValue::Multi(values) => values.iter().collect(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            FieldValue::Scalar(value) => vec![value],
            FieldValue::Multi(values) => values,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> FieldValue<U> {
        match self {
            FieldValue::Scalar(value) => FieldValue::Scalar(f(value)),
            FieldValue::Multi(values) => FieldValue::Multi(values.into_iter().map(f).collect()),
        }
    }
}

/// 有序多值字典。
#[derive(Debug, Clone, PartialEq)]
pub struct MultiDict<K, V> {
    items: Vec<(K, V)>,
}

/// 查询参数
pub type QueryParams = MultiDict<String, String>;

impl<K, V> Default for MultiDict<K, V> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<K: Eq + Hash + Clone, V> MultiDict<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Self {
            items: pairs.into_iter().collect(),
        }
    }

    /// 最后一次插入的值
    pub fn get(&self, key: &K) -> Option<&V> {
        self.items
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// 按插入顺序返回全部值
    pub fn get_all(&self, key: &K) -> Vec<&V> {
        self.items
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    pub fn append(&mut self, key: K, value: V) {
        self.items.push((key, value));
    }

    /// 设置单个值：替换第一次出现的位置上的值，并删除其余同名项。
    pub fn insert(&mut self, key: K, value: V) {
        match self.items.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                let mut index = 0;
                self.items.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
                self.items[first].1 = value;
            }
            None => self.items.push((key, value)),
        }
    }

    /// 批量更新：被触及的键先以第一个新值原位替换旧值，同一批里的后续值追加到末尾。
    pub fn update<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        let mut touched: Vec<K> = Vec::new();
        for (key, value) in pairs {
            if touched.contains(&key) {
                self.append(key, value);
            } else {
                touched.push(key.clone());
                self.insert(key, value);
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        self.items.extend(pairs);
    }

    /// 删除键的全部出现，返回是否删除了任何项
    pub fn remove(&mut self, key: &K) -> bool {
        let before = self.items.len();
        self.items.retain(|(k, _)| k != key);
        before != self.items.len()
    }

    /// 删除键的全部出现并返回最后一个值
    pub fn pop(&mut self, key: &K) -> Option<V> {
        self.pop_all(key).pop()
    }

    /// 删除键的全部出现并按插入顺序返回这些值
    pub fn pop_all(&mut self, key: &K) -> Vec<V> {
        let mut popped = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for (k, v) in self.items.drain(..) {
            if k == *key {
                popped.push(v);
            } else {
                kept.push((k, v));
            }
        }
        self.items = kept;
        popped
    }

    /// 弹出最后插入的一项
    pub fn pop_item(&mut self) -> Option<(K, V)> {
        self.items.pop()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// 不重复的键，按首次出现排序
    pub fn keys(&self) -> Vec<&K> {
        let mut keys: Vec<&K> = Vec::new();
        for (k, _) in &self.items {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
        keys
    }

    /// 每个键的最后一个值
    pub fn values(&self) -> Vec<&V> {
        self.items().into_iter().map(|(_, v)| v).collect()
    }

    /// 每个键与其最后一个值
    pub fn items(&self) -> Vec<(&K, &V)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
            .collect()
    }

    /// 全部键值对，包括重复键
    pub fn multi_items(&self) -> &[(K, V)] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (K, V)> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按键分组，保持首次出现的顺序，并把单值折叠为标量。
    pub fn into_grouped(self) -> Vec<(K, FieldValue<V>)> {
        let mut order: Vec<K> = Vec::new();
        let mut groups: HashMap<K, Vec<V>> = HashMap::new();
        for (k, v) in self.items {
            if !groups.contains_key(&k) {
                order.push(k.clone());
            }
            groups.entry(k).or_default().push(v);
        }
        order
            .into_iter()
            .filter_map(|k| {
                let values = groups.remove(&k)?;
                FieldValue::from_values(values).map(|value| (k, value))
            })
            .collect()
    }
}

impl<K, V> IntoIterator for MultiDict<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for MultiDict<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl MultiDict<String, String> {
    /// 从查询串构建
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(parse_query_string(query))
    }

    /// 编码回查询串
    pub fn to_query(&self) -> String {
        urlencode(&self.items)
    }

    /// 以 `&str` 查询，免去调用方构造 `String`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
