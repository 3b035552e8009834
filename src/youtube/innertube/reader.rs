//! InnerTube レスポンスの null 安全な読み取り
//!
//! ペルソナや時期によってレスポンスの形が変わるため、
//! 途中のキーが欠けていても失敗せず `Option` を返す。
//! 必須フィールドだけ `require` で明示的に要求し、
//! 欠落時はルートからのフィールドパスを持ったエラーを返す。

use serde_json::Value;
use thiserror::Error;

use crate::youtube::errors::YouTubeError;

/// 必須フィールドの欠落
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required field '{path}' is missing")]
pub struct FieldMissing {
    pub path: String,
}

impl From<FieldMissing> for YouTubeError {
    fn from(err: FieldMissing) -> Self {
        YouTubeError::malformed(err.path)
    }
}

/// JSON値への読み取り専用ビュー（ルートからのパス付き）
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: String::new(),
        }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// ルートからのフィールドパス（例: "contents[0].itemSectionRenderer"）
    pub fn path(&self) -> &str {
        &self.path
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// オブジェクトのキーを読む（無ければNone）
    pub fn get(&self, key: &str) -> Option<Node<'a>> {
        let value = self.value.as_object()?.get(key)?;
        if value.is_null() {
            return None;
        }
        Some(Node {
            value,
            path: self.child_path(key),
        })
    }

    /// ドット区切りのパスを順にたどる（例: "continuationEndpoint.continuationCommand.token"）
    pub fn at(&self, dotted: &str) -> Option<Node<'a>> {
        dotted
            .split('.')
            .try_fold(self.clone(), |node, key| node.get(key))
    }

    pub fn index(&self, i: usize) -> Option<Node<'a>> {
        let value = self.value.as_array()?.get(i)?;
        Some(Node {
            value,
            path: format!("{}[{}]", self.path, i),
        })
    }

    /// 配列の各要素のビュー（配列でなければNone）
    pub fn array(&self) -> Option<Vec<Node<'a>>> {
        let items = self.value.as_array()?;
        Some(
            items
                .iter()
                .enumerate()
                .map(|(i, value)| Node {
                    value,
                    path: format!("{}[{}]", self.path, i),
                })
                .collect(),
        )
    }

    pub fn array_or_empty(&self) -> Vec<Node<'a>> {
        self.array().unwrap_or_default()
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            Value::Number(n) => n.as_u64(),
            // InnerTube は数値を文字列で返すことが多い
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    /// 必須フィールドを読む
    pub fn require(&self, key: &str) -> Result<Node<'a>, FieldMissing> {
        self.get(key).ok_or_else(|| FieldMissing {
            path: self.child_path(key),
        })
    }

    /// ドット区切りの必須パス。欠落した最初の位置をパスとして返す。
    pub fn require_at(&self, dotted: &str) -> Result<Node<'a>, FieldMissing> {
        dotted
            .split('.')
            .try_fold(self.clone(), |node, key| node.require(key))
    }

    /// 必須の文字列フィールド
    pub fn require_str(&self, key: &str) -> Result<&'a str, FieldMissing> {
        self.require(key)?.as_str().ok_or_else(|| FieldMissing {
            path: self.child_path(key),
        })
    }

    /// 必須の配列フィールド
    pub fn require_array(&self, key: &str) -> Result<Vec<Node<'a>>, FieldMissing> {
        self.require(key)?.array().ok_or_else(|| FieldMissing {
            path: self.child_path(key),
        })
    }

    /// 部分木を深さ優先で探索し、指定キーの値をすべて返す
    ///
    /// セクションの入れ子の深さがペルソナごとに異なるため、位置ではなく
    /// キー名で探す場合に使う。
    pub fn find_all(&self, key: &str) -> Vec<Node<'a>> {
        let mut found = Vec::new();
        self.collect_key(key, &mut found);
        found
    }

    fn collect_key(&self, key: &str, found: &mut Vec<Node<'a>>) {
        match self.value {
            Value::Object(map) => {
                for (k, value) in map {
                    let child = Node {
                        value,
                        path: self.child_path(k),
                    };
                    if k == key {
                        found.push(child.clone());
                    }
                    child.collect_key(key, found);
                }
            }
            Value::Array(_) => {
                for child in self.array_or_empty() {
                    child.collect_key(key, found);
                }
            }
            _ => {}
        }
    }
}
