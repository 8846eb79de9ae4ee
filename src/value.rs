//! Обобщённое дерево значений, которым обмениваются внешние мосты
//! (JSON/YAML/MessagePack) и кодек memopack.

use indexmap::IndexMap;

/// Словарь с сохранением порядка вставки и уникальными ключами.
pub type Dict = IndexMap<String, Value>;

/// Обобщённое значение, которым обмениваются внешние мосты форматов.
///
/// Перечисление закрыто: гомогенность массива — свойство значения,
/// переданного энкодеру, который никогда не приводит числовые
/// разновидности друг к другу. Для смешанной последовательности
/// используется [`Value::Array`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Значение `null`.
    Null,
    /// Булев скаляр.
    Bool(bool),
    /// 32-битное знаковое целое.
    Int32(i32),
    /// 64-битное знаковое целое.
    Int64(i64),
    /// Число IEEE 754 двойной точности.
    Float64(f64),
    /// Строка UTF-8.
    Str(String),
    /// Последовательность индивидуально тегированных значений.
    Array(Vec<Value>),
    /// Гомогенный массив f64: плотная нагрузка естественной ширины.
    Float64Array(Vec<f64>),
    /// Гомогенный массив i64.
    Int64Array(Vec<i64>),
    /// Гомогенный массив i32.
    Int32Array(Vec<i32>),
    /// Упакованный битсет, 8 булевых значений на байт.
    BoolArray(Vec<bool>),
    /// Строки по ссылке: по одному смещению на элемент.
    StrArray(Vec<String>),
    /// Отображение со строковыми ключами, порядок вставки сохраняется.
    Dict(Dict),
}

impl Value {
    /// Имя разновидности значения для диагностики.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Float64Array(_) => "float64[]",
            Value::Int64Array(_) => "int64[]",
            Value::Int32Array(_) => "int32[]",
            Value::BoolArray(_) => "bool[]",
            Value::StrArray(_) => "string[]",
            Value::Dict(_) => "dict",
        }
    }

    /// Истинно для составных значений, адресующих детей по смещениям.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Value::Array(_)
                | Value::Float64Array(_)
                | Value::Int64Array(_)
                | Value::Int32Array(_)
                | Value::BoolArray(_)
                | Value::StrArray(_)
                | Value::Dict(_)
        )
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Dict> for Value {
    fn from(v: Dict) -> Self {
        Value::Dict(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(1i32).kind(), "int32");
        assert_eq!(Value::from(1i64).kind(), "int64");
        assert_eq!(Value::StrArray(vec![]).kind(), "string[]");
    }

    #[test]
    fn test_compound_classification() {
        assert!(Value::Dict(Dict::new()).is_compound());
        assert!(Value::BoolArray(vec![]).is_compound());
        assert!(!Value::from("txt").is_compound());
        assert!(!Value::Null.is_compound());
    }

    #[test]
    fn test_dict_preserves_insertion_order() {
        let mut d = Dict::new();
        d.insert("z".into(), Value::Null);
        d.insert("a".into(), Value::Null);
        let keys: Vec<_> = d.keys().cloned().collect();
        assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);
    }
}
