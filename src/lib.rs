//! memopack — компактный бинарный формат сериализации на указателях
//! для обобщённого дерева значений, похожего на JSON.
//!
//! ## Архитектура
//!
//! - [`tags`] — константы однобайтовых тегов формата
//! - [`bits`] — упаковка булевых последовательностей в битсет
//! - [`inline`] — inline tagged pointer: малые скаляры прямо в слоте
//! - [`encode`] — арена-энкодер с выравниванием, интернированием строк
//!   и backpatch-протоколом для вложенных структур
//! - [`decode`] — зеркальный декодер над неизменяемым буфером
//! - [`error`] — типы ошибок кодирования и декодирования
//!
//! Формат полностью little-endian: однобайтовые теги, 4-байтовые
//! смещения и количества. Составные значения хранят непрерывный
//! заголовок и таблицу reference slot'ов, а детей дописывают дальше
//! по потоку — декодер может прочитать любое поддерево, не разбирая
//! его детей заранее.
//!
//! ## Пример
//!
//! ```
//! use memopack::{decode, encode, Dict, Value};
//!
//! let mut doc = Dict::new();
//! doc.insert("txt".into(), Value::from("abc"));
//! doc.insert("int".into(), Value::from(123i64));
//! doc.insert("lst".into(), Value::Array(vec![
//!     Value::from(1i64),
//!     Value::from(true),
//!     Value::from("love"),
//! ]));
//!
//! let bytes = encode(&Value::Dict(doc.clone())).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), Value::Dict(doc));
//! ```

/// Упаковка битсетов.
pub mod bits;
/// Десериализация из бинарного формата.
pub mod decode;
/// Сериализация в бинарный формат.
pub mod encode;
/// Типы ошибок кодека.
pub mod error;
/// Inline-кодирование малых скаляров в reference slot.
pub mod inline;
/// Константы тегов формата.
pub mod tags;
/// Обобщённое дерево значений.
pub mod value;

pub use decode::{decode, MemoReader};
pub use encode::{encode, encode_with_options, EncodeOptions, MemoWriter, MAX_SLOT_OFFSET};
pub use error::{DecodeError, EncodeError};
pub use value::{Dict, Value};
