//! Определение тегов бинарного формата memopack.
//!
//! Каждое значение помечается однобайтовым тегом. Теги выбраны из
//! печатаемых ASCII-символов, чтобы дамп было удобно читать в hex-дампе.
//! Используются в модулях `encode` и `decode`.

/// Строка: длина u32, тело UTF-8, завершающий `\0`.
pub const TAG_TXT: u8 = b'a';
/// 4-байтовое смещение на ранее записанное тело строки.
pub const TAG_TXT_PTR: u8 = b'A';

/// Маркер типа элемента для битсет-массива булевых значений.
pub const TAG_BOOL: u8 = b'b';
/// Булево `false`, без полезной нагрузки.
pub const TAG_FALSE: u8 = b'0';
/// Булево `true`, без полезной нагрузки.
pub const TAG_TRUE: u8 = b'1';

/// IEEE 754 double, 8 байт.
pub const TAG_F64: u8 = b'd';

/// Целые: little-endian, дополнительный код.
pub const TAG_I32: u8 = b'i';
pub const TAG_I64: u8 = b'j';

/// Null, без полезной нагрузки.
pub const TAG_NULL: u8 = b'-';

/// Маркер «каждый элемент помечен собственным тегом».
pub const TAG_UNTYPED: u8 = b'_';

/// Составной массив: тег типа элемента + количество + элементы.
pub const TAG_ARRAY: u8 = b'*';

/// Словарь: тег типа ключа + тег типа значения + количество
/// + две таблицы смещений (ключи, затем значения).
pub const TAG_DICT: u8 = b':';
/// Декодируется идентично [`TAG_DICT`]; порядок сортировки объявлен,
/// но энкодером не производится.
pub const TAG_SORTED_DICT: u8 = b'<';

/// Заполнитель выравнивания; декодер пропускает нулевые байты
/// при поиске тега.
pub const TAG_PADDING: u8 = b'\0';

// Зарезервированные теги: объявлены для совместимости по формату,
// но недостижимы через Value и не кодируются/не декодируются.

/// Зарезервировано: число с плавающей точкой 128 бит.
pub const TAG_F128: u8 = b'e';
/// Зарезервировано: число с плавающей точкой 32 бита.
pub const TAG_F32: u8 = b'f';
/// Зарезервировано: целые 8/16 бит.
pub const TAG_I8: u8 = b'g';
pub const TAG_I16: u8 = b'h';
/// Зарезервировано: беззнаковые целые.
pub const TAG_U8: u8 = b'x';
pub const TAG_U16: u8 = b'y';
pub const TAG_U32: u8 = b'u';
pub const TAG_U64: u8 = b'z';
/// Зарезервировано: запись фиксированного размера + <ID>.
pub const TAG_RECORD: u8 = b'!';
/// Зарезервировано: разреженная запись + <ID> + <VTABLE>.
pub const TAG_SPARSE: u8 = b'?';
/// Зарезервировано: обобщённый указатель + <V>.
pub const TAG_PTR: u8 = b'&';
/// Зарезервировано: словарь, сортированный по хешу ключа.
pub const TAG_HASH_DICT: u8 = b'#';
