//! Сериализация значений `Value` в бинарный формат memopack.
//!
//! Энкодер пишет в append-only арену с единственным растущим курсором.
//! Каждая примитивная запись предваряется выравниванием так, чтобы
//! полезная нагрузка (а не префикс) легла на свою естественную границу.
//! Составные значения записывают фиксированный заголовок, резервируют
//! bound region под таблицу 4-байтовых reference slot'ов, дописывают
//! детей после таблицы и затем заполняют слоты их смещениями
//! (или inline-значениями, см. модуль [`crate::inline`]).

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, trace};
use xxhash_rust::xxh64::xxh64;

use crate::{
    error::EncodeError,
    inline,
    tags::{
        TAG_ARRAY, TAG_BOOL, TAG_DICT, TAG_F64, TAG_FALSE, TAG_I32, TAG_I64, TAG_NULL, TAG_PADDING,
        TAG_TRUE, TAG_TXT, TAG_TXT_PTR, TAG_UNTYPED,
    },
    bits, Dict, Value,
};

/// Размер reference slot'а (и смещения) в байтах.
const PTR_SIZE: usize = 4;

/// Максимальное смещение, умещающееся в reference slot: старший квартет
/// слота зарезервирован под inline-дискриминатор.
pub const MAX_SLOT_OFFSET: u32 = 0x0FFF_FFFF;

/// Опции одной сессии кодирования.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Дедупликация байт-идентичных составных значений: завершённый блок
    /// хешируется, и при точном совпадении с ранее записанным блоком
    /// переиспользуется его смещение.
    pub allow_object_internalisation: bool,
}

/// Сериализует значение в байтовый буфер с опциями по умолчанию.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    encode_with_options(value, EncodeOptions::default())
}

/// Сериализует значение в байтовый буфер.
///
/// Одна сессия кодирования монопольно владеет ареной и таблицами
/// интернирования на всё время жизни.
pub fn encode_with_options(
    value: &Value,
    options: EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = MemoWriter::new(options);
    let root = writer.write_tagged(value)?;
    debug!(
        kind = value.kind(),
        root,
        bytes = writer.buf.len(),
        "encode session complete"
    );
    Ok(writer.into_bytes())
}

/// Зарезервированная под таблицу слотов область арены `[start, stop)`.
///
/// Писатель области обязан закончить ровно на `stop`: выход за границу —
/// дефект предрасчёта размеров, а не ошибка данных, поэтому паника.
struct BoundRegion {
    cursor: usize,
    start: usize,
    stop: usize,
}

impl BoundRegion {
    /// Записывает слот по текущей позиции области (не по курсору арены).
    fn put_slot(&mut self, buf: &mut [u8], slot: u32) {
        assert!(
            self.cursor + PTR_SIZE <= self.stop,
            "bound region [{}, {}) overrun: slot write at {}",
            self.start,
            self.stop,
            self.cursor,
        );
        LittleEndian::write_u32(&mut buf[self.cursor..self.cursor + PTR_SIZE], slot);
        self.cursor += PTR_SIZE;
    }

    fn finish(self) {
        assert!(
            self.cursor == self.stop,
            "bound region [{}, {}) finished at {}",
            self.start,
            self.stop,
            self.cursor,
        );
    }
}

/// Сессия кодирования: арена, таблица интернированных строк и,
/// опционально, таблица интернированных блоков.
pub struct MemoWriter {
    buf: Vec<u8>,
    interned_strings: HashMap<String, u32>,
    /// xxh64 блока -> кандидаты (смещение, длина); сверка по байтам.
    interned_objects: Option<HashMap<u64, Vec<(u32, u32)>>>,
}

impl MemoWriter {
    pub fn new(options: EncodeOptions) -> Self {
        Self {
            buf: Vec::new(),
            interned_strings: HashMap::new(),
            interned_objects: options.allow_object_internalisation.then(HashMap::new),
        }
    }

    /// Забирает готовый буфер, завершая сессию.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Выравнивание: курсор продвигается нулевыми байтами до минимальной
    /// позиции, где `(top + prefix_size) % element_size == 0`. Возвращает
    /// позицию начала записи (включая ведущий тег) — её и хранят слоты.
    fn align(&mut self, element_size: usize, prefix_size: usize) -> u32 {
        let pos = self.buf.len() + prefix_size;
        let rem = pos % element_size;
        if rem != 0 {
            let padded = pos - rem + element_size;
            self.buf.resize(padded - prefix_size, TAG_PADDING);
        }
        self.buf.len() as u32
    }

    fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn put_u32(&mut self, v: u32) {
        let mut raw = [0u8; 4];
        LittleEndian::write_u32(&mut raw, v);
        self.buf.extend_from_slice(&raw);
    }

    fn put_i32(&mut self, v: i32) {
        let mut raw = [0u8; 4];
        LittleEndian::write_i32(&mut raw, v);
        self.buf.extend_from_slice(&raw);
    }

    fn put_i64(&mut self, v: i64) {
        let mut raw = [0u8; 8];
        LittleEndian::write_i64(&mut raw, v);
        self.buf.extend_from_slice(&raw);
    }

    fn put_f64(&mut self, v: f64) {
        let mut raw = [0u8; 8];
        LittleEndian::write_f64(&mut raw, v);
        self.buf.extend_from_slice(&raw);
    }

    /// Резервирует bound region под таблицу слотов и продвигает курсор
    /// арены за неё, чтобы дети дописывались строго после таблицы.
    fn bind(&mut self, size: usize) -> BoundRegion {
        let start = self.buf.len();
        self.buf.resize(start + size, TAG_PADDING);
        BoundRegion {
            cursor: start,
            start,
            stop: start + size,
        }
    }

    /// Сырая запись строки: длина u32, тело UTF-8, завершающий `\0`.
    ///
    /// Повторное содержимое не записывается: таблица интернирования
    /// хранит смещение первого вхождения (на поле длины).
    fn write_str(&mut self, s: &str) -> Result<u32, EncodeError> {
        if let Some(&pos) = self.interned_strings.get(s) {
            trace!(pos, len = s.len(), "interned string hit");
            return Ok(pos);
        }

        let pos = self.align(PTR_SIZE, 0);
        self.interned_strings.insert(s.to_owned(), pos);

        let bytes = s.as_bytes();
        self.put_u32(checked_len(bytes.len())?);
        self.buf.extend_from_slice(bytes);
        self.put_u8(0);
        Ok(pos)
    }

    /// Записывает значение с тегом и возвращает его смещение.
    pub fn write_tagged(&mut self, value: &Value) -> Result<u32, EncodeError> {
        match value {
            Value::Null => {
                let pos = self.align(1, 0);
                self.put_u8(TAG_NULL);
                Ok(pos)
            }
            Value::Bool(b) => {
                let pos = self.align(1, 0);
                self.put_u8(if *b { TAG_TRUE } else { TAG_FALSE });
                Ok(pos)
            }
            Value::Int32(v) => {
                let pos = self.align(4, 1);
                self.put_u8(TAG_I32);
                self.put_i32(*v);
                Ok(pos)
            }
            Value::Int64(v) => {
                let pos = self.align(8, 1);
                self.put_u8(TAG_I64);
                self.put_i64(*v);
                Ok(pos)
            }
            Value::Float64(v) => {
                let pos = self.align(8, 1);
                self.put_u8(TAG_F64);
                self.put_f64(*v);
                Ok(pos)
            }
            Value::Str(s) => self.write_tagged_str(s),
            Value::Float64Array(v) => {
                let pos = self.align(8, 2);
                self.put_u8(TAG_ARRAY);
                self.put_u8(TAG_F64);
                self.align(8, PTR_SIZE);
                self.put_u32(checked_len(v.len())?);
                for x in v {
                    self.put_f64(*x);
                }
                self.finish_block(pos)
            }
            Value::Int64Array(v) => {
                let pos = self.align(8, 2);
                self.put_u8(TAG_ARRAY);
                self.put_u8(TAG_I64);
                self.align(8, PTR_SIZE);
                self.put_u32(checked_len(v.len())?);
                for x in v {
                    self.put_i64(*x);
                }
                self.finish_block(pos)
            }
            Value::Int32Array(v) => {
                let pos = self.align(4, 2);
                self.put_u8(TAG_ARRAY);
                self.put_u8(TAG_I32);
                self.align(4, PTR_SIZE);
                self.put_u32(checked_len(v.len())?);
                for x in v {
                    self.put_i32(*x);
                }
                self.finish_block(pos)
            }
            Value::BoolArray(v) => {
                let pos = self.align(4, 2);
                self.put_u8(TAG_ARRAY);
                self.put_u8(TAG_BOOL);
                self.align(4, 0);
                self.put_u32(checked_len(v.len())?);
                let packed = bits::pack_bits(v);
                self.buf.extend_from_slice(&packed);
                self.finish_block(pos)
            }
            Value::StrArray(v) => self.write_tagged_str_array(v),
            Value::Array(v) => self.write_tagged_untyped_array(v),
            Value::Dict(d) => self.write_tagged_dict(d),
        }
    }

    /// Тегированная строка: `TXT` + тело либо `TXT_PTR` + смещение
    /// ранее записанного тела.
    fn write_tagged_str(&mut self, s: &str) -> Result<u32, EncodeError> {
        let pos = self.align(PTR_SIZE, 1);

        if let Some(&addr) = self.interned_strings.get(s) {
            self.put_u8(TAG_TXT_PTR);
            self.put_u32(addr);
            return Ok(pos);
        }

        self.put_u8(TAG_TXT);
        self.write_str(s)?;
        Ok(pos)
    }

    /// Слот ребёнка: inline-значение, если умещается, иначе смещение
    /// отдельно записанной тегированной ячейки.
    fn write_slot(&mut self, value: &Value) -> Result<u32, EncodeError> {
        if let Some(slot) = inline::try_encode(value) {
            return Ok(slot);
        }
        let offset = self.write_tagged(value)?;
        checked_slot_offset(offset)
    }

    fn write_tagged_untyped_array(&mut self, items: &[Value]) -> Result<u32, EncodeError> {
        let pos = self.align(PTR_SIZE, 2);
        self.put_u8(TAG_ARRAY);
        self.put_u8(TAG_UNTYPED);
        self.put_u32(checked_len(items.len())?);

        let mut region = self.bind(items.len() * PTR_SIZE);
        for item in items {
            let slot = self.write_slot(item)?;
            region.put_slot(&mut self.buf, slot);
        }
        region.finish();

        self.finish_block(pos)
    }

    fn write_tagged_str_array(&mut self, items: &[String]) -> Result<u32, EncodeError> {
        let pos = self.align(PTR_SIZE, 2);
        self.put_u8(TAG_ARRAY);
        self.put_u8(TAG_TXT_PTR);
        self.put_u32(checked_len(items.len())?);

        let mut region = self.bind(items.len() * PTR_SIZE);
        for item in items {
            let offset = self.write_tagged_str(item)?;
            region.put_slot(&mut self.buf, checked_slot_offset(offset)?);
        }
        region.finish();

        self.finish_block(pos)
    }

    /// Словарь: заголовок, затем две таблицы слотов (ключи, значения).
    /// Сначала записываются все ключи, затем все значения — в порядке
    /// вставки.
    fn write_tagged_dict(&mut self, dict: &Dict) -> Result<u32, EncodeError> {
        let pos = self.align(PTR_SIZE, 3);
        self.put_u8(TAG_DICT);
        self.put_u8(TAG_TXT);
        self.put_u8(TAG_UNTYPED);
        self.put_u32(checked_len(dict.len())?);

        let mut region = self.bind(2 * dict.len() * PTR_SIZE);
        for key in dict.keys() {
            let offset = self.write_str(key)?;
            region.put_slot(&mut self.buf, checked_slot_offset(offset)?);
        }
        for value in dict.values() {
            let slot = self.write_slot(value)?;
            region.put_slot(&mut self.buf, slot);
        }
        region.finish();

        self.finish_block(pos)
    }

    /// Интернирование объектов: завершённый блок `[start, top)` сверяется
    /// с ранее записанными; при точном байтовом совпадении арена
    /// усекается до `start`, а слот получает смещение первого вхождения.
    fn finish_block(&mut self, start: u32) -> Result<u32, EncodeError> {
        let Some(table) = self.interned_objects.as_mut() else {
            return Ok(start);
        };

        let begin = start as usize;
        let len = self.buf.len() - begin;
        let hash = xxh64(&self.buf[begin..], 0);

        let candidates = table.entry(hash).or_default();
        for &(off, cand_len) in candidates.iter() {
            let off = off as usize;
            if cand_len as usize == len && self.buf[off..off + len] == self.buf[begin..] {
                self.buf.truncate(begin);
                trace!(offset = off, len, "interned object hit");
                return Ok(off as u32);
            }
        }
        candidates.push((start, len as u32));
        Ok(start)
    }
}

fn checked_len(n: usize) -> Result<u32, EncodeError> {
    u32::try_from(n).map_err(|_| {
        EncodeError::UnsupportedValue(format!("length {n} does not fit in u32"))
    })
}

fn checked_slot_offset(offset: u32) -> Result<u32, EncodeError> {
    if offset > MAX_SLOT_OFFSET {
        return Err(EncodeError::OffsetOverflow(offset));
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use byteorder::{ByteOrder, LittleEndian};

    use super::*;

    fn u32_at(buf: &[u8], pos: usize) -> u32 {
        LittleEndian::read_u32(&buf[pos..pos + 4])
    }

    #[test]
    fn test_write_null() {
        let buf = encode(&Value::Null).unwrap();
        assert_eq!(buf, vec![TAG_NULL]);
    }

    #[test]
    fn test_write_bool() {
        assert_eq!(encode(&Value::Bool(true)).unwrap(), vec![TAG_TRUE]);
        assert_eq!(encode(&Value::Bool(false)).unwrap(), vec![TAG_FALSE]);
    }

    #[test]
    fn test_write_i64_alignment() {
        let buf = encode(&Value::Int64(42)).unwrap();
        // 7 байт заполнителя, тег на 7, нагрузка на границе 8
        assert_eq!(buf.len(), 16);
        assert!(buf[..7].iter().all(|&b| b == TAG_PADDING));
        assert_eq!(buf[7], TAG_I64);
        assert_eq!(LittleEndian::read_i64(&buf[8..16]), 42);
    }

    #[test]
    fn test_write_i32_alignment() {
        let buf = encode(&Value::Int32(-5)).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf[3], TAG_I32);
        assert_eq!(LittleEndian::read_i32(&buf[4..8]), -5);
    }

    #[test]
    fn test_write_f64() {
        let buf = encode(&Value::Float64(4.56)).unwrap();
        assert_eq!(buf[7], TAG_F64);
        assert_eq!(LittleEndian::read_f64(&buf[8..16]), 4.56);
    }

    #[test]
    fn test_write_str_record() {
        let buf = encode(&Value::from("abc")).unwrap();
        // выравнивание (тег на 3), тело с поля длины на 4
        assert_eq!(buf[3], TAG_TXT);
        assert_eq!(u32_at(&buf, 4), 3);
        assert_eq!(&buf[8..11], b"abc");
        assert_eq!(buf[11], 0);
        assert_eq!(buf.len(), 12);
    }

    #[test]
    fn test_untyped_array_of_small_ints_is_inline_only() {
        let items = vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)];
        let buf = encode(&Value::Array(items)).unwrap();
        // заголовок + 3 слота, без ячеек в куче
        assert_eq!(buf.len(), 8 + 3 * 4);
        assert_eq!(buf[2], TAG_ARRAY);
        assert_eq!(buf[3], TAG_UNTYPED);
        assert_eq!(u32_at(&buf, 4), 3);
        assert_eq!(u32_at(&buf, 8), 0xB000_0001);
        assert_eq!(u32_at(&buf, 12), 0xB000_0002);
        assert_eq!(u32_at(&buf, 16), 0xB000_0003);
    }

    #[test]
    fn test_bool_array_packs_bitset() {
        let buf = encode(&Value::BoolArray(vec![true; 24])).unwrap();
        // 2 байта заполнителя, 2 тега, количество, 3 байта битсета
        assert_eq!(buf.len(), 11);
        assert_eq!(buf[2], TAG_ARRAY);
        assert_eq!(buf[3], TAG_BOOL);
        assert_eq!(u32_at(&buf, 4), 24);
        assert_eq!(&buf[8..11], &[0xFF, 0xFF, 0xFF]);

        assert_eq!(encode(&Value::BoolArray(vec![true])).unwrap().len(), 9);
        assert_eq!(encode(&Value::BoolArray(vec![])).unwrap().len(), 8);
    }

    #[test]
    fn test_f64_array_payload_aligned() {
        let buf = encode(&Value::Float64Array(vec![1.5, 2.5])).unwrap();
        assert_eq!(buf[6], TAG_ARRAY);
        assert_eq!(buf[7], TAG_F64);
        assert_eq!(u32_at(&buf, 12), 2);
        // нагрузка на границе 8
        assert_eq!(LittleEndian::read_f64(&buf[16..24]), 1.5);
        assert_eq!(LittleEndian::read_f64(&buf[24..32]), 2.5);
        assert_eq!(buf.len(), 32);
    }

    #[test]
    fn test_string_interning_writes_one_body() {
        let buf = encode(&Value::StrArray(vec![
            "a".into(),
            "a".into(),
            "xyz".into(),
        ]))
        .unwrap();

        // тело "a" записано один раз, второе вхождение — TXT_PTR
        let body_a = [1u8, 0, 0, 0, b'a', 0];
        let count = buf
            .windows(body_a.len())
            .filter(|w| *w == &body_a[..])
            .count();
        assert_eq!(count, 1);
        assert_eq!(buf[31], TAG_TXT_PTR);
        assert_eq!(u32_at(&buf, 32), 24);
    }

    #[test]
    fn test_big_string_array_offsets_stay_in_heap() {
        let buf = encode(&Value::StrArray(vec!["hello".into(), "world".into()])).unwrap();
        let slot0 = u32_at(&buf, 8);
        let slot1 = u32_at(&buf, 12);
        assert_eq!(slot0 >> 28, 0);
        assert_eq!(slot1 >> 28, 0);
        assert!(slot0 >= 16 && slot1 > slot0);
    }

    #[test]
    fn test_dict_layout() {
        let mut d = Dict::new();
        d.insert("k".into(), Value::Int32(1));
        let buf = encode(&Value::Dict(d)).unwrap();

        assert_eq!(buf[1], TAG_DICT);
        assert_eq!(buf[2], TAG_TXT);
        assert_eq!(buf[3], TAG_UNTYPED);
        assert_eq!(u32_at(&buf, 4), 1);
        // слот ключа указывает на сырую запись строки
        assert_eq!(u32_at(&buf, 8), 16);
        assert_eq!(u32_at(&buf, 16), 1); // длина ключа
        assert_eq!(buf[20], b'k');
        // значение inline: квартет I32
        assert_eq!(u32_at(&buf, 12), 0xC000_0001);
        assert_eq!(buf.len(), 22);
    }

    #[test]
    fn test_null_child_is_zero_slot() {
        let buf = encode(&Value::Array(vec![Value::Null])).unwrap();
        assert_eq!(u32_at(&buf, 8), 0);
        assert_eq!(buf.len(), 12);
    }

    #[test]
    fn test_repetition_never_costs_more() {
        let repeated = encode(&Value::StrArray(vec![
            "a".into(),
            "a".into(),
            "xyz".into(),
        ]))
        .unwrap();
        let distinct = encode(&Value::StrArray(vec![
            "a".into(),
            "b".into(),
            "xyz".into(),
        ]))
        .unwrap();
        assert!(repeated.len() <= distinct.len());
    }

    #[test]
    fn test_internalisation_dedupes_identical_arrays() {
        let doc = Value::Array(vec![
            Value::Float64Array(vec![1.5, 2.5]),
            Value::Float64Array(vec![1.5, 2.5]),
        ]);
        let plain = encode(&doc).unwrap();
        let packed = encode_with_options(
            &doc,
            EncodeOptions {
                allow_object_internalisation: true,
            },
        )
        .unwrap();
        assert!(packed.len() < plain.len());
        // оба слота указывают на один блок
        assert_eq!(u32_at(&packed, 8), u32_at(&packed, 12));
    }

    #[test]
    fn test_internalisation_keeps_distinct_blocks() {
        let doc = Value::Array(vec![
            Value::Float64Array(vec![1.5]),
            Value::Float64Array(vec![2.5]),
        ]);
        let packed = encode_with_options(
            &doc,
            EncodeOptions {
                allow_object_internalisation: true,
            },
        )
        .unwrap();
        assert_ne!(u32_at(&packed, 8), u32_at(&packed, 12));
    }

    #[test]
    fn test_oversized_collection_is_unsupported() {
        // длину нельзя создать в памяти, поэтому проверяем сам хелпер
        assert!(checked_len(u32::MAX as usize + 1).is_err());
        assert!(checked_len(3).is_ok());
    }
}
