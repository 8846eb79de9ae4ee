//! Десериализация значений `Value` из бинарного формата memopack.
//!
//! Декодер зеркально повторяет формулу выравнивания энкодера — иначе
//! смещения рассинхронизируются. Буфер трактуется как неизменяемый
//! массив с произвольным доступом: переход по абсолютному смещению
//! создаёт новый reader над тем же срезом, без общего мутабельного
//! состояния позиционирования.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::{
    error::DecodeError,
    inline,
    tags::{
        TAG_ARRAY, TAG_BOOL, TAG_DICT, TAG_F64, TAG_FALSE, TAG_I32, TAG_I64, TAG_NULL, TAG_PADDING,
        TAG_SORTED_DICT, TAG_TRUE, TAG_TXT, TAG_TXT_PTR, TAG_UNTYPED,
    },
    bits, Dict, Value,
};

/// Десериализует значение из буфера, начиная сканирование тега с нуля.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    let value = MemoReader::new(bytes).read_tagged()?;
    debug!(kind = value.kind(), bytes = bytes.len(), "decode complete");
    Ok(value)
}

/// Reader над неизменяемым байтовым срезом с собственным курсором.
pub struct MemoReader<'a> {
    buf: &'a [u8],
    top: usize,
}

impl<'a> MemoReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, top: 0 }
    }

    /// Чистый переход по смещению: свежий reader над тем же буфером.
    fn at_offset(&self, offset: u32) -> MemoReader<'a> {
        MemoReader {
            buf: self.buf,
            top: offset as usize,
        }
    }

    /// Зеркало `MemoWriter::align`: минимальный сдвиг курсора, при котором
    /// `(top + prefix_size) % element_size == 0`.
    fn align(&mut self, element_size: usize, prefix_size: usize) {
        let pos = self.top + prefix_size;
        let rem = pos % element_size;
        if rem != 0 {
            self.top = pos - rem + element_size - prefix_size;
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.top + n;
        if end > self.buf.len() {
            return Err(DecodeError::UnexpectedEof {
                offset: self.top,
                need: n,
            });
        }
        let slice = &self.buf[self.top..end];
        self.top = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.align(4, 0);
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.align(4, 0);
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        self.align(8, 0);
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        self.align(8, 0);
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    /// Сырая запись строки: длина u32, тело UTF-8, завершающий `\0`.
    fn read_string(&mut self) -> Result<String, DecodeError> {
        let n = self.read_u32()? as usize;
        let body_offset = self.top;
        let body = self.take(n)?;
        let s = std::str::from_utf8(body)
            .map_err(|_| DecodeError::InvalidUtf8(body_offset))?
            .to_owned();
        self.take(1)?; // терминатор
        Ok(s)
    }

    fn read_u32_array(&mut self, n: usize) -> Result<Vec<u32>, DecodeError> {
        self.align(4, 0);
        let mut out = Vec::with_capacity(n.min(4096));
        for _ in 0..n {
            out.push(LittleEndian::read_u32(self.take(4)?));
        }
        Ok(out)
    }

    /// Сканирует тег (пропуская нулевые байты заполнителя) и декодирует
    /// значение по нему.
    pub fn read_tagged(&mut self) -> Result<Value, DecodeError> {
        let mut tag = self.read_u8()?;
        while tag == TAG_PADDING {
            tag = self.read_u8()?;
        }
        let tag_offset = self.top - 1;

        match tag {
            TAG_TXT_PTR => {
                let offset = self.read_u32()?;
                Ok(Value::Str(self.at_offset(offset).read_string()?))
            }
            TAG_TXT => Ok(Value::Str(self.read_string()?)),
            TAG_F64 => Ok(Value::Float64(self.read_f64()?)),
            TAG_I64 => Ok(Value::Int64(self.read_i64()?)),
            TAG_I32 => Ok(Value::Int32(self.read_i32()?)),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_NULL => Ok(Value::Null),
            TAG_DICT | TAG_SORTED_DICT => self.read_tagged_dict(),
            TAG_ARRAY => self.read_tagged_array(),
            other => Err(DecodeError::UnknownTag {
                tag: other,
                offset: tag_offset,
            }),
        }
    }

    fn read_tagged_array(&mut self) -> Result<Value, DecodeError> {
        let elem_type = self.read_u8()?;
        match elem_type {
            TAG_UNTYPED => {
                let n = self.read_u32()? as usize;
                let slots = self.read_u32_array(n)?;
                let mut items = Vec::with_capacity(n.min(4096));
                for slot in slots {
                    items.push(self.resolve_slot(slot)?);
                }
                Ok(Value::Array(items))
            }
            TAG_TXT | TAG_TXT_PTR => {
                let n = self.read_u32()? as usize;
                let slots = self.read_u32_array(n)?;
                let mut items = Vec::with_capacity(n.min(4096));
                for slot in slots {
                    match self.resolve_slot(slot)? {
                        Value::Str(s) => items.push(s),
                        _ => return Err(DecodeError::ExpectedString(slot)),
                    }
                }
                Ok(Value::StrArray(items))
            }
            TAG_F64 => {
                self.align(8, 4);
                let n = self.read_u32()? as usize;
                let mut items = Vec::with_capacity(n.min(4096));
                for _ in 0..n {
                    items.push(self.read_f64()?);
                }
                Ok(Value::Float64Array(items))
            }
            TAG_I64 => {
                self.align(8, 4);
                let n = self.read_u32()? as usize;
                let mut items = Vec::with_capacity(n.min(4096));
                for _ in 0..n {
                    items.push(self.read_i64()?);
                }
                Ok(Value::Int64Array(items))
            }
            TAG_I32 => {
                let n = self.read_u32()? as usize;
                let mut items = Vec::with_capacity(n.min(4096));
                for _ in 0..n {
                    items.push(self.read_i32()?);
                }
                Ok(Value::Int32Array(items))
            }
            TAG_BOOL => {
                let n = self.read_u32()? as usize;
                let packed = self.take(n.div_ceil(8))?;
                Ok(Value::BoolArray(bits::unpack_bits(packed, n)))
            }
            other => Err(DecodeError::BadElementType(other)),
        }
    }

    /// Словарь: тип ключа обязан быть строкой, тип значения — `UNTYPED`.
    /// Дубликаты ключей схлопываются по принципу «последний побеждает».
    fn read_tagged_dict(&mut self) -> Result<Value, DecodeError> {
        let key_type = self.read_u8()?;
        let val_type = self.read_u8()?;
        if key_type != TAG_TXT {
            return Err(DecodeError::BadKeyType(key_type));
        }
        if val_type != TAG_UNTYPED {
            return Err(DecodeError::BadValueType(val_type));
        }

        let n = self.read_u32()? as usize;
        let key_offsets = self.read_u32_array(n)?;
        let value_slots = self.read_u32_array(n)?;

        let mut dict = Dict::with_capacity(n.min(4096));
        for (key_offset, slot) in key_offsets.into_iter().zip(value_slots) {
            let key = self.at_offset(key_offset).read_string()?;
            let value = self.resolve_slot(slot)?;
            dict.insert(key, value);
        }
        Ok(Value::Dict(dict))
    }

    /// Разрешение reference slot'а: `0` — Null; ненулевой старший
    /// квартет — inline-значение (без обращения к буферу); иначе —
    /// абсолютное смещение тегированной ячейки.
    fn resolve_slot(&self, slot: u32) -> Result<Value, DecodeError> {
        if slot == 0 {
            return Ok(Value::Null);
        }
        if slot >> 28 != 0 {
            return inline::decode(slot);
        }
        self.at_offset(slot).read_tagged()
    }
}
