//! Inline tagged pointer: кодирование малых скаляров прямо в reference slot.
//!
//! Каждый reference slot занимает 4 байта — столько же, сколько смещение.
//! Старший квартет (4 бита) слота зарезервирован как дискриминатор:
//! ненулевой квартет означает inline-значение, а не смещение в кучу.
//! Полезная нагрузка занимает младшие 24 бита; биты 24..27 всегда нулевые.
//! Слот, равный нулю, всегда означает `Null` и проверяется до квартета.

use crate::{error::DecodeError, Value};

/// Пустая строка или код одного символа.
pub const QUARTET_TXT: u8 = 0x8;
/// 24-битное знаковое целое, реинтерпретированное как f64.
pub const QUARTET_F64: u8 = 0x9;
/// То же для f32; энкодером не производится, декодером принимается.
pub const QUARTET_F32: u8 = 0xA;
/// i64 в 24-битном знаковом диапазоне.
pub const QUARTET_I64: u8 = 0xB;
/// i32 в 24-битном знаковом диапазоне.
pub const QUARTET_I32: u8 = 0xC;
/// u64 в 24-битном беззнаковом диапазоне; только декодирование.
pub const QUARTET_U64: u8 = 0xD;
/// u32 в 24-битном беззнаковом диапазоне; только декодирование.
pub const QUARTET_U32: u8 = 0xE;

/// Границы 24-битного знакового диапазона.
pub const INLINE_MIN: i64 = -(1 << 23);
pub const INLINE_MAX: i64 = (1 << 23) - 1;

const PAYLOAD_MASK: u32 = 0x00FF_FFFF;

fn fits(v: i64) -> bool {
    (INLINE_MIN..=INLINE_MAX).contains(&v)
}

fn slot(quartet: u8, payload: u32) -> u32 {
    (u32::from(quartet) << 28) | (payload & PAYLOAD_MASK)
}

/// Восстанавливает знак 24-битной полезной нагрузки.
fn sign_extend(payload: u32) -> i32 {
    ((payload << 8) as i32) >> 8
}

/// Пытается закодировать значение прямо в слот.
///
/// Правила пробуются по приоритету; `None` означает, что значение
/// должно быть записано в кучу, а слот получит его смещение.
/// `Null` кодируется слотом `0` без обращения к куче.
pub fn try_encode(value: &Value) -> Option<u32> {
    match value {
        Value::Null => Some(0),
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Some(slot(QUARTET_TXT, 0)),
                // '\0' не кодируется: его код совпал бы с пустой строкой
                (Some(c), None) if c != '\0' => Some(slot(QUARTET_TXT, c as u32)),
                _ => None,
            }
        }
        Value::Float64(f) => {
            let i = *f as i64;
            // требуется точный битовый round-trip: NaN и -0.0 отсекаются
            if fits(i) && (i as f64).to_bits() == f.to_bits() {
                Some(slot(QUARTET_F64, i as u32))
            } else {
                None
            }
        }
        Value::Int64(i) => fits(*i).then(|| slot(QUARTET_I64, *i as u32)),
        Value::Int32(i) => fits(i64::from(*i)).then(|| slot(QUARTET_I32, *i as u32)),
        _ => None,
    }
}

/// Декодирует inline-слот с ненулевым старшим квартетом.
///
/// Обращений к буферу не требуется: слот самодостаточен.
pub fn decode(slot: u32) -> Result<Value, DecodeError> {
    debug_assert!(slot >> 28 != 0, "slot {slot:#010x} is an offset, not inline");

    let quartet = (slot >> 28) as u8;
    let payload = slot & PAYLOAD_MASK;
    match quartet {
        QUARTET_TXT => {
            if payload == 0 {
                Ok(Value::Str(String::new()))
            } else {
                let c = char::from_u32(payload).ok_or(DecodeError::BadInlineChar(slot))?;
                Ok(Value::Str(c.to_string()))
            }
        }
        QUARTET_F64 | QUARTET_F32 => Ok(Value::Float64(f64::from(sign_extend(payload)))),
        QUARTET_I64 => Ok(Value::Int64(i64::from(sign_extend(payload)))),
        QUARTET_I32 => Ok(Value::Int32(sign_extend(payload))),
        QUARTET_U64 => Ok(Value::Int64(i64::from(payload))),
        QUARTET_U32 => Ok(Value::Int32(payload as i32)),
        other => Err(DecodeError::BadInlineQuartet(other)),
    }
}
