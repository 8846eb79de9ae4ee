//! Типы ошибок кодека memopack.
//!
//! Нарушения внутренних инвариантов энкодера (переполнение bound region)
//! не представлены здесь: это дефекты учёта размеров, а не ошибки данных,
//! и они приводят к панике.

pub mod decode;
pub mod encode;

pub use decode::DecodeError;
pub use encode::EncodeError;
