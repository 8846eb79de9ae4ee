//! Упаковка булевых последовательностей в битсет.
//!
//! Бит `i` хранится в байте `i / 8`, начиная с младшего бита.
//! Неиспользуемые старшие биты последнего неполного байта равны нулю.
//! Длина исходной последовательности не выводима из длины байтов,
//! поэтому распаковка принимает явное количество элементов.

/// Упаковывает булеву последовательность в байтовый массив, 8 значений на байт.
pub fn pack_bits(bools: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bools.len().div_ceil(8)];
    for (i, &bit) in bools.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Распаковывает `count` булевых значений из битсета.
///
/// `bytes` должен содержать не меньше `ceil(count / 8)` байт.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    assert!(
        bytes.len() >= count.div_ceil(8),
        "bitset of {} bytes is too short for {count} bools",
        bytes.len()
    );
    (0..count).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect()
}
