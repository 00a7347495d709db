//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是 MHAS 等按位打包的头部解析的基础设施.
//!
//! 按大端位序读取 (MSB first), 这是多媒体码流中最常用的位序.

use crate::{TsrayError, TsrayResult};

/// 比特流读取器
///
/// 从字节缓冲区中按位读取数据, 使用大端位序 (MSB first).
///
/// # 示例
/// ```
/// use tsray_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 获取剩余字节数 (从当前字节索引算起, 不考虑字节内已读的位)
    pub fn bytes_left(&self) -> usize {
        self.data.len().saturating_sub(self.byte_pos)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> TsrayResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(TsrayError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(TsrayError::Eof);
        }

        let mut result: u32 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);

            self.bit_pos += to_read as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 读取 N 个位 (最多 64 位)
    pub fn read_bits_u64(&mut self, n: u32) -> TsrayResult<u64> {
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        if n > 64 {
            return Err(TsrayError::InvalidArgument(format!(
                "read_bits_u64: n={} 超过 64 位",
                n,
            )));
        }

        let high_bits = n - 32;
        let high = u64::from(self.read_bits(high_bits)?);
        let low = u64::from(self.read_bits(32)?);
        Ok((high << 32) | low)
    }

    /// 读取可扩展无符号整数 (escapedValue, ISO/IEC 23008-3)
    ///
    /// 先读 `n` 位; 若为全 1 (饱和值) 则再读 `m` 位并累加;
    /// 若 `m` 位也饱和, 再读 `k` 位并累加.
    ///
    /// # 示例
    /// ```
    /// use tsray_core::bitreader::BitReader;
    ///
    /// // 3 位 0b101 = 5, 未饱和, 不读取扩展字段
    /// let data = [0b1010_0000];
    /// let mut br = BitReader::new(&data);
    /// assert_eq!(br.read_escaped_value(3, 8, 8).unwrap(), 5);
    /// assert_eq!(br.bits_read(), 3);
    /// ```
    pub fn read_escaped_value(&mut self, n: u32, m: u32, k: u32) -> TsrayResult<u64> {
        let mut value = self.read_bits_u64(n)?;
        if value == saturated(n) {
            let escape = self.read_bits_u64(m)?;
            value += escape;
            if escape == saturated(m) {
                value += self.read_bits_u64(k)?;
            }
        }
        Ok(value)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> TsrayResult<()> {
        if n > self.bits_left() {
            return Err(TsrayError::Eof);
        }

        let total_bits = self.bit_pos as usize + n;
        self.byte_pos += total_bits / 8;
        self.bit_pos = (total_bits % 8) as u8;

        Ok(())
    }

    /// 跳过 N 个字节, 保持字节内的位位置不变
    pub fn skip_bytes(&mut self, n: usize) -> TsrayResult<()> {
        self.skip_bits(n * 8)
    }

    /// 定位到指定字节偏移 (位位置归零)
    pub fn seek_to_byte(&mut self, byte_pos: usize) -> TsrayResult<()> {
        if byte_pos > self.data.len() {
            return Err(TsrayError::Eof);
        }
        self.byte_pos = byte_pos;
        self.bit_pos = 0;
        Ok(())
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }
}

/// `n` 位能表示的最大值 (全 1)
fn saturated(n: u32) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}
