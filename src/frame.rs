//! 视频帧 - 打包的 rgb24 像素缓冲

use anyhow::{bail, Result};

/// 每像素字节数（rgb24）
pub const BYTES_PER_PIXEL: usize = 3;

/// 解码后的一帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// 创建帧，`data` 长度必须等于 `width * height * 3`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            bail!(
                "frame buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            );
        }
        Ok(Self { width, height, data })
    }

    /// 纯色帧
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self { width, height, data }
    }

    /// 指定尺寸一帧所需的字节数
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 取像素，越界返回 `None`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// 最近邻采样：把 `(x, y)` 从 `cols x rows` 的目标网格映射回原图
    pub fn sample(&self, x: u32, y: u32, cols: u32, rows: u32) -> Option<[u8; 3]> {
        if cols == 0 || rows == 0 || x >= cols || y >= rows {
            return None;
        }
        let sx = (x as u64 * self.width as u64 / cols as u64) as u32;
        let sy = (y as u64 * self.height as u64 / rows as u64) as u32;
        self.pixel(sx, sy)
    }
}
