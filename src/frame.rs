// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/frame.rs - 图像帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{GrayImage, RgbImage, imageops};

const RGB_CHANNELS: usize = 3;

/// 原始像素缓冲区中三个通道的排列顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelOrder {
  #[default]
  Bgr,
  Rgb,
}

/// 交错存储的 RGB 帧，标注直接在帧上进行
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Self { image }
  }
}

impl From<Frame> for RgbImage {
  fn from(frame: Frame) -> Self {
    frame.image
  }
}

impl AsRef<RgbImage> for Frame {
  fn as_ref(&self) -> &RgbImage {
    &self.image
  }
}

impl AsMut<RgbImage> for Frame {
  fn as_mut(&mut self) -> &mut RgbImage {
    &mut self.image
  }
}

impl Frame {
  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn is_empty(&self) -> bool {
    self.image.width() == 0 || self.image.height() == 0
  }

  /// 单通道灰度图，仅用于检测
  pub fn gray(&self) -> GrayImage {
    imageops::grayscale(&self.image)
  }

  /// 无文件头的交错像素字节
  pub fn interleaved(&self, order: PixelOrder) -> Vec<u8> {
    match order {
      PixelOrder::Rgb => self.image.as_raw().clone(),
      PixelOrder::Bgr => {
        let mut data = Vec::with_capacity(self.image.as_raw().len());
        for pixel in self.image.as_raw().chunks_exact(RGB_CHANNELS) {
          data.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
        }
        data
      }
    }
  }
}
