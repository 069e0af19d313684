// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/model.rs - 检测模型
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

use imageproc::point::Point;

use crate::dictionary::DictionaryKind;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 四个角点：左上、右上、右下、左下（顺时针）
pub type Quad = [Point<f32>; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerItem {
  pub id: u32,
  pub corners: Quad,
  /// 与字典码值之间的汉明距离
  pub distance: u32,
}

impl MarkerItem {
  pub fn top_left(&self) -> Point<f32> {
    self.corners[0]
  }

  pub fn bottom_right(&self) -> Point<f32> {
    self.corners[2]
  }
}

#[derive(Debug, Clone)]
pub struct DetectResult {
  pub dictionary: DictionaryKind,
  pub markers: Box<[MarkerItem]>,
  /// 通过几何筛选但未能解码的候选四边形
  pub rejected: Box<[Quad]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.markers.is_empty()
  }

  pub fn len(&self) -> usize {
    self.markers.len()
  }
}

mod aruco;
pub use self::aruco::{ArucoDetector, ArucoDetectorBuilder, DetectionError, DetectorParameters};
