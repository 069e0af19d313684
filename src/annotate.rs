// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/annotate.rs - 标记标注
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

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  codec,
  dictionary::{ConfigurationError, DictionaryKind},
  frame::{Frame, PixelOrder},
  model::{ArucoDetectorBuilder, DetectionError, Model, Quad},
  output::draw::Draw,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotateError {
  #[error("字典配置错误: {0}")]
  Configuration(#[from] ConfigurationError),
  #[error("标记检测错误: {0}")]
  Detection(#[from] DetectionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedMarker {
  pub id: u32,
  pub corners: Quad,
  pub center: (i32, i32),
}

#[derive(Debug, Clone)]
pub struct Annotation {
  pub dictionary: DictionaryKind,
  pub markers: Vec<AnnotatedMarker>,
  /// 标注后整幅图像原始像素的 base64 文本，每 76 个字符换行
  pub encoded: String,
}

/// 左上角与右下角（取整后）的中点
pub fn marker_center(corners: &Quad) -> (i32, i32) {
  let (tl, br) = (corners[0], corners[2]);
  let (tl_x, tl_y) = (tl.x as i32, tl.y as i32);
  let (br_x, br_y) = (br.x as i32, br.y as i32);
  ((tl_x + br_x) / 2, (tl_y + br_y) / 2)
}

pub struct MarkerAnnotator {
  builder: ArucoDetectorBuilder,
  draw: Draw,
  pixel_order: PixelOrder,
}

impl Default for MarkerAnnotator {
  fn default() -> Self {
    Self::new(ArucoDetectorBuilder::default())
  }
}

impl MarkerAnnotator {
  pub fn new(builder: ArucoDetectorBuilder) -> Self {
    Self {
      builder,
      draw: Draw::default(),
      pixel_order: PixelOrder::default(),
    }
  }

  pub fn pixel_order(mut self, order: PixelOrder) -> Self {
    self.pixel_order = order;
    self
  }

  /// 用 `DICT_{marker_size}X{marker_size}_{total_markers}` 字典检测并标注
  pub fn annotate(
    &self,
    frame: &mut Frame,
    marker_size: u32,
    total_markers: u32,
    draw: bool,
  ) -> Result<Annotation, AnnotateError> {
    let kind = DictionaryKind::from_grid(marker_size, total_markers).inspect_err(|e| {
      warn!("{}", e);
    })?;
    self.annotate_with(frame, kind, draw)
  }

  /// 用任意字典检测，在帧上绘制中心与 ID，并编码整幅图像
  pub fn annotate_with(
    &self,
    frame: &mut Frame,
    kind: DictionaryKind,
    draw: bool,
  ) -> Result<Annotation, AnnotateError> {
    if frame.is_empty() {
      return Err(
        DetectionError::EmptyImage {
          width: frame.width(),
          height: frame.height(),
        }
        .into(),
      );
    }

    let detector = self.builder.build(kind)?;
    let result = detector.infer(&frame.gray())?;
    debug!(
      "字典 {}: {} 个标记, {} 个被拒绝的候选",
      kind,
      result.len(),
      result.rejected.len()
    );

    if result.is_empty() {
      warn!("字典 {} 未检测到标记，输出未标注的图像", kind);
    }

    let image = frame.as_mut();
    if draw {
      self.draw.draw_detected_markers(image, &result.markers);
    }

    let mut markers = Vec::with_capacity(result.len());
    for item in result.markers.iter() {
      let center = marker_center(&item.corners);
      let top_left = (item.top_left().x as i32, item.top_left().y as i32);
      self.draw.draw_center(image, center);
      self.draw.draw_marker_id(image, item.id, top_left);
      debug!("标记 {}: 中心 ({}, {})", item.id, center.0, center.1);
      markers.push(AnnotatedMarker {
        id: item.id,
        corners: item.corners,
        center,
      });
    }

    let encoded = codec::encode_mime(&frame.interleaved(self.pixel_order));
    info!("标注完成: {} 个标记，编码长度 {}", markers.len(), encoded.len());

    Ok(Annotation {
      dictionary: kind,
      markers,
      encoded,
    })
  }
}
