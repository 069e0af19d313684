// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/probe.rs - 字典探测
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

use tracing::{debug, error, info};

use crate::{
  dictionary::{CATALOG, ConfigurationError, DictionaryKind},
  frame::Frame,
  model::{ArucoDetectorBuilder, DetectionError, Model},
};

/// 探测结果：命中的字典及其检测到的标记数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeMatch {
  pub dictionary: DictionaryKind,
  pub marker_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeOutcome {
  matched: Option<ProbeMatch>,
}

impl ProbeOutcome {
  pub fn found(&self) -> bool {
    self.matched.is_some()
  }

  /// 命中时只含一个字典名，未命中时为空
  pub fn dictionary_names(&self) -> Vec<String> {
    self
      .matched
      .iter()
      .map(|m| m.dictionary.name().to_string())
      .collect()
  }

  pub fn matched(&self) -> Option<ProbeMatch> {
    self.matched
  }
}

/// 按固定顺序逐个尝试字典，第一个检测到标记的字典胜出
pub struct DictionaryProber {
  builder: ArucoDetectorBuilder,
  catalog: Vec<DictionaryKind>,
}

impl Default for DictionaryProber {
  fn default() -> Self {
    Self::new(ArucoDetectorBuilder::default())
  }
}

impl DictionaryProber {
  pub fn new(builder: ArucoDetectorBuilder) -> Self {
    Self {
      builder,
      catalog: CATALOG.to_vec(),
    }
  }

  pub fn with_catalog(mut self, catalog: impl IntoIterator<Item = DictionaryKind>) -> Self {
    self.catalog = catalog.into_iter().collect();
    self
  }

  pub fn probe(&self, frame: &Frame) -> Result<ProbeOutcome, DetectionError> {
    if frame.is_empty() {
      error!("输入图像为空，无法探测字典");
      return Err(DetectionError::EmptyImage {
        width: frame.width(),
        height: frame.height(),
      });
    }

    let gray = frame.gray();
    for &kind in &self.catalog {
      let detector = self.builder.build(kind).inspect_err(|e| {
        error!("构建检测器失败: {}: {}", kind, e);
      })?;
      let result = detector.infer(&gray).inspect_err(|e| {
        error!("字典 {} 检测失败: {}", kind, e);
      })?;

      if result.is_empty() {
        debug!("字典 {} 未检测到标记", kind);
        continue;
      }

      info!("命中字典 {}，检测到 {} 个标记", kind, result.len());
      return Ok(ProbeOutcome {
        matched: Some(ProbeMatch {
          dictionary: kind,
          marker_count: result.len(),
        }),
      });
    }

    info!("{} 个字典均未检测到标记", self.catalog.len());
    Ok(ProbeOutcome::default())
  }
}

/// 解析 `DICT_{n}X{n}_{total}` 形式的字典名
pub fn parse_grid_name(name: &str) -> Result<(u32, u32), ConfigurationError> {
  let not_a_grid = || ConfigurationError::NotAGrid(name.to_string());

  let mut parts = name.split('_');
  let _prefix = parts.next().ok_or_else(not_a_grid)?;
  let grid = parts.next().ok_or_else(not_a_grid)?;
  let total = parts.next().ok_or_else(not_a_grid)?;

  let (rows, columns) = grid.split_once('X').ok_or_else(not_a_grid)?;
  let marker_size: u32 = rows.parse().map_err(|_| not_a_grid())?;
  if columns.parse::<u32>().ok() != Some(marker_size) {
    return Err(not_a_grid());
  }
  let total_markers: u32 = total.parse().map_err(|_| not_a_grid())?;
  Ok((marker_size, total_markers))
}

/// 字典名中的网格尺寸，例如 `"DICT_5X5_100"` 得到 5
pub fn derive_marker_size(name: &str) -> Result<u32, ConfigurationError> {
  parse_grid_name(name).map(|(size, _)| size)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  #[test]
  fn marker_size_comes_from_name() {
    assert_eq!(derive_marker_size("DICT_5X5_100"), Ok(5));
    assert_eq!(derive_marker_size("DICT_7X7_1000"), Ok(7));
    assert_eq!(parse_grid_name("DICT_4X4_250"), Ok((4, 250)));
  }

  #[test]
  fn non_grid_names_have_no_size() {
    for name in ["DICT_ARUCO_ORIGINAL", "DICT_APRILTAG_16h5", "DICT_4X5_50", "DICT"] {
      assert!(matches!(
        derive_marker_size(name),
        Err(ConfigurationError::NotAGrid(_))
      ));
    }
  }

  #[test]
  fn empty_outcome_has_no_names() {
    let outcome = ProbeOutcome::default();
    assert!(!outcome.found());
    assert!(outcome.dictionary_names().is_empty());
  }

  #[test]
  fn empty_frame_is_detection_error() {
    let prober = DictionaryProber::default();
    assert!(matches!(
      prober.probe(&Frame::from(RgbImage::new(0, 0))),
      Err(DetectionError::EmptyImage { .. })
    ));
  }
}
