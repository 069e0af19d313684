// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/model/aruco.rs - 方形基准标记检测
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

use calib_targets_aruco::Matcher;
use image::GrayImage;
use thiserror::Error;
use tracing::{debug, error, trace};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  dictionary::{Dictionary, DictionaryKind, identify_with},
  model::{DetectResult, MarkerItem, Model, Quad},
};

mod candidate;
mod sampling;

// 标记外围黑色边框的宽度（格）
const MARKER_BORDER_BITS: usize = 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
  #[error("输入图像为空: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("检测参数无效: {0}")]
  InvalidParameter(String),
  #[error("检测参数解析失败: {key}={value}")]
  BadQuery { key: String, value: String },
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
}

/// 检测参数，默认值与常见的 ArUco 检测器一致
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorParameters {
  pub adaptive_thresh_win_size_min: u32,
  pub adaptive_thresh_win_size_max: u32,
  pub adaptive_thresh_win_size_step: u32,
  pub adaptive_thresh_constant: f32,
  pub min_marker_perimeter_rate: f32,
  pub max_marker_perimeter_rate: f32,
  pub polygonal_approx_accuracy_rate: f32,
  pub min_corner_distance_rate: f32,
  pub min_distance_to_border: u32,
  pub min_marker_distance_rate: f32,
  pub perspective_remove_pixel_per_cell: u32,
  pub perspective_remove_ignored_margin_per_cell: f32,
  pub max_erroneous_bits_in_border_rate: f32,
  pub min_otsu_std_dev: f32,
  pub error_correction_rate: f32,
}

impl Default for DetectorParameters {
  fn default() -> Self {
    Self {
      adaptive_thresh_win_size_min: 3,
      adaptive_thresh_win_size_max: 23,
      adaptive_thresh_win_size_step: 10,
      adaptive_thresh_constant: 7.0,
      min_marker_perimeter_rate: 0.03,
      max_marker_perimeter_rate: 4.0,
      polygonal_approx_accuracy_rate: 0.03,
      min_corner_distance_rate: 0.05,
      min_distance_to_border: 3,
      min_marker_distance_rate: 0.05,
      perspective_remove_pixel_per_cell: 8,
      perspective_remove_ignored_margin_per_cell: 0.13,
      max_erroneous_bits_in_border_rate: 0.35,
      min_otsu_std_dev: 5.0,
      error_correction_rate: 0.6,
    }
  }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DetectionError> {
  value.parse().map_err(|_| DetectionError::BadQuery {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl DetectorParameters {
  /// 用 `key=value` 覆盖单个参数
  pub fn set(&mut self, key: &str, value: &str) -> Result<(), DetectionError> {
    match key {
      "adaptive_thresh_win_size_min" => self.adaptive_thresh_win_size_min = parse_value(key, value)?,
      "adaptive_thresh_win_size_max" => self.adaptive_thresh_win_size_max = parse_value(key, value)?,
      "adaptive_thresh_win_size_step" => {
        self.adaptive_thresh_win_size_step = parse_value(key, value)?
      }
      "adaptive_thresh_constant" | "adaptive_constant" => {
        self.adaptive_thresh_constant = parse_value(key, value)?
      }
      "min_marker_perimeter_rate" => self.min_marker_perimeter_rate = parse_value(key, value)?,
      "max_marker_perimeter_rate" => self.max_marker_perimeter_rate = parse_value(key, value)?,
      "polygonal_approx_accuracy_rate" => {
        self.polygonal_approx_accuracy_rate = parse_value(key, value)?
      }
      "min_corner_distance_rate" => self.min_corner_distance_rate = parse_value(key, value)?,
      "min_distance_to_border" => self.min_distance_to_border = parse_value(key, value)?,
      "min_marker_distance_rate" => self.min_marker_distance_rate = parse_value(key, value)?,
      "perspective_remove_pixel_per_cell" => {
        self.perspective_remove_pixel_per_cell = parse_value(key, value)?
      }
      "perspective_remove_ignored_margin_per_cell" => {
        self.perspective_remove_ignored_margin_per_cell = parse_value(key, value)?
      }
      "max_erroneous_bits_in_border_rate" => {
        self.max_erroneous_bits_in_border_rate = parse_value(key, value)?
      }
      "min_otsu_std_dev" => self.min_otsu_std_dev = parse_value(key, value)?,
      "error_correction_rate" => self.error_correction_rate = parse_value(key, value)?,
      _ => {
        return Err(DetectionError::BadQuery {
          key: key.to_string(),
          value: value.to_string(),
        });
      }
    }
    Ok(())
  }

  pub fn validate(&self) -> Result<(), DetectionError> {
    if self.adaptive_thresh_win_size_min < 3 {
      return Err(DetectionError::InvalidParameter(format!(
        "阈值窗口最小值必须不小于 3，实际为 {}",
        self.adaptive_thresh_win_size_min
      )));
    }
    if self.adaptive_thresh_win_size_max < self.adaptive_thresh_win_size_min {
      return Err(DetectionError::InvalidParameter(format!(
        "阈值窗口最大值 {} 小于最小值 {}",
        self.adaptive_thresh_win_size_max, self.adaptive_thresh_win_size_min
      )));
    }
    if self.adaptive_thresh_win_size_step == 0 {
      return Err(DetectionError::InvalidParameter(
        "阈值窗口步长必须大于 0".to_string(),
      ));
    }
    if self.perspective_remove_pixel_per_cell == 0 {
      return Err(DetectionError::InvalidParameter(
        "每格像素数必须大于 0".to_string(),
      ));
    }
    if !(0.0..0.5).contains(&self.perspective_remove_ignored_margin_per_cell) {
      return Err(DetectionError::InvalidParameter(format!(
        "格子边缘忽略比例必须在 [0, 0.5) 内，实际为 {}",
        self.perspective_remove_ignored_margin_per_cell
      )));
    }
    let rates = [
      ("min_marker_perimeter_rate", self.min_marker_perimeter_rate),
      ("max_marker_perimeter_rate", self.max_marker_perimeter_rate),
      (
        "polygonal_approx_accuracy_rate",
        self.polygonal_approx_accuracy_rate,
      ),
    ];
    for (name, rate) in rates {
      if rate <= 0.0 {
        return Err(DetectionError::InvalidParameter(format!(
          "{} 必须大于 0，实际为 {}",
          name, rate
        )));
      }
    }
    if self.min_marker_perimeter_rate >= self.max_marker_perimeter_rate {
      return Err(DetectionError::InvalidParameter(
        "最小周长比例必须小于最大周长比例".to_string(),
      ));
    }
    if !(0.0..=1.0).contains(&self.error_correction_rate) {
      return Err(DetectionError::InvalidParameter(format!(
        "纠错比例必须在 [0, 1] 内，实际为 {}",
        self.error_correction_rate
      )));
    }
    Ok(())
  }

  /// 所有参与多尺度阈值的窗口尺寸（奇数）
  pub fn threshold_windows(&self) -> Vec<u32> {
    let mut windows = Vec::new();
    let mut window = self.adaptive_thresh_win_size_min;
    while window <= self.adaptive_thresh_win_size_max {
      windows.push(window | 1);
      let Some(next) = window.checked_add(self.adaptive_thresh_win_size_step) else {
        break;
      };
      window = next;
    }
    windows
  }
}

#[derive(Debug, Clone, Default)]
pub struct ArucoDetectorBuilder {
  params: DetectorParameters,
}

impl FromUrlWithScheme for ArucoDetectorBuilder {
  const SCHEME: &'static str = "aruco";
}

impl FromUrl for ArucoDetectorBuilder {
  type Error = DetectionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DetectionError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let mut params = DetectorParameters::default();
    for (key, value) in url.query_pairs() {
      debug!("检测参数: {} = {}", key, value);
      params.set(&key, &value)?;
    }
    params.validate()?;

    Ok(Self { params })
  }
}

impl ArucoDetectorBuilder {
  pub fn params(mut self, params: DetectorParameters) -> Self {
    self.params = params;
    self
  }

  pub fn parameters(&self) -> &DetectorParameters {
    &self.params
  }

  pub fn build(&self, dictionary: DictionaryKind) -> Result<ArucoDetector, DetectionError> {
    self.params.validate()?;
    let dictionary = dictionary.dictionary();
    let max_correction = (dictionary.max_correction_bits() as f32
      * self.params.error_correction_rate) as u32;
    Ok(ArucoDetector {
      matcher: dictionary.matcher(max_correction),
      dictionary,
      params: self.params.clone(),
    })
  }
}

pub struct ArucoDetector {
  dictionary: Dictionary,
  matcher: Matcher,
  params: DetectorParameters,
}

impl ArucoDetector {
  pub fn dictionary(&self) -> &Dictionary {
    &self.dictionary
  }

  fn max_border_errors(&self) -> usize {
    let size = self.dictionary.marker_size() as f32;
    (size * size * self.params.max_erroneous_bits_in_border_rate) as usize
  }

  /// 尝试把一个候选四边形解码为字典中的标记
  fn decode(&self, gray: &GrayImage, corners: &Quad) -> Option<MarkerItem> {
    let size = self.dictionary.marker_size();
    let cells = size + 2 * MARKER_BORDER_BITS;
    let bits = sampling::read_cells(gray, corners, cells, &self.params);

    let border_errors = (0..cells)
      .flat_map(|y| (0..cells).map(move |x| (x, y)))
      .filter(|&(x, y)| x == 0 || y == 0 || x == cells - 1 || y == cells - 1)
      .filter(|&(x, y)| bits[y * cells + x])
      .count();
    if border_errors > self.max_border_errors() {
      trace!("边框错误位过多: {}", border_errors);
      return None;
    }

    let mut code = 0u64;
    for y in 0..size {
      for x in 0..size {
        let cell = (y + MARKER_BORDER_BITS) * cells + (x + MARKER_BORDER_BITS);
        // 黑色格记为 1
        if !bits[cell] {
          code |= 1 << (y * size + x);
        }
      }
    }

    let found = identify_with(&self.matcher, code)?;
    // 观测图案是码值顺时针转 rotation 次的结果，标记左上角随之后移
    let corners = std::array::from_fn(|j| corners[(j + found.rotation) % 4]);
    Some(MarkerItem {
      id: found.id,
      corners,
      distance: found.distance,
    })
  }
}

impl Model for ArucoDetector {
  type Input = GrayImage;
  type Output = DetectResult;
  type Error = DetectionError;

  fn infer(&self, gray: &Self::Input) -> Result<Self::Output, Self::Error> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
      return Err(DetectionError::EmptyImage { width, height });
    }

    let candidates = candidate::detect_candidates(gray, &self.params);
    debug!(
      "字典 {}: {} 个候选四边形",
      self.dictionary.name(),
      candidates.len()
    );

    let mut markers = Vec::new();
    let mut rejected = Vec::new();
    for candidate in candidates {
      match self.decode(gray, &candidate.corners) {
        Some(marker) => markers.push(marker),
        None => rejected.push(candidate.corners),
      }
    }

    Ok(DetectResult {
      dictionary: self.dictionary.kind(),
      markers: markers.into_boxed_slice(),
      rejected: rejected.into_boxed_slice(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  #[test]
  fn default_windows_are_three_scales() {
    assert_eq!(DetectorParameters::default().threshold_windows(), vec![3, 13, 23]);
  }

  #[test]
  fn huge_window_bound_stops_at_last_window() {
    let url = Url::parse(&format!(
      "aruco:?adaptive_thresh_win_size_min={}&adaptive_thresh_win_size_max={}&adaptive_thresh_win_size_step=10",
      u32::MAX - 15,
      u32::MAX
    ))
    .unwrap();
    let builder = ArucoDetectorBuilder::from_url(&url).unwrap();
    let windows = builder.parameters().threshold_windows();
    assert_eq!(windows, vec![(u32::MAX - 15) | 1, (u32::MAX - 5) | 1]);
  }

  #[test]
  fn url_query_overrides_parameters() {
    let url = Url::parse("aruco:?adaptive_constant=9&error_correction_rate=0.5").unwrap();
    let builder = ArucoDetectorBuilder::from_url(&url).unwrap();
    assert_eq!(builder.parameters().adaptive_thresh_constant, 9.0);
    assert_eq!(builder.parameters().error_correction_rate, 0.5);
  }

  #[test]
  fn bad_query_is_reported() {
    let url = Url::parse("aruco:?min_otsu_std_dev=abc").unwrap();
    assert!(matches!(
      ArucoDetectorBuilder::from_url(&url),
      Err(DetectionError::BadQuery { .. })
    ));
    let url = Url::parse("aruco:?no_such_knob=1").unwrap();
    assert!(ArucoDetectorBuilder::from_url(&url).is_err());
    let url = Url::parse("yolo:").unwrap();
    assert!(matches!(
      ArucoDetectorBuilder::from_url(&url),
      Err(DetectionError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn invalid_window_is_rejected() {
    let params = DetectorParameters {
      adaptive_thresh_win_size_min: 1,
      ..DetectorParameters::default()
    };
    let builder = ArucoDetectorBuilder::default().params(params);
    assert!(matches!(
      builder.build(DictionaryKind::Dict4x4_50),
      Err(DetectionError::InvalidParameter(_))
    ));
  }

  #[test]
  fn empty_image_is_an_error() {
    let detector = ArucoDetectorBuilder::default()
      .build(DictionaryKind::Dict4x4_50)
      .unwrap();
    assert_eq!(
      detector.infer(&GrayImage::new(0, 0)).unwrap_err(),
      DetectionError::EmptyImage {
        width: 0,
        height: 0
      }
    );
  }

  #[test]
  fn blank_image_has_no_candidates() {
    let detector = ArucoDetectorBuilder::default()
      .build(DictionaryKind::Dict6x6_250)
      .unwrap();
    let result = detector
      .infer(&GrayImage::from_pixel(120, 90, Luma([255])))
      .unwrap();
    assert!(result.is_empty());
    assert!(result.rejected.is_empty());
  }
}
