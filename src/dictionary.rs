// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/dictionary.rs - 标记字典目录
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

use std::{fmt, str::FromStr};

use calib_targets_aruco::{Matcher, builtins};
use thiserror::Error;

pub use calib_targets_aruco::rotate_code_u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
  #[error("无效的字典参数: 标记尺寸 {marker_size}, 标记数量 {total_markers}")]
  InvalidGrid {
    marker_size: u32,
    total_markers: u32,
  },
  #[error("未知的字典名称: {0}")]
  UnknownDictionary(String),
  #[error("字典名称中没有网格尺寸: {0}")]
  NotAGrid(String),
}

/// 所有可用的字典
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictionaryKind {
  Dict4x4_50,
  Dict4x4_100,
  Dict4x4_250,
  Dict4x4_1000,
  Dict5x5_50,
  Dict5x5_100,
  Dict5x5_250,
  Dict5x5_1000,
  Dict6x6_50,
  Dict6x6_100,
  Dict6x6_250,
  Dict6x6_1000,
  Dict7x7_50,
  Dict7x7_100,
  Dict7x7_250,
  Dict7x7_1000,
  ArucoOriginal,
  AprilTag16h5,
  AprilTag25h9,
  AprilTag36h10,
  AprilTag36h11,
}

/// 探测字典时的固定顺序，先匹配者胜出。
pub const CATALOG: [DictionaryKind; 20] = [
  DictionaryKind::Dict4x4_50,
  DictionaryKind::Dict4x4_100,
  DictionaryKind::Dict4x4_250,
  DictionaryKind::Dict4x4_1000,
  DictionaryKind::Dict5x5_50,
  DictionaryKind::Dict5x5_100,
  DictionaryKind::Dict5x5_250,
  DictionaryKind::Dict5x5_1000,
  DictionaryKind::Dict6x6_50,
  DictionaryKind::Dict6x6_100,
  DictionaryKind::Dict6x6_250,
  DictionaryKind::Dict6x6_1000,
  DictionaryKind::Dict7x7_50,
  DictionaryKind::Dict7x7_100,
  DictionaryKind::Dict7x7_250,
  DictionaryKind::Dict7x7_1000,
  DictionaryKind::ArucoOriginal,
  DictionaryKind::AprilTag16h5,
  DictionaryKind::AprilTag25h9,
  DictionaryKind::AprilTag36h10,
];

const ALL_KINDS: [DictionaryKind; 21] = [
  DictionaryKind::Dict4x4_50,
  DictionaryKind::Dict4x4_100,
  DictionaryKind::Dict4x4_250,
  DictionaryKind::Dict4x4_1000,
  DictionaryKind::Dict5x5_50,
  DictionaryKind::Dict5x5_100,
  DictionaryKind::Dict5x5_250,
  DictionaryKind::Dict5x5_1000,
  DictionaryKind::Dict6x6_50,
  DictionaryKind::Dict6x6_100,
  DictionaryKind::Dict6x6_250,
  DictionaryKind::Dict6x6_1000,
  DictionaryKind::Dict7x7_50,
  DictionaryKind::Dict7x7_100,
  DictionaryKind::Dict7x7_250,
  DictionaryKind::Dict7x7_1000,
  DictionaryKind::ArucoOriginal,
  DictionaryKind::AprilTag16h5,
  DictionaryKind::AprilTag25h9,
  DictionaryKind::AprilTag36h10,
  DictionaryKind::AprilTag36h11,
];

impl DictionaryKind {
  pub fn name(self) -> &'static str {
    match self {
      DictionaryKind::Dict4x4_50 => "DICT_4X4_50",
      DictionaryKind::Dict4x4_100 => "DICT_4X4_100",
      DictionaryKind::Dict4x4_250 => "DICT_4X4_250",
      DictionaryKind::Dict4x4_1000 => "DICT_4X4_1000",
      DictionaryKind::Dict5x5_50 => "DICT_5X5_50",
      DictionaryKind::Dict5x5_100 => "DICT_5X5_100",
      DictionaryKind::Dict5x5_250 => "DICT_5X5_250",
      DictionaryKind::Dict5x5_1000 => "DICT_5X5_1000",
      DictionaryKind::Dict6x6_50 => "DICT_6X6_50",
      DictionaryKind::Dict6x6_100 => "DICT_6X6_100",
      DictionaryKind::Dict6x6_250 => "DICT_6X6_250",
      DictionaryKind::Dict6x6_1000 => "DICT_6X6_1000",
      DictionaryKind::Dict7x7_50 => "DICT_7X7_50",
      DictionaryKind::Dict7x7_100 => "DICT_7X7_100",
      DictionaryKind::Dict7x7_250 => "DICT_7X7_250",
      DictionaryKind::Dict7x7_1000 => "DICT_7X7_1000",
      DictionaryKind::ArucoOriginal => "DICT_ARUCO_ORIGINAL",
      DictionaryKind::AprilTag16h5 => "DICT_APRILTAG_16h5",
      DictionaryKind::AprilTag25h9 => "DICT_APRILTAG_25h9",
      DictionaryKind::AprilTag36h10 => "DICT_APRILTAG_36h10",
      DictionaryKind::AprilTag36h11 => "DICT_APRILTAG_36h11",
    }
  }

  pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
    ALL_KINDS
      .iter()
      .copied()
      .find(|kind| kind.name() == name)
      .ok_or_else(|| ConfigurationError::UnknownDictionary(name.to_string()))
  }

  /// 由网格尺寸与标记数量确定 `DICT_{n}X{n}_{total}` 字典
  pub fn from_grid(marker_size: u32, total_markers: u32) -> Result<Self, ConfigurationError> {
    let kind = match (marker_size, total_markers) {
      (4, 50) => DictionaryKind::Dict4x4_50,
      (4, 100) => DictionaryKind::Dict4x4_100,
      (4, 250) => DictionaryKind::Dict4x4_250,
      (4, 1000) => DictionaryKind::Dict4x4_1000,
      (5, 50) => DictionaryKind::Dict5x5_50,
      (5, 100) => DictionaryKind::Dict5x5_100,
      (5, 250) => DictionaryKind::Dict5x5_250,
      (5, 1000) => DictionaryKind::Dict5x5_1000,
      (6, 50) => DictionaryKind::Dict6x6_50,
      (6, 100) => DictionaryKind::Dict6x6_100,
      (6, 250) => DictionaryKind::Dict6x6_250,
      (6, 1000) => DictionaryKind::Dict6x6_1000,
      (7, 50) => DictionaryKind::Dict7x7_50,
      (7, 100) => DictionaryKind::Dict7x7_100,
      (7, 250) => DictionaryKind::Dict7x7_250,
      (7, 1000) => DictionaryKind::Dict7x7_1000,
      _ => {
        return Err(ConfigurationError::InvalidGrid {
          marker_size,
          total_markers,
        });
      }
    };
    Ok(kind)
  }

  /// 网格字典的 (标记尺寸, 标记数量)，非网格字典返回 `None`
  pub fn grid(self) -> Option<(u32, u32)> {
    let dictionary = self.dictionary();
    match self {
      DictionaryKind::ArucoOriginal
      | DictionaryKind::AprilTag16h5
      | DictionaryKind::AprilTag25h9
      | DictionaryKind::AprilTag36h10
      | DictionaryKind::AprilTag36h11 => None,
      _ => Some((dictionary.marker_size() as u32, dictionary.len() as u32)),
    }
  }

  /// 对应的内置码表，码值按行优先排列，黑色格为 1
  pub fn dictionary(self) -> Dictionary {
    let inner = match self {
      DictionaryKind::Dict4x4_50 => builtins::DICT_4X4_50,
      DictionaryKind::Dict4x4_100 => builtins::DICT_4X4_100,
      DictionaryKind::Dict4x4_250 => builtins::DICT_4X4_250,
      DictionaryKind::Dict4x4_1000 => builtins::DICT_4X4_1000,
      DictionaryKind::Dict5x5_50 => builtins::DICT_5X5_50,
      DictionaryKind::Dict5x5_100 => builtins::DICT_5X5_100,
      DictionaryKind::Dict5x5_250 => builtins::DICT_5X5_250,
      DictionaryKind::Dict5x5_1000 => builtins::DICT_5X5_1000,
      DictionaryKind::Dict6x6_50 => builtins::DICT_6X6_50,
      DictionaryKind::Dict6x6_100 => builtins::DICT_6X6_100,
      DictionaryKind::Dict6x6_250 => builtins::DICT_6X6_250,
      DictionaryKind::Dict6x6_1000 => builtins::DICT_6X6_1000,
      DictionaryKind::Dict7x7_50 => builtins::DICT_7X7_50,
      DictionaryKind::Dict7x7_100 => builtins::DICT_7X7_100,
      DictionaryKind::Dict7x7_250 => builtins::DICT_7X7_250,
      DictionaryKind::Dict7x7_1000 => builtins::DICT_7X7_1000,
      DictionaryKind::ArucoOriginal => builtins::DICT_ARUCO_ORIGINAL,
      DictionaryKind::AprilTag16h5 => builtins::DICT_APRILTAG_16h5,
      DictionaryKind::AprilTag25h9 => builtins::DICT_APRILTAG_25h9,
      DictionaryKind::AprilTag36h10 => builtins::DICT_APRILTAG_36h10,
      DictionaryKind::AprilTag36h11 => builtins::DICT_APRILTAG_36h11,
    };
    Dictionary { kind: self, inner }
  }
}

impl fmt::Display for DictionaryKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for DictionaryKind {
  type Err = ConfigurationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DictionaryKind::from_name(s)
  }
}

/// 码值匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeMatch {
  pub id: u32,
  /// 字典码值顺时针旋转多少次后得到观测码值
  pub rotation: usize,
  pub distance: u32,
}

/// 一个具体的标记字典：网格尺寸、纠错能力和码表
#[derive(Debug, Clone, Copy)]
pub struct Dictionary {
  kind: DictionaryKind,
  inner: calib_targets_aruco::Dictionary,
}

impl Dictionary {
  pub fn kind(&self) -> DictionaryKind {
    self.kind
  }

  pub fn name(&self) -> &'static str {
    self.kind.name()
  }

  /// 每边的数据格数（不含黑色边框）
  pub fn marker_size(&self) -> usize {
    self.inner.marker_size
  }

  pub fn max_correction_bits(&self) -> u32 {
    self.inner.max_correction_bits as u32
  }

  pub fn len(&self) -> usize {
    self.inner.codes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.codes.is_empty()
  }

  pub fn code(&self, id: u32) -> Option<u64> {
    self.inner.codes.get(id as usize).copied()
  }

  /// 容许 `max_bits` 个错误位的匹配器，四个旋转方向预先展开
  pub fn matcher(&self, max_bits: u32) -> Matcher {
    let max_hamming = max_bits.min(u8::MAX as u32) as u8;
    Matcher::new(self.inner, max_hamming)
  }

  /// 在四个旋转方向上寻找汉明距离最小且不超过 `max_bits` 的码值
  pub fn identify(&self, bits: u64, max_bits: u32) -> Option<CodeMatch> {
    identify_with(&self.matcher(max_bits), bits)
  }
}

pub(crate) fn identify_with(matcher: &Matcher, bits: u64) -> Option<CodeMatch> {
  matcher.match_code(bits).map(|found| CodeMatch {
    id: found.id,
    rotation: found.rotation as usize,
    distance: found.hamming as u32,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn catalog_has_twenty_unique_names_in_order() {
    let names: Vec<&str> = CATALOG.iter().map(|k| k.name()).collect();
    assert_eq!(names.len(), 20);
    assert_eq!(names[0], "DICT_4X4_50");
    assert_eq!(names[5], "DICT_5X5_100");
    assert_eq!(names[16], "DICT_ARUCO_ORIGINAL");
    assert_eq!(names[19], "DICT_APRILTAG_36h10");
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
  }

  #[test]
  fn names_resolve_back_to_kinds() {
    for kind in ALL_KINDS {
      assert_eq!(DictionaryKind::from_name(kind.name()), Ok(kind));
    }
    assert_eq!(
      "DICT_APRILTAG_36h11".parse::<DictionaryKind>(),
      Ok(DictionaryKind::AprilTag36h11)
    );
    assert!(matches!(
      DictionaryKind::from_name("DICT_3X3_50"),
      Err(ConfigurationError::UnknownDictionary(_))
    ));
  }

  #[test]
  fn invalid_grid_is_configuration_error() {
    assert_eq!(
      DictionaryKind::from_grid(3, 50),
      Err(ConfigurationError::InvalidGrid {
        marker_size: 3,
        total_markers: 50
      })
    );
    assert!(DictionaryKind::from_grid(5, 99).is_err());
    assert_eq!(
      DictionaryKind::from_grid(6, 250),
      Ok(DictionaryKind::Dict6x6_250)
    );
  }

  #[test]
  fn grid_families_are_prefixes() {
    let small = DictionaryKind::Dict4x4_50.dictionary();
    let large = DictionaryKind::Dict4x4_1000.dictionary();
    assert_eq!(small.len(), 50);
    assert_eq!(large.len(), 1000);
    for id in 0..50 {
      assert_eq!(small.code(id), large.code(id));
    }
    assert_eq!(DictionaryKind::Dict7x7_250.grid(), Some((7, 250)));
    assert_eq!(DictionaryKind::AprilTag16h5.grid(), None);
  }

  #[test]
  fn dictionaries_have_published_population() {
    let expected = [
      (DictionaryKind::Dict5x5_1000, 1000),
      (DictionaryKind::Dict6x6_1000, 1000),
      (DictionaryKind::Dict7x7_1000, 1000),
      (DictionaryKind::ArucoOriginal, 1024),
      (DictionaryKind::AprilTag16h5, 30),
      (DictionaryKind::AprilTag25h9, 35),
      (DictionaryKind::AprilTag36h10, 2320),
      (DictionaryKind::AprilTag36h11, 587),
    ];
    for (kind, population) in expected {
      assert_eq!(kind.dictionary().len(), population, "{}", kind);
    }
  }

  #[test]
  fn kinds_map_to_builtin_tables() {
    for kind in ALL_KINDS {
      let builtin = builtins::builtin_dictionary(kind.name()).unwrap();
      let dictionary = kind.dictionary();
      assert_eq!(dictionary.marker_size(), builtin.marker_size, "{}", kind);
      assert_eq!(dictionary.len(), builtin.codes.len(), "{}", kind);
      assert_eq!(dictionary.code(0), builtin.codes.first().copied(), "{}", kind);
    }
    assert_eq!(DictionaryKind::Dict4x4_50.dictionary().code(0), Some(0xb352));
    assert_eq!(DictionaryKind::Dict5x5_100.dictionary().code(0), Some(0x18564ba));
    assert_eq!(DictionaryKind::Dict7x7_50.dictionary().max_correction_bits(), 9);
  }

  #[test]
  fn rotate_four_times_is_identity() {
    let code = 0xb352;
    let mut rotated = code;
    for _ in 0..4 {
      rotated = rotate_code_u64(rotated, 4, 1);
    }
    assert_eq!(rotated, code);
    // 左上角格子旋转后到达右上角
    assert_eq!(rotate_code_u64(1, 4, 1), 1 << 3);
  }

  #[test]
  fn identify_finds_rotated_code() {
    let dictionary = DictionaryKind::Dict4x4_50.dictionary();
    let code = dictionary.code(7).unwrap();
    let observed = rotate_code_u64(code, 4, 1);
    let found = dictionary.identify(observed, 0).unwrap();
    assert_eq!(found.id, 7);
    assert_eq!(found.rotation, 1);
    assert_eq!(found.distance, 0);
  }

  #[test]
  fn identify_corrects_single_bit() {
    let dictionary = DictionaryKind::AprilTag36h11.dictionary();
    let code = dictionary.code(42).unwrap();
    let found = dictionary.identify(code ^ (1 << 17), 1).unwrap();
    assert_eq!(found.id, 42);
    assert_eq!(found.distance, 1);
    assert!(dictionary.identify(0, 1).is_none());
  }
}
