// 该文件是 Xunbiao （寻标） 项目的一部分。
// tests/common/mod.rs - 测试用合成标记图像
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

#![allow(dead_code)]

use calib_targets_aruco::{builtins::builtin_dictionary, rotate_code_u64};
use image::{Rgb, RgbImage};
use xunbiao::{dictionary::DictionaryKind, frame::Frame};

pub const CELL: u32 = 20;
pub const QUIET_ZONE: u32 = 40;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// 按名称取 OpenCV 发布的码表，与被测代码的查表路径无关
fn reference_table(kind: DictionaryKind) -> calib_targets_aruco::Dictionary {
  builtin_dictionary(kind.name()).expect("no reference table for dictionary")
}

/// 标记（含黑色边框）的边长像素数
pub fn marker_side(kind: DictionaryKind) -> u32 {
  (reference_table(kind).marker_size as u32 + 2) * CELL
}

/// 在 `(x0, y0)` 处画出顺时针旋转 `rotation` 次的标记
pub fn paint_marker(
  image: &mut RgbImage,
  kind: DictionaryKind,
  id: u32,
  rotation: usize,
  x0: u32,
  y0: u32,
) {
  let table = reference_table(kind);
  let size = table.marker_size;
  let code = rotate_code_u64(table.codes[id as usize], size, rotation as u8);

  let cells = size as u32 + 2;
  for y in 0..cells * CELL {
    for x in 0..cells * CELL {
      let (cx, cy) = ((x / CELL) as usize, (y / CELL) as usize);
      let inner = (1..=size).contains(&cx) && (1..=size).contains(&cy);
      // 码值按行优先排列，1 为黑色
      let black = !inner || (code >> ((cy - 1) * size + (cx - 1))) & 1 != 0;
      image.put_pixel(x0 + x, y0 + y, if black { BLACK } else { WHITE });
    }
  }
}

/// 一个标记居中、四周留白的图像
pub fn single_marker(kind: DictionaryKind, id: u32, rotation: usize) -> Frame {
  let side = marker_side(kind) + 2 * QUIET_ZONE;
  let mut image = RgbImage::from_pixel(side, side, WHITE);
  paint_marker(&mut image, kind, id, rotation, QUIET_ZONE, QUIET_ZONE);
  Frame::from(image)
}

/// 横向并排的多个标记
pub fn marker_row(kind: DictionaryKind, ids: &[u32]) -> Frame {
  let side = marker_side(kind);
  let width = ids.len() as u32 * (side + QUIET_ZONE) + QUIET_ZONE;
  let height = side + 2 * QUIET_ZONE;
  let mut image = RgbImage::from_pixel(width, height, WHITE);
  for (i, &id) in ids.iter().enumerate() {
    let x0 = QUIET_ZONE + i as u32 * (side + QUIET_ZONE);
    paint_marker(&mut image, kind, id, 0, x0, QUIET_ZONE);
  }
  Frame::from(image)
}

pub fn blank(width: u32, height: u32) -> Frame {
  Frame::from(RgbImage::from_pixel(width, height, WHITE))
}

/// 白底上的实心黑色方块，不对应任何码值
pub fn black_square(side: u32) -> Frame {
  let canvas = side + 2 * QUIET_ZONE;
  let mut image = RgbImage::from_pixel(canvas, canvas, WHITE);
  for y in QUIET_ZONE..QUIET_ZONE + side {
    for x in QUIET_ZONE..QUIET_ZONE + side {
      image.put_pixel(x, y, BLACK);
    }
  }
  Frame::from(image)
}
