// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/model/aruco/sampling.rs - 透视采样与格子读取
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

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

use super::DetectorParameters;
use crate::model::Quad;

/// 单位正方形到任意四边形的透视变换，行优先 3×3
fn square_to_quad(quad: &Quad) -> [f64; 9] {
  let [p0, p1, p2, p3] = quad.map(|p| (p.x as f64, p.y as f64));
  let px = p0.0 - p1.0 + p2.0 - p3.0;
  let py = p0.1 - p1.1 + p2.1 - p3.1;

  if px == 0.0 && py == 0.0 {
    // 仿射情形
    return [
      p1.0 - p0.0,
      p2.0 - p1.0,
      p0.0,
      p1.1 - p0.1,
      p2.1 - p1.1,
      p0.1,
      0.0,
      0.0,
      1.0,
    ];
  }

  let (dx1, dx2) = (p1.0 - p2.0, p3.0 - p2.0);
  let (dy1, dy2) = (p1.1 - p2.1, p3.1 - p2.1);
  let den = dx1 * dy2 - dx2 * dy1;
  let g = (px * dy2 - dx2 * py) / den;
  let h = (dx1 * py - px * dy1) / den;

  [
    p1.0 - p0.0 + g * p1.0,
    p3.0 - p0.0 + h * p3.0,
    p0.0,
    p1.1 - p0.1 + g * p1.1,
    p3.1 - p0.1 + h * p3.1,
    p0.1,
    g,
    h,
    1.0,
  ]
}

fn bilinear(gray: &GrayImage, x: f64, y: f64) -> f64 {
  let (width, height) = gray.dimensions();
  let x = x.clamp(0.0, (width - 1) as f64);
  let y = y.clamp(0.0, (height - 1) as f64);
  let (x0, y0) = (x.floor() as u32, y.floor() as u32);
  let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
  let (fx, fy) = (x - x0 as f64, y - y0 as f64);

  let at = |px: u32, py: u32| gray.get_pixel(px, py)[0] as f64;
  let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
  let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
  top * (1.0 - fy) + bottom * fy
}

/// 将候选四边形内部透视展开为 `side × side` 的正方形图块
pub(super) fn warp_patch(gray: &GrayImage, quad: &Quad, side: u32) -> GrayImage {
  let m = square_to_quad(quad);
  let side_f = side as f64;
  GrayImage::from_fn(side, side, |u, v| {
    let s = (u as f64 + 0.5) / side_f;
    let t = (v as f64 + 0.5) / side_f;
    let w = m[6] * s + m[7] * t + m[8];
    let x = (m[0] * s + m[1] * t + m[2]) / w;
    let y = (m[3] * s + m[4] * t + m[5]) / w;
    Luma([bilinear(gray, x, y) as u8])
  })
}

fn mean_and_std_dev(patch: &GrayImage) -> (f64, f64) {
  let count = patch.as_raw().len().max(1) as f64;
  let mean = patch.as_raw().iter().map(|&v| v as f64).sum::<f64>() / count;
  let variance = patch
    .as_raw()
    .iter()
    .map(|&v| (v as f64 - mean).powi(2))
    .sum::<f64>()
    / count;
  (mean, variance.sqrt())
}

/// 读取 `cells × cells` 格子的黑白值（含边框），`true` 表示白色
pub(super) fn read_cells(
  gray: &GrayImage,
  quad: &Quad,
  cells: usize,
  params: &DetectorParameters,
) -> Vec<bool> {
  let cell_px = params.perspective_remove_pixel_per_cell as usize;
  let side = (cells * cell_px) as u32;
  let patch = warp_patch(gray, quad, side);

  let (mean, std_dev) = mean_and_std_dev(&patch);
  if std_dev < params.min_otsu_std_dev as f64 {
    // 整块颜色一致，Otsu 阈值没有意义
    return vec![mean > 127.0; cells * cells];
  }

  let level = otsu_level(&patch);
  let margin = (cell_px as f32 * params.perspective_remove_ignored_margin_per_cell) as usize;
  let mut bits = Vec::with_capacity(cells * cells);
  for cy in 0..cells {
    for cx in 0..cells {
      let (x_start, x_end) = (cx * cell_px + margin, (cx + 1) * cell_px - margin);
      let (y_start, y_end) = (cy * cell_px + margin, (cy + 1) * cell_px - margin);
      let mut white = 0usize;
      let mut area = 0usize;
      for y in y_start..y_end {
        for x in x_start..x_end {
          area += 1;
          if patch.get_pixel(x as u32, y as u32)[0] > level {
            white += 1;
          }
        }
      }
      bits.push(white * 2 > area);
    }
  }
  bits
}
