// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/model/aruco/candidate.rs - 候选四边形提取
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
use imageproc::{
  contours::{BorderType, find_contours},
  filter::box_filter,
  point::Point,
};
use tracing::debug;

use super::DetectorParameters;
use crate::model::Quad;

const FOREGROUND: u8 = 255;

#[derive(Debug, Clone)]
pub(super) struct Candidate {
  pub corners: Quad,
  pub perimeter: f32,
}

/// 自适应阈值：比窗口均值暗 `constant` 以上的像素为前景
pub(super) fn adaptive_threshold(gray: &GrayImage, window: u32, constant: f32) -> GrayImage {
  let radius = window / 2;
  let mean = box_filter(gray, radius, radius);
  let mut binary = GrayImage::new(gray.width(), gray.height());
  for (x, y, pixel) in gray.enumerate_pixels() {
    let local = mean.get_pixel(x, y)[0] as f32;
    if (pixel[0] as f32) < local - constant {
      binary.put_pixel(x, y, Luma([FOREGROUND]));
    }
  }
  binary
}

/// 在所有阈值窗口下寻找候选四边形，并去除重复与嵌套的候选
pub(super) fn detect_candidates(gray: &GrayImage, params: &DetectorParameters) -> Vec<Candidate> {
  let mut candidates = Vec::new();
  for window in params.threshold_windows() {
    let binary = adaptive_threshold(gray, window, params.adaptive_thresh_constant);
    let found = find_quads(&binary, params);
    debug!("阈值窗口 {}: {} 个候选", window, found.len());
    candidates.extend(found);
  }

  let candidates = filter_too_near(candidates, params.min_marker_distance_rate);
  filter_nested(candidates)
}

fn find_quads(binary: &GrayImage, params: &DetectorParameters) -> Vec<Candidate> {
  let (width, height) = binary.dimensions();
  let max_dimension = width.max(height) as f32;
  let min_length = params.min_marker_perimeter_rate * max_dimension;
  let max_length = params.max_marker_perimeter_rate * max_dimension;

  let mut quads = Vec::new();
  for contour in find_contours::<i32>(binary) {
    if contour.border_type != BorderType::Outer {
      continue;
    }
    let length = contour.points.len() as f32;
    if length < min_length || length > max_length {
      continue;
    }

    let epsilon = (length * params.polygonal_approx_accuracy_rate) as f64;
    let polygon = approximate_closed_polygon(&contour.points, epsilon);
    if polygon.len() != 4 || !is_convex(&polygon) {
      continue;
    }

    let mut corners: Quad = [
      to_f32(polygon[0]),
      to_f32(polygon[1]),
      to_f32(polygon[2]),
      to_f32(polygon[3]),
    ];
    let perimeter = perimeter(&corners);
    if min_side(&corners) < params.min_corner_distance_rate * perimeter {
      continue;
    }

    let border = params.min_distance_to_border as f32;
    let near_border = corners.iter().any(|p| {
      p.x < border
        || p.y < border
        || p.x > (width as f32 - 1.0 - border)
        || p.y > (height as f32 - 1.0 - border)
    });
    if near_border {
      continue;
    }

    make_clockwise(&mut corners);
    quads.push(Candidate { corners, perimeter });
  }
  quads
}

fn to_f32(p: Point<i32>) -> Point<f32> {
  Point::new(p.x as f32, p.y as f32)
}

/// 闭合轮廓的 Douglas-Peucker 近似
///
/// 先以两次最远点搜索得到的近似直径把轮廓分成两段，再分别简化。
pub(super) fn approximate_closed_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
  if contour.len() < 3 {
    return contour.to_vec();
  }

  let first = farthest_from(contour, 0);
  let second = farthest_from(contour, first);
  if first == second {
    return vec![contour[first]];
  }

  let mut polygon = Vec::new();
  simplify_arc(contour, first, second, epsilon, &mut polygon);
  simplify_arc(contour, second, first, epsilon, &mut polygon);
  polygon
}

fn farthest_from(contour: &[Point<i32>], origin: usize) -> usize {
  let o = contour[origin];
  let mut best = origin;
  let mut best_dist = 0i64;
  for (i, p) in contour.iter().enumerate() {
    let dx = (p.x - o.x) as i64;
    let dy = (p.y - o.y) as i64;
    let dist = dx * dx + dy * dy;
    if dist > best_dist {
      best_dist = dist;
      best = i;
    }
  }
  best
}

// 从 start 沿轮廓走到 end，写入 start 及保留下来的中间点，不含 end
fn simplify_arc(
  contour: &[Point<i32>],
  start: usize,
  end: usize,
  epsilon: f64,
  out: &mut Vec<Point<i32>>,
) {
  let len = contour.len();
  let span = (end + len - start) % len;
  let (from, to) = (contour[start], contour[end]);

  let mut max_dist = 0.0;
  let mut split = None;
  for step in 1..span {
    let i = (start + step) % len;
    let dist = distance_to_line(contour[i], from, to);
    if dist > max_dist {
      max_dist = dist;
      split = Some(i);
    }
  }

  match split {
    Some(i) if max_dist > epsilon => {
      simplify_arc(contour, start, i, epsilon, out);
      simplify_arc(contour, i, end, epsilon, out);
    }
    _ => out.push(from),
  }
}

fn distance_to_line(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
  let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
  let (px, py) = ((p.x - a.x) as f64, (p.y - a.y) as f64);
  let norm = (dx * dx + dy * dy).sqrt();
  if norm == 0.0 {
    return (px * px + py * py).sqrt();
  }
  (px * dy - py * dx).abs() / norm
}

pub(super) fn is_convex(polygon: &[Point<i32>]) -> bool {
  let len = polygon.len();
  let mut sign = 0i64;
  for i in 0..len {
    let a = polygon[i];
    let b = polygon[(i + 1) % len];
    let c = polygon[(i + 2) % len];
    let cross = (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
    if cross == 0 {
      continue;
    }
    if sign == 0 {
      sign = cross.signum();
    } else if sign != cross.signum() {
      return false;
    }
  }
  sign != 0
}

pub(super) fn perimeter(corners: &Quad) -> f32 {
  (0..4)
    .map(|i| distance(corners[i], corners[(i + 1) % 4]))
    .sum()
}

fn min_side(corners: &Quad) -> f32 {
  (0..4)
    .map(|i| distance(corners[i], corners[(i + 1) % 4]))
    .fold(f32::INFINITY, f32::min)
}

fn distance(a: Point<f32>, b: Point<f32>) -> f32 {
  ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// 图像坐标（y 轴向下）中保证角点顺时针排列
pub(super) fn make_clockwise(corners: &mut Quad) {
  let (dx1, dy1) = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
  let (dx2, dy2) = (corners[2].x - corners[0].x, corners[2].y - corners[0].y);
  if dx1 * dy2 - dy1 * dx2 < 0.0 {
    corners.swap(1, 3);
  }
}

// 两个候选在最佳角点对应下的平均平方距离
fn mean_square_distance(a: &Quad, b: &Quad) -> f32 {
  (0..4)
    .map(|shift| {
      (0..4)
        .map(|k| {
          let (p, q) = (a[k], b[(k + shift) % 4]);
          (p.x - q.x).powi(2) + (p.y - q.y).powi(2)
        })
        .sum::<f32>()
        / 4.0
    })
    .fold(f32::INFINITY, f32::min)
}

/// 角点过于接近的候选只保留周长较大者
pub(super) fn filter_too_near(candidates: Vec<Candidate>, rate: f32) -> Vec<Candidate> {
  let len = candidates.len();
  let mut removed = vec![false; len];
  for i in 0..len {
    for j in (i + 1)..len {
      if removed[i] || removed[j] {
        continue;
      }
      let min_perimeter = candidates[i].perimeter.min(candidates[j].perimeter);
      let threshold = rate * min_perimeter;
      if mean_square_distance(&candidates[i].corners, &candidates[j].corners) < threshold * threshold {
        if candidates[i].perimeter < candidates[j].perimeter {
          removed[i] = true;
        } else {
          removed[j] = true;
        }
      }
    }
  }

  candidates
    .into_iter()
    .zip(removed)
    .filter_map(|(c, r)| (!r).then_some(c))
    .collect()
}

fn contains(quad: &Quad, p: Point<f32>) -> bool {
  (0..4).all(|i| {
    let (a, b) = (quad[i], quad[(i + 1) % 4]);
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
  })
}

/// 去掉完全落在更大候选内部的候选（例如标记内部的黑色格子）
pub(super) fn filter_nested(candidates: Vec<Candidate>) -> Vec<Candidate> {
  let nested: Vec<bool> = candidates
    .iter()
    .map(|inner| {
      candidates.iter().any(|outer| {
        outer.perimeter > inner.perimeter && inner.corners.iter().all(|&p| contains(&outer.corners, p))
      })
    })
    .collect();

  candidates
    .into_iter()
    .zip(nested)
    .filter_map(|(c, n)| (!n).then_some(c))
    .collect()
}
