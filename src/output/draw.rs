// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/output/draw.rs - 标记检测结果可视化
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

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut},
  rect::Rect,
};
use tracing::{error, warn};

use crate::model::MarkerItem;

const OUTLINE_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const FIRST_CORNER_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const FIRST_CORNER_HALF_SIZE: i32 = 3;
const CENTER_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const CENTER_RADIUS: i32 = 4;
const TEXT_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
// 与 0.5 倍 Hershey 字体的字高相当
const TEXT_FONT_SIZE: f32 = 16.0;
const TEXT_OFFSET_Y: i32 = 15;

static FONT_DATA: &[u8] = include_bytes!("../../assets/font.ttf");

pub struct Draw {
  outline_color: [u8; 3],
  first_corner_color: [u8; 3],
  center_color: [u8; 3],
  center_radius: i32,
  text_color: [u8; 3],
  text_font_size: f32,
  text_offset_y: i32,
  font: Option<FontRef<'static>>,
}

impl Default for Draw {
  fn default() -> Self {
    let font = FontRef::try_from_slice(FONT_DATA)
      .inspect_err(|e| error!("无法加载嵌入的字体文件: {}", e))
      .ok();

    Self {
      outline_color: OUTLINE_COLOR,
      first_corner_color: FIRST_CORNER_COLOR,
      center_color: CENTER_COLOR,
      center_radius: CENTER_RADIUS,
      text_color: TEXT_COLOR,
      text_font_size: TEXT_FONT_SIZE,
      text_offset_y: TEXT_OFFSET_Y,
      font,
    }
  }
}

impl Draw {
  /// 标记轮廓：绿色四边，第一个角点处画蓝色小方框
  pub fn draw_detected_markers(&self, image: &mut RgbImage, markers: &[MarkerItem]) {
    for marker in markers {
      for i in 0..4 {
        let (a, b) = (marker.corners[i], marker.corners[(i + 1) % 4]);
        draw_line_segment_mut(image, (a.x, a.y), (b.x, b.y), Rgb(self.outline_color));
      }

      let first = marker.top_left();
      let side = (2 * FIRST_CORNER_HALF_SIZE + 1) as u32;
      let rect = Rect::at(
        first.x as i32 - FIRST_CORNER_HALF_SIZE,
        first.y as i32 - FIRST_CORNER_HALF_SIZE,
      )
      .of_size(side, side);
      draw_hollow_rect_mut(image, rect, Rgb(self.first_corner_color));
    }
  }

  /// 标记中心的实心圆点
  pub fn draw_center(&self, image: &mut RgbImage, center: (i32, i32)) {
    draw_filled_circle_mut(image, center, self.center_radius, Rgb(self.center_color));
  }

  /// 在左上角上方 `text_offset_y` 像素处写出标记 ID
  pub fn draw_marker_id(&self, image: &mut RgbImage, id: u32, top_left: (i32, i32)) {
    let origin = (top_left.0, top_left.1 - self.text_offset_y);
    self.draw_text(image, &id.to_string(), origin);
  }

  /// 以 `origin` 为基线左端绘制文本
  pub fn draw_text(&self, image: &mut RgbImage, text: &str, origin: (i32, i32)) {
    let Some(font) = &self.font else {
      warn!("没有可用字体，跳过文本: {}", text);
      return;
    };

    let scale = PxScale::from(self.text_font_size);
    // draw_text_mut 的 y 是文本框顶部
    let ascent = font.as_scaled(scale).ascent();
    let top = origin.1 - ascent.round() as i32;
    draw_text_mut(image, Rgb(self.text_color), origin.0, top, scale, font, text);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use imageproc::point::Point;

  #[test]
  fn center_dot_is_red() {
    let mut image = RgbImage::new(20, 20);
    Draw::default().draw_center(&mut image, (10, 10));
    assert_eq!(image.get_pixel(10, 10), &Rgb(CENTER_COLOR));
    assert_eq!(image.get_pixel(10, 14), &Rgb(CENTER_COLOR));
    assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
  }

  #[test]
  fn embedded_font_loads() {
    assert!(Draw::default().font.is_some());
  }

  #[test]
  fn id_text_is_drawn_above_the_corner() {
    let mut image = RgbImage::new(60, 60);
    Draw::default().draw_marker_id(&mut image, 7, (10, 40));
    // 基线位于 y = 25，字高约 12 像素
    let inked_rows: Vec<u32> = (0..60)
      .filter(|&y| (0..60).any(|x| image.get_pixel(x, y)[1] > 0))
      .collect();
    assert!(!inked_rows.is_empty());
    assert!(inked_rows.iter().all(|&y| (8..=27).contains(&y)));
    // 文本只用绿色通道
    assert!(image.pixels().all(|p| p[0] == 0 && p[2] == 0));
  }

  #[test]
  fn multi_digit_ids_extend_to_the_right() {
    let draw = Draw::default();
    let mut short = RgbImage::new(120, 40);
    let mut long = RgbImage::new(120, 40);
    draw.draw_marker_id(&mut short, 7, (5, 35));
    draw.draw_marker_id(&mut long, 1007, (5, 35));
    let rightmost = |image: &RgbImage| {
      (0..120)
        .filter(|&x| (0..40).any(|y| image.get_pixel(x, y)[1] > 0))
        .max()
        .unwrap_or(0)
    };
    assert!(rightmost(&long) > rightmost(&short) + 20);
  }

  #[test]
  fn outline_marks_first_corner() {
    let mut image = RgbImage::new(40, 40);
    let marker = MarkerItem {
      id: 0,
      corners: [
        Point::new(10.0, 10.0),
        Point::new(30.0, 10.0),
        Point::new(30.0, 30.0),
        Point::new(10.0, 30.0),
      ],
      distance: 0,
    };
    Draw::default().draw_detected_markers(&mut image, &[marker]);
    assert_eq!(image.get_pixel(20, 30), &Rgb(OUTLINE_COLOR));
    assert_eq!(image.get_pixel(7, 7), &Rgb(FIRST_CORNER_COLOR));
  }
}
