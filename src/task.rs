// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/task.rs - 任务驱动
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

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::{
  annotate::{AnnotateError, Annotation, MarkerAnnotator},
  frame::Frame,
  output::Render,
  probe::{DictionaryProber, parse_grid_name},
};

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_ERROR: u16 = 500;
pub const INTERNAL_ERROR_PAYLOAD: &str = "Internal error";

pub trait Task<I, O>: Sized {
  type Output;
  fn run_task(self, input: I, output: O) -> Self::Output;
}

/// 失败发生在哪个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Load,
  Probe,
  NoMarkersFound,
  Annotate,
  Render,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Load => "load",
      Stage::Probe => "probe",
      Stage::NoMarkersFound => "no_markers_found",
      Stage::Annotate => "annotate",
      Stage::Render => "render",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
  pub stage: Stage,
  pub message: String,
}

/// `(ok, payload, code)` 形式的响应，成功时 payload 是标注图像的 base64 文本
#[derive(Debug, Clone)]
pub struct TaskResponse {
  pub ok: bool,
  pub payload: String,
  pub code: u16,
  pub dictionary: Option<String>,
  pub failure: Option<TaskFailure>,
}

impl TaskResponse {
  fn success(annotation: Annotation) -> Self {
    Self {
      ok: true,
      payload: annotation.encoded,
      code: STATUS_OK,
      dictionary: Some(annotation.dictionary.name().to_string()),
      failure: None,
    }
  }

  fn failure(stage: Stage, message: impl fmt::Display) -> Self {
    let message = message.to_string();
    error!("任务在 {} 阶段失败: {}", stage, message);
    Self {
      ok: false,
      payload: INTERNAL_ERROR_PAYLOAD.to_string(),
      code: STATUS_INTERNAL_ERROR,
      dictionary: None,
      failure: Some(TaskFailure { stage, message }),
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    let mut value = serde_json::json!({
      "ok": self.ok,
      "payload": self.payload,
      "code": self.code,
    });
    if let Some(dictionary) = &self.dictionary {
      value["dictionary"] = serde_json::json!(dictionary);
    }
    if let Some(failure) = &self.failure {
      value["failure"] = serde_json::json!({
        "stage": failure.stage.to_string(),
        "message": failure.message,
      });
    }
    value
  }
}

/// 读取一帧，探测字典，标注并输出；任何阶段的失败都转换为 500 响应
pub struct OneShotTask {
  prober: DictionaryProber,
  annotator: MarkerAnnotator,
  draw: bool,
}

impl OneShotTask {
  pub fn new(prober: DictionaryProber, annotator: MarkerAnnotator) -> Self {
    Self {
      prober,
      annotator,
      draw: true,
    }
  }

  pub fn draw(mut self, draw: bool) -> Self {
    self.draw = draw;
    self
  }

  fn annotate(&self, frame: &mut Frame, dictionary_name: &str) -> Result<Annotation, AnnotateError> {
    match parse_grid_name(dictionary_name) {
      Ok((marker_size, total_markers)) => {
        debug!("标记尺寸: {}, 标记数量: {}", marker_size, total_markers);
        self
          .annotator
          .annotate(frame, marker_size, total_markers, self.draw)
      }
      Err(_) => {
        let kind = dictionary_name.parse()?;
        debug!("非网格字典 {}，直接标注", dictionary_name);
        self.annotator.annotate_with(frame, kind, self.draw)
      }
    }
  }
}

impl Default for OneShotTask {
  fn default() -> Self {
    Self::new(DictionaryProber::default(), MarkerAnnotator::default())
  }
}

impl<E, I, O> Task<I, Option<O>> for OneShotTask
where
  E: std::error::Error,
  I: Iterator<Item = Result<Frame, E>>,
  O: Render<Frame, Annotation>,
  O::Error: fmt::Display,
{
  type Output = TaskResponse;

  fn run_task(self, mut input: I, output: Option<O>) -> TaskResponse {
    info!("开始任务...");
    let now = std::time::Instant::now();

    let mut frame = match input.next() {
      Some(Ok(frame)) => frame,
      Some(Err(e)) => return TaskResponse::failure(Stage::Load, e),
      None => return TaskResponse::failure(Stage::Load, "没有输入帧"),
    };
    info!("输入帧获取成功: {}x{}", frame.width(), frame.height());

    let outcome = match self.prober.probe(&frame) {
      Ok(outcome) => outcome,
      Err(e) => return TaskResponse::failure(Stage::Probe, e),
    };
    let names = outcome.dictionary_names();
    let Some(name) = names.first() else {
      return TaskResponse::failure(Stage::NoMarkersFound, "所有字典均未检测到标记");
    };
    info!("探测完成，字典: {}，耗时: {:.2?}", name, now.elapsed());

    let annotation = match self.annotate(&mut frame, name) {
      Ok(annotation) => annotation,
      Err(e) => return TaskResponse::failure(Stage::Annotate, e),
    };
    info!(
      "标注完成: {} 个标记，耗时: {:.2?}",
      annotation.markers.len(),
      now.elapsed()
    );

    if let Some(output) = output
      && let Err(e) = output.render_result(&frame, &annotation)
    {
      warn!("输出标注结果失败");
      return TaskResponse::failure(Stage::Render, e);
    }

    TaskResponse::success(annotation)
  }
}
