// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/bin/aruco_oneshot.rs - 单张图像字典探测与标注
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use tracing::info;
use xunbiao::{
  FromUrl,
  annotate::MarkerAnnotator,
  frame::PixelOrder,
  input::ImageFileInput,
  model::ArucoDetectorBuilder,
  output::OutputWrapper,
  probe::DictionaryProber,
  task::{OneShotTask, Task},
};

/// Xunbiao 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像
  #[arg(long, value_name = "SOURCE", default_value = "image:///images/padded.png")]
  pub input: Url,
  /// 检测器配置，查询参数覆盖默认检测参数
  #[arg(long, value_name = "DETECTOR", default_value = "aruco:")]
  pub detector: Url,
  /// 标注图像的保存位置
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
  /// 不绘制标记轮廓
  #[arg(long)]
  pub no_draw: bool,
  /// 以 RGB 顺序编码像素（默认 BGR）
  #[arg(long)]
  pub rgb: bool,
  /// 以 JSON 输出响应
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("检测器配置: {}", args.detector);
  if let Some(output) = &args.output {
    info!("输出路径: {}", output);
  }

  let input = ImageFileInput::from_url(&args.input)?;
  let output = args
    .output
    .as_ref()
    .map(OutputWrapper::from_url)
    .transpose()?;

  let builder = ArucoDetectorBuilder::from_url(&args.detector)?;
  let prober = DictionaryProber::new(builder.clone());
  let order = if args.rgb {
    PixelOrder::Rgb
  } else {
    PixelOrder::Bgr
  };
  let annotator = MarkerAnnotator::new(builder).pixel_order(order);

  let response = OneShotTask::new(prober, annotator)
    .draw(!args.no_draw)
    .run_task(input, output);

  if args.json {
    println!("{}", serde_json::to_string_pretty(&response.to_json())?);
  } else {
    println!("Status: {}", response.ok);
    println!("Response: {}", response.payload);
    println!("Code: {}", response.code);
  }

  Ok(())
}
