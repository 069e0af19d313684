// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/bin/codec_roundtrip.rs - 文件 base64 往返编解码
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

/// 读取文件，编码为 base64 后再解码写回新文件
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入文件
  #[arg(long, value_name = "FILE", default_value = "/images/nature.jpeg")]
  pub input: PathBuf,
  /// 解码后写入的文件
  #[arg(long, value_name = "FILE", default_value = "/images/new_scenary.jpg")]
  pub output: PathBuf,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  info!("输入文件: {}", args.input.display());
  info!("输出文件: {}", args.output.display());

  let report = xunbiao::codec::round_trip_file(&args.input, &args.output)
    .with_context(|| format!("往返编解码失败: {}", args.input.display()))?;

  println!("Image to Encoded string:");
  print!("{}", report.encoded);
  println!("The size of the decoded image: {}", report.decoded_len);

  Ok(())
}
