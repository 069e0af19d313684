// 该文件是 Xunbiao （寻标） 项目的一部分。
// src/codec.rs - base64 编解码
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

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose};
use thiserror::Error;
use tracing::{debug, info};

// MIME 风格每行字符数
const MIME_LINE_WIDTH: usize = 76;

#[derive(Error, Debug)]
pub enum CodecError {
  #[error("读取文件失败: {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("写入文件失败: {path}: {source}")]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("base64 解码错误: {0}")]
  Decode(#[from] base64::DecodeError),
}

/// 单行 base64 文本
pub fn encode(data: &[u8]) -> String {
  general_purpose::STANDARD.encode(data)
}

/// 每 76 个字符换行，每行（含最后一行）以换行结尾；空输入得到空文本
pub fn encode_mime(data: &[u8]) -> String {
  let flat = encode(data);
  let mut text = String::with_capacity(flat.len() + flat.len() / MIME_LINE_WIDTH + 1);
  for line in flat.as_bytes().chunks(MIME_LINE_WIDTH) {
    // base64 字母表全部是 ASCII
    text.extend(line.iter().map(|&b| b as char));
    text.push('\n');
  }
  text
}

/// 解码单行或分行的 base64 文本，忽略其中的空白字符
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
  let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
  Ok(general_purpose::STANDARD.decode(compact)?)
}

#[derive(Debug, Clone)]
pub struct CodecReport {
  /// 编码得到的分行文本
  pub encoded: String,
  pub input_len: usize,
  pub decoded_len: usize,
}

/// 读取文件，编码后再解码，写入新文件
pub fn round_trip_file(
  input: impl AsRef<Path>,
  output: impl AsRef<Path>,
) -> Result<CodecReport, CodecError> {
  let (input, output) = (input.as_ref(), output.as_ref());

  let data = std::fs::read(input).map_err(|source| CodecError::Read {
    path: input.to_path_buf(),
    source,
  })?;
  debug!("读取 {} 字节: {}", data.len(), input.display());

  let encoded = encode_mime(&data);
  let decoded = decode(&encoded)?;

  if let Some(parent) = output.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent).map_err(|source| CodecError::Write {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  std::fs::write(output, &decoded).map_err(|source| CodecError::Write {
    path: output.to_path_buf(),
    source,
  })?;
  info!("写入 {} 字节: {}", decoded.len(), output.display());

  Ok(CodecReport {
    encoded,
    input_len: data.len(),
    decoded_len: decoded.len(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip_arbitrary_bytes() {
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    assert_eq!(decode(&encode(&data)).unwrap(), data);
    assert_eq!(decode(&encode_mime(&data)).unwrap(), data);
  }

  #[test]
  fn empty_input_round_trips() {
    assert_eq!(encode(&[]), "");
    assert_eq!(encode_mime(&[]), "");
    assert!(decode("").unwrap().is_empty());
  }

  #[test]
  fn mime_lines_are_wrapped() {
    let text = encode_mime(&[0u8; 100]);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].len(), MIME_LINE_WIDTH);
    assert!(text.ends_with('\n'));
    assert_eq!(encode_mime(b"hi"), "aGk=\n");
  }

  #[test]
  fn invalid_text_is_decode_error() {
    assert!(matches!(decode("not base64!"), Err(CodecError::Decode(_))));
  }
}
