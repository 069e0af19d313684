// 该文件是 Xunbiao （寻标） 项目的一部分。
// tests/codec.rs - 文件往返编解码测试
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

use xunbiao::codec::{CodecError, round_trip_file};

#[test]
fn file_is_copied_byte_for_byte() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("nature.jpeg");
  let output = dir.path().join("new_scenary.jpg");

  let data: Vec<u8> = (0..1000u32).map(|i| (i * 37 % 251) as u8).collect();
  std::fs::write(&input, &data).unwrap();

  let report = round_trip_file(&input, &output).unwrap();
  assert_eq!(report.input_len, 1000);
  assert_eq!(report.decoded_len, 1000);
  assert_eq!(std::fs::read(&output).unwrap(), data);

  for line in report.encoded.lines() {
    assert!(line.len() <= 76);
  }
  assert!(report.encoded.ends_with('\n'));
}

#[test]
fn empty_file_round_trips_to_empty_file() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("empty.bin");
  let output = dir.path().join("nested").join("copy.bin");
  std::fs::write(&input, b"").unwrap();

  let report = round_trip_file(&input, &output).unwrap();
  assert!(report.encoded.is_empty());
  assert_eq!(report.decoded_len, 0);
  assert!(std::fs::read(&output).unwrap().is_empty());
}

#[test]
fn missing_input_is_a_read_error() {
  let dir = tempfile::tempdir().unwrap();
  let result = round_trip_file(dir.path().join("absent"), dir.path().join("copy"));
  assert!(matches!(result, Err(CodecError::Read { .. })));
  assert!(!dir.path().join("copy").exists());
}
