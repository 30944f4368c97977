// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/input/image_sequence.rs - 图像序列输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, input::FrameSource};

#[derive(Error, Debug)]
pub enum ImageSequenceInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Invalid path encoding: {0}")]
  PathEncoding(String),
  #[error("No image files in directory: {}", .0.display())]
  EmptyDirectory(PathBuf),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error ({}): {source}", .path.display())]
  ImageLoadError {
    path: PathBuf,
    source: image::ImageError,
  },
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// 按文件名顺序逐张读取目录中的图片
///
/// URL 形式为 `seq:///path/to/frames`。读取失败的文件会被跳过，
/// 不会在下一次调用时重复读取。
pub struct ImageSequenceInput {
  files: Vec<PathBuf>,
  next: usize,
  dimensions: Option<(u32, u32)>,
}

impl FromUrlWithScheme for ImageSequenceInput {
  const SCHEME: &'static str = "seq";
}

impl FromUrl for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageSequenceInputError::SchemaMismatch);
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| ImageSequenceInputError::PathEncoding(e.to_string()))?;
    Self::open(path.as_ref())
  }
}

impl ImageSequenceInput {
  pub fn open(directory: impl AsRef<Path>) -> Result<Self, ImageSequenceInputError> {
    let directory = directory.as_ref();
    let mut files = std::fs::read_dir(directory)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| path.is_file() && is_image_file(path))
      .collect::<Vec<_>>();
    files.sort();

    if files.is_empty() {
      return Err(ImageSequenceInputError::EmptyDirectory(
        directory.to_path_buf(),
      ));
    }

    let dimensions = image::image_dimensions(&files[0]).ok();
    debug!("图像序列 {:?}: {} 帧", directory, files.len());

    Ok(Self {
      files,
      next: 0,
      dimensions,
    })
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_ascii_lowercase();
      IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

impl FrameSource for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn read_frame(&mut self) -> Result<Option<RgbFrame>, Self::Error> {
    let Some(path) = self.files.get(self.next) else {
      return Ok(None);
    };
    self.next += 1;

    let load = |path: &Path| -> Result<image::DynamicImage, image::ImageError> {
      Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
    };
    let image = load(path.as_path()).map_err(|source| ImageSequenceInputError::ImageLoadError {
      path: path.clone(),
      source,
    })?;

    let image = image.into_rgb8();
    self.dimensions.get_or_insert(image.dimensions());
    Ok(Some(RgbFrame::from(image)))
  }

  fn dimensions(&self) -> Option<(u32, u32)> {
    self.dimensions
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn write_frames(dir: &Path, count: u8) {
    for i in 0..count {
      let image = RgbImage::from_pixel(8, 6, Rgb([i * 10, 0, 0]));
      image.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
    }
  }

  #[test]
  fn reads_frames_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 3);
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let url = Url::from_directory_path(dir.path()).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "seq", 1)).unwrap();
    let mut input = ImageSequenceInput::from_url(&url).unwrap();
    assert_eq!(input.len(), 3);
    assert_eq!(input.dimensions(), Some((8, 6)));

    for i in 0..3u8 {
      let frame = input.read_frame().unwrap().unwrap();
      assert_eq!(frame.as_image().get_pixel(0, 0)[0], i * 10);
    }
    assert!(input.read_frame().unwrap().is_none());
  }

  #[test]
  fn broken_file_is_reported_then_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), b"not a png").unwrap();
    RgbImage::new(4, 4).save(dir.path().join("b.png")).unwrap();

    let mut input = ImageSequenceInput::open(dir.path()).unwrap();
    assert!(matches!(
      input.read_frame(),
      Err(ImageSequenceInputError::ImageLoadError { .. })
    ));
    assert!(input.read_frame().unwrap().is_some());
    assert!(input.read_frame().unwrap().is_none());
  }

  #[test]
  fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      ImageSequenceInput::open(dir.path()),
      Err(ImageSequenceInputError::EmptyDirectory(_))
    ));
  }
}
