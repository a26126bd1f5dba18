use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SaveError;

/// Imagem em memória no layout altura × largura × canais, valores em `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    height: u32,
    width: u32,
    channels: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn new(height: u32, width: u32, channels: usize, data: Vec<f32>) -> Result<Self, SaveError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(SaveError::UnsupportedChannels(channels));
        }
        let expected = height as usize * width as usize * channels;
        if data.len() != expected {
            return Err(SaveError::TensorShape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Converte uma imagem decodificada para o layout normalizado.
    /// Cada valor fica no centro do seu intervalo de quantização, então
    /// `to_image` devolve exatamente os mesmos bytes.
    pub fn from_image(img: &DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (channels, bytes) = if img.color().has_alpha() {
            (4, img.to_rgba8().into_raw())
        } else if img.color().channel_count() == 1 {
            (1, img.to_luma8().into_raw())
        } else {
            (3, img.to_rgb8().into_raw())
        };
        let data = bytes
            .into_iter()
            .map(|b| (f32::from(b) + 0.5) / 255.0)
            .collect();
        Self {
            height,
            width,
            channels,
            data,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Quantiza para 8 bits por canal.
    pub fn to_image(&self) -> Result<DynamicImage, SaveError> {
        let bytes: Vec<u8> = self.data.iter().map(|&v| quantize(v)).collect();
        let shape_error = || SaveError::TensorShape {
            expected: self.height as usize * self.width as usize * self.channels,
            actual: self.data.len(),
        };
        let img = match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, bytes).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, bytes).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(self.width, self.height, bytes).map(DynamicImage::ImageRgba8),
            n => return Err(SaveError::UnsupportedChannels(n)),
        };
        img.ok_or_else(shape_error)
    }
}

/// `[0, 1]` → `[0, 255]`, cortando fora do intervalo e truncando.
pub fn quantize(value: f32) -> u8 {
    // NaN passa pelo clamp e vira 0 no cast
    (value * 255.0).clamp(0.0, 255.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub compress_level: Option<u8>,
    pub quality: Option<u8>,
    pub method: Option<u8>,
    pub optimize: bool,
}

const GENERIC_OPTIONS: EncodeOptions = EncodeOptions {
    compress_level: None,
    quality: None,
    method: None,
    optimize: true,
};

/// Opções de gravação por extensão (já em minúsculas).
const SAVE_CONFIGS: &[(&str, EncodeOptions)] = &[
    (
        "png",
        EncodeOptions {
            compress_level: Some(4),
            ..GENERIC_OPTIONS
        },
    ),
    (
        "jpeg",
        EncodeOptions {
            quality: Some(95),
            ..GENERIC_OPTIONS
        },
    ),
    (
        "webp",
        EncodeOptions {
            quality: Some(95),
            method: Some(6),
            ..GENERIC_OPTIONS
        },
    ),
];

pub fn encode_options(extension: &str) -> EncodeOptions {
    SAVE_CONFIGS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, opts)| *opts)
        .unwrap_or(GENERIC_OPTIONS)
}

enum Codec {
    Png,
    Jpeg,
    WebP,
    Other(ImageFormat),
}

fn codec_for(extension: &str) -> Result<Codec, SaveError> {
    match extension {
        "png" => Ok(Codec::Png),
        "jpeg" => Ok(Codec::Jpeg),
        "webp" => Ok(Codec::WebP),
        other => ImageFormat::from_extension(other)
            .filter(|f| f.writing_enabled())
            .map(Codec::Other)
            .ok_or_else(|| SaveError::UnsupportedFormat(other.to_string())),
    }
}

/// Falha se a extensão não tem encoder, antes de qualquer arquivo ou pasta.
pub fn check_extension(extension: &str) -> Result<(), SaveError> {
    codec_for(extension).map(|_| ())
}

/// Nível zlib 0-9; sem nível, o preset padrão do encoder.
fn png_compression(level: Option<u8>) -> CompressionType {
    match level {
        Some(level) => CompressionType::Level(level.min(9)),
        None => CompressionType::Default,
    }
}

/// WebP com perdas via libwebp, usando qualidade e método das opções.
fn encode_webp(img: &DynamicImage, opts: &EncodeOptions) -> Result<Vec<u8>, String> {
    let mut config = webp::WebPConfig::new().map_err(|_| "WebPConfig inválido".to_string())?;
    config.lossless = 0;
    config.quality = f32::from(opts.quality.unwrap_or(75));
    config.method = i32::from(opts.method.unwrap_or(4));

    let (width, height) = (img.width(), img.height());
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_advanced(&config);
        encoded
    } else {
        let rgb = img.to_rgb8();
        let encoded = webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_advanced(&config);
        encoded
    };
    let memory = encoded.map_err(|e| format!("{e:?}"))?;
    Ok(memory.to_vec())
}

pub fn write_image(img: &DynamicImage, path: &Path, extension: &str) -> Result<()> {
    let codec = codec_for(extension)?;
    let opts = encode_options(extension);
    debug!("Gravando {} com {:?}", path.display(), opts);

    let file = File::create(path)
        .with_context(|| format!("Não foi possível criar {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let result = match codec {
        Codec::Png => {
            let filter = if opts.optimize {
                FilterType::Adaptive
            } else {
                FilterType::Sub
            };
            let encoder =
                PngEncoder::new_with_quality(&mut writer, png_compression(opts.compress_level), filter);
            img.write_with_encoder(encoder).map_err(|e| e.to_string())
        }
        Codec::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, opts.quality.unwrap_or(95));
            // JPEG não tem canal alfa
            let written = if img.color().has_alpha() {
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
            } else {
                img.write_with_encoder(encoder)
            };
            written.map_err(|e| e.to_string())
        }
        Codec::WebP => encode_webp(img, &opts)
            .and_then(|bytes| writer.write_all(&bytes).map_err(|e| e.to_string())),
        Codec::Other(format) => img.write_to(&mut writer, format).map_err(|e| e.to_string()),
    };
    result.map_err(|e| SaveError::EncodingFailed(format!("{}: {e}", path.display())))?;

    writer
        .flush()
        .with_context(|| format!("Falha ao gravar {}", path.display()))?;
    Ok(())
}

/// Lote com mais de uma imagem ganha sufixo `_01`, `_02`, ...
pub fn batch_filename(base: &str, index: usize, batch_len: usize, extension: &str) -> String {
    if batch_len > 1 {
        format!("{base}_{:02}.{extension}", index + 1)
    } else {
        format!("{base}.{extension}")
    }
}

/// Grava o lote em ordem e devolve os nomes dos arquivos escritos.
/// Uma falha interrompe o lote; o que já foi gravado fica no disco.
pub fn save_batch(
    images: &[ImageTensor],
    output_dir: &Path,
    filename_base: &str,
    extension: &str,
) -> Result<Vec<String>> {
    let mut saved = Vec::with_capacity(images.len());

    for (idx, tensor) in images.iter().enumerate() {
        let img = tensor.to_image()?;
        let filename = batch_filename(filename_base, idx, images.len(), extension);
        let path = output_dir.join(&filename);
        write_image(&img, &path, extension)?;
        info!("Imagem salva: {}", path.display());
        saved.push(filename);
    }

    Ok(saved)
}
