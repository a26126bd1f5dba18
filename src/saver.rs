//! Orquestra um salvamento: contador, metadados, templates, pasta e gravação.

use anyhow::Result;
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

use crate::encoder::{self, ImageTensor};
use crate::error::SaveError;
use crate::metadata;
use crate::template::{TemplateFormatter, DEFAULT_TIME_FORMAT};

/// Referência a um arquivo gravado, no formato que a UI do host espera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDescriptor {
    pub filename: String,
    pub subfolder: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Salvador de lotes. O contador vive enquanto a instância viver e só é
/// alterado por `save(&mut self, ...)`; o host não deve compartilhar a
/// mesma instância entre threads.
#[derive(Debug)]
pub struct BatchImageSaver {
    output_dir: PathBuf,
    time_format: String,
    counter: u64,
    formatter: TemplateFormatter,
}

impl BatchImageSaver {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_time_format(output_dir, DEFAULT_TIME_FORMAT)
    }

    pub fn with_time_format(output_dir: impl Into<PathBuf>, time_format: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            time_format: time_format.to_string(),
            counter: 0,
            formatter: TemplateFormatter::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Quantidade de salvamentos já iniciados por esta instância.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn save(
        &mut self,
        images: &[ImageTensor],
        filename_template: &str,
        path_template: &str,
        extension: &str,
        prompt: Option<&Value>,
        extra: Option<&Value>,
    ) -> Result<Vec<OutputDescriptor>> {
        self.counter += 1;

        let mut meta = metadata::extract_metadata(extra, prompt);
        meta.counter = self.counter;

        let filename_base = self
            .formatter
            .format(filename_template, &meta, &self.time_format);
        // Template de pasta vazio significa "sem subpasta"
        let relative_path = if path_template.is_empty() {
            String::new()
        } else {
            self.formatter.format(path_template, &meta, &self.time_format)
        };

        let output_path = if relative_path.trim().is_empty() {
            self.output_dir.clone()
        } else {
            self.output_dir.join(&relative_path)
        };
        debug!(
            "Salvamento #{}: base \"{}\" em {}",
            self.counter,
            filename_base,
            output_path.display()
        );

        let extension = extension.to_lowercase();
        encoder::check_extension(&extension)?;

        std::fs::create_dir_all(&output_path)
            .map_err(|e| SaveError::CreateDir(format!("{}: {e}", output_path.display())))?;

        let saved = encoder::save_batch(images, &output_path, &filename_base, &extension)?;

        let subfolder = subfolder_for(&relative_path);
        Ok(saved
            .into_iter()
            .map(|filename| OutputDescriptor {
                filename,
                subfolder: subfolder.clone(),
                kind: "output".to_string(),
            })
            .collect())
    }
}

/// Forma com `/` do caminho relativo; vazio quando não há subpasta ou
/// quando o caminho se reduz a `.`.
pub fn subfolder_for(relative_path: &str) -> String {
    if relative_path.trim().is_empty() {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in Path::new(relative_path).components() {
        match component {
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => parts.push("..".to_string()),
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().into_owned())
            }
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
