pub mod config;
pub mod encoder;
pub mod error;
pub mod metadata;
pub mod node;
pub mod saver;
pub mod template;

use std::path::{Path, PathBuf};

pub use encoder::ImageTensor;
pub use saver::{BatchImageSaver, OutputDescriptor};

/// Procura o diretório de configuração em vários locais possíveis.
/// Sem nenhum candidato com `batchsave.toml`, devolve `config`.
pub fn find_config_dir(exe_dir: &Path) -> PathBuf {
    let candidates = [
        PathBuf::from("config"),
        exe_dir.join("config"),
        exe_dir.join("../config"),
        // For target/release/ layout: go up two levels to project root
        exe_dir.join("../../config"),
    ];

    candidates
        .iter()
        .find(|dir| dir.join(config::CONFIG_FILE).exists())
        .cloned()
        .unwrap_or_else(|| PathBuf::from("config"))
}
