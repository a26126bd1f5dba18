use std::fmt;

#[derive(Debug)]
pub enum SaveError {
    /// Quantidade de valores não bate com altura × largura × canais.
    TensorShape {
        expected: usize,
        actual: usize,
    },
    UnsupportedChannels(usize),
    UnsupportedFormat(String),
    CreateDir(String),
    EncodingFailed(String),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TensorShape { expected, actual } => write!(
                f,
                "Tensor de imagem inválido: esperados {expected} valores, recebidos {actual}"
            ),
            Self::UnsupportedChannels(channels) => {
                write!(f, "Número de canais não suportado: {channels} (use 1, 3 ou 4)")
            }
            Self::UnsupportedFormat(ext) => write!(f, "Formato de saída não suportado: {ext}"),
            Self::CreateDir(path) => write!(f, "Não foi possível criar diretório: {path}"),
            Self::EncodingFailed(msg) => write!(f, "Falha ao gravar imagem: {msg}"),
        }
    }
}

impl std::error::Error for SaveError {}
