use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use log::warn;
use std::collections::HashMap;
use std::fmt::Write;
use std::time::{Duration, Instant};

use crate::metadata::{normalize_text, RunMetadata};

/// Formato padrão de `%time` e fallback para formatos inválidos.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d-%H%M%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const TIMESTAMP_CACHE_TTL: Duration = Duration::from_secs(1);

/// Formata `now` com `fmt`. Diretivas que o chrono não reconhece fazem
/// cair no [`DEFAULT_TIME_FORMAT`] em vez de falhar.
pub fn format_timestamp(now: &DateTime<Local>, fmt: &str) -> String {
    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if !items.iter().any(|item| matches!(item, Item::Error)) {
        let mut out = String::new();
        if write!(out, "{}", now.format_with_items(items.iter())).is_ok() {
            return out;
        }
    }
    warn!("Formato de hora inválido \"{fmt}\", usando {DEFAULT_TIME_FORMAT}");
    now.format(DEFAULT_TIME_FORMAT).to_string()
}

/// Substitui os tokens `%date`, `%time`, `%model`, `%seed` e `%counter`.
///
/// Guarda o último timestamp de cada formato por até um segundo, para que
/// `%date` e `%time` da mesma chamada não formatem o relógio de novo.
#[derive(Debug, Default)]
pub struct TemplateFormatter {
    cache: HashMap<String, (String, Instant)>,
}

impl TemplateFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(&mut self, fmt: &str) -> String {
        let now = Instant::now();
        if let Some((value, at)) = self.cache.get(fmt) {
            if now.duration_since(*at) < TIMESTAMP_CACHE_TTL {
                return value.clone();
            }
        }

        let formatted = format_timestamp(&Local::now(), fmt);
        self.cache.insert(fmt.to_string(), (formatted.clone(), now));
        formatted
    }

    /// Template vazio vira o timestamp atual em `time_format`.
    /// Substituições são literais e aplicadas na ordem fixa dos tokens;
    /// qualquer outro `%` passa sem alteração.
    pub fn format(&mut self, template: &str, meta: &RunMetadata, time_format: &str) -> String {
        if template.is_empty() {
            return self.timestamp(time_format);
        }

        let replacements = [
            ("%date", self.timestamp(DATE_FORMAT)),
            ("%time", self.timestamp(time_format)),
            ("%model", normalize_text(&meta.model)),
            ("%seed", normalize_text(&meta.seed)),
            ("%counter", meta.counter.to_string()),
        ];

        replacements
            .iter()
            .fold(template.to_string(), |acc, (token, value)| {
                acc.replace(*token, value)
            })
    }
}
