use log::debug;
use serde_json::Value;

/// Chaves que identificam o modelo nos metadados do host.
pub const MODEL_KEYS: &[&str] = &["model", "model_name", "ckpt_name"];
pub const SEED_KEYS: &[&str] = &["seed"];

/// Valor usado quando a chave não aparece em nenhuma das fontes.
pub const UNKNOWN: &str = "unknown";

/// Metadados normalizados de uma execução de salvamento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub model: String,
    pub seed: String,
    pub counter: u64,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self {
            model: UNKNOWN.to_string(),
            seed: UNKNOWN.to_string(),
            counter: 0,
        }
    }
}

/// Colapsa qualquer sequência de espaços (incluindo tabs e quebras de linha)
/// em um único espaço e remove as pontas.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Busca em profundidade pelo primeiro valor cuja chave está em `keys`.
///
/// A ordem é a de iteração dos mapas: a chave de cada entrada é testada
/// antes de descer no valor dessa mesma entrada, e só depois a próxima
/// entrada é visitada. Um valor `null` encontrado conta como ausente.
pub fn extract_value<'a>(data: Option<&'a Value>, keys: &[&str]) -> Option<&'a Value> {
    data.and_then(|d| find_first(d, keys))
        .filter(|v| !v.is_null())
}

fn find_first<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    match data {
        Value::Object(map) => {
            for (key, value) in map {
                if keys.contains(&key.as_str()) {
                    return Some(value);
                }
                if let Some(found) = find_first(value, keys) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_first(item, keys)),
        _ => None,
    }
}

/// Texto do valor como o host o mostraria: strings sem aspas, booleanos
/// `True`/`False`, listas e mapas no formato `['a', 1]` / `{'k': 'v'}`.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.contains('\'') && !s.contains('"') => {
            format!("\"{}\"", s.replace('\\', "\\\\"))
        }
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", repr(&Value::String(k.clone())), repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn lookup(extra: Option<&Value>, prompt: Option<&Value>, keys: &[&str]) -> String {
    extract_value(extra, keys)
        .or_else(|| extract_value(prompt, keys))
        .map(|v| normalize_text(&value_to_string(v)))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Monta os metadados consultando `extra` primeiro e `prompt` depois.
/// O contador fica em zero; quem salva é quem define o valor.
pub fn extract_metadata(extra: Option<&Value>, prompt: Option<&Value>) -> RunMetadata {
    let meta = RunMetadata {
        model: lookup(extra, prompt, MODEL_KEYS),
        seed: lookup(extra, prompt, SEED_KEYS),
        counter: 0,
    };
    debug!("Metadados extraídos: model={} seed={}", meta.model, meta.seed);
    meta
}
