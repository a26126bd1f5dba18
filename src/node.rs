//! Registro do nó no host e envelope de resposta para a UI.

use serde::Serialize;

use crate::saver::OutputDescriptor;

pub const NODE_NAME: &str = "Batch Image Save";
pub const CATEGORY: &str = "ImageSaverTools";
pub const FUNCTION: &str = "save_images";
pub const EXTENSIONS: &[&str] = &["png", "jpeg", "webp"];

#[derive(Debug, Clone, Serialize)]
pub struct InputSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<&'static [&'static str]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDefinition {
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub function: &'static str,
    pub output_node: bool,
    pub return_types: Vec<&'static str>,
    pub required: Vec<InputSpec>,
    pub hidden: Vec<InputSpec>,
}

fn input(name: &'static str, kind: &'static str, default: Option<&'static str>) -> InputSpec {
    InputSpec {
        name,
        kind,
        default,
        choices: None,
    }
}

pub fn node_definition() -> NodeDefinition {
    NodeDefinition {
        name: NODE_NAME,
        display_name: NODE_NAME,
        category: CATEGORY,
        function: FUNCTION,
        output_node: true,
        return_types: Vec::new(),
        required: vec![
            input("images", "IMAGE", None),
            input("filename", "STRING", Some("%time_%seed")),
            input("path", "STRING", Some("")),
            InputSpec {
                choices: Some(EXTENSIONS),
                ..input("extension", "CHOICE", None)
            },
        ],
        hidden: vec![
            input("prompt", "PROMPT", None),
            input("extra_pnginfo", "EXTRA_PNGINFO", None),
        ],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UiImages {
    pub images: Vec<OutputDescriptor>,
}

/// `{"ui": {"images": [...]}}`
#[derive(Debug, Clone, Serialize)]
pub struct UiResponse {
    pub ui: UiImages,
}

impl UiResponse {
    pub fn new(images: Vec<OutputDescriptor>) -> Self {
        Self {
            ui: UiImages { images },
        }
    }
}
