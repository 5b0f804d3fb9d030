//! Generation request types shared by both call paths.
//!
//! The same [`GenerationRequest`] serializes to a JSON body for the HTTP
//! path (`json_body`) or flattens to multipart form fields
//! (`form_fields`), and travels as-is through the in-process path.

use serde::Serialize;

/// A weighted text prompt. Negative weights suppress content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPrompt {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl TextPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: None,
        }
    }

    pub fn weighted(text: impl Into<String>, weight: f32) -> Self {
        Self {
            text: text.into(),
            weight: Some(weight),
        }
    }
}

/// Diffusion samplers the service accepts, keyed by their config names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sampler {
    Ddim,
    Plms,
    KEuler,
    KEulerAncestral,
    KHeun,
    KDpm2,
    KDpm2Ancestral,
    KLms,
    DpmFast,
    DpmAdaptive,
    Dpmspp1,
    Dpmspp2,
    Dpmspp3,
    Dpmspp2sAncestral,
    DpmsppSde,
    Dpmspp2m,
}

impl Sampler {
    /// Total mapping from engine-config names; unknown names are `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let sampler = match name {
            "ddim" => Self::Ddim,
            "plms" => Self::Plms,
            "k_euler" => Self::KEuler,
            "k_euler_ancestral" => Self::KEulerAncestral,
            "k_heun" => Self::KHeun,
            "k_dpm_2" => Self::KDpm2,
            "k_dpm_2_ancestral" => Self::KDpm2Ancestral,
            "k_lms" => Self::KLms,
            "dpm_fast" => Self::DpmFast,
            "dpm_adaptive" => Self::DpmAdaptive,
            "dpmspp_1" => Self::Dpmspp1,
            "dpmspp_2" => Self::Dpmspp2,
            "dpmspp_3" => Self::Dpmspp3,
            "dpmspp_2s_ancestral" => Self::Dpmspp2sAncestral,
            "dpmspp_sde" => Self::DpmsppSde,
            "dpmspp_2m" => Self::Dpmspp2m,
            _ => return None,
        };
        Some(sampler)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ddim => "ddim",
            Self::Plms => "plms",
            Self::KEuler => "k_euler",
            Self::KEulerAncestral => "k_euler_ancestral",
            Self::KHeun => "k_heun",
            Self::KDpm2 => "k_dpm_2",
            Self::KDpm2Ancestral => "k_dpm_2_ancestral",
            Self::KLms => "k_lms",
            Self::DpmFast => "dpm_fast",
            Self::DpmAdaptive => "dpm_adaptive",
            Self::Dpmspp1 => "dpmspp_1",
            Self::Dpmspp2 => "dpmspp_2",
            Self::Dpmspp3 => "dpmspp_3",
            Self::Dpmspp2sAncestral => "dpmspp_2s_ancestral",
            Self::DpmsppSde => "dpmspp_sde",
            Self::Dpmspp2m => "dpmspp_2m",
        }
    }
}

/// Where a masking request takes its mask from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSource {
    InitImageAlpha,
    MaskImageWhite,
    MaskImageBlack,
}

impl MaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitImageAlpha => "INIT_IMAGE_ALPHA",
            Self::MaskImageWhite => "MASK_IMAGE_WHITE",
            Self::MaskImageBlack => "MASK_IMAGE_BLACK",
        }
    }
}

/// A structured generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub engine_id: String,
    pub text_prompts: Vec<TextPrompt>,
    pub seed: u32,
    pub steps: Option<u32>,
    pub sampler: Option<Sampler>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Encoded init image for image-to-image calls.
    pub init_image: Option<Vec<u8>>,
    pub image_strength: Option<f32>,
    pub mask_source: Option<MaskSource>,
}

impl GenerationRequest {
    pub fn new(engine_id: impl Into<String>) -> Self {
        Self {
            engine_id: engine_id.into(),
            text_prompts: Vec::new(),
            seed: 0,
            steps: None,
            sampler: None,
            width: None,
            height: None,
            init_image: None,
            image_strength: None,
            mask_source: None,
        }
    }

    pub fn with_prompt(mut self, prompt: TextPrompt) -> Self {
        self.text_prompts.push(prompt);
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_init_image(mut self, bytes: Vec<u8>) -> Self {
        self.init_image = Some(bytes);
        self
    }

    pub fn with_image_strength(mut self, strength: f32) -> Self {
        self.image_strength = Some(strength);
        self
    }

    pub fn with_mask_source(mut self, source: MaskSource) -> Self {
        self.mask_source = Some(source);
        self
    }

    /// JSON body for text-to-image calls. The engine id travels in the
    /// URL, not the body; image attachments travel as multipart parts.
    pub fn json_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(
            "text_prompts".to_string(),
            serde_json::json!(self.text_prompts),
        );
        body.insert("seed".to_string(), serde_json::json!(self.seed));
        if let Some(steps) = self.steps {
            body.insert("steps".to_string(), serde_json::json!(steps));
        }
        if let Some(sampler) = self.sampler {
            body.insert("sampler".to_string(), serde_json::json!(sampler.name()));
        }
        if let Some(width) = self.width {
            body.insert("width".to_string(), serde_json::json!(width));
        }
        if let Some(height) = self.height {
            body.insert("height".to_string(), serde_json::json!(height));
        }
        serde_json::Value::Object(body)
    }

    /// Flatten to multipart form fields, prompts indexed the way the
    /// service expects: `text_prompts[i][text]` / `text_prompts[i][weight]`.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        for (i, prompt) in self.text_prompts.iter().enumerate() {
            fields.push((format!("text_prompts[{i}][text]"), prompt.text.clone()));
            if let Some(weight) = prompt.weight {
                fields.push((format!("text_prompts[{i}][weight]"), weight.to_string()));
            }
        }
        fields.push(("seed".to_string(), self.seed.to_string()));
        if let Some(sampler) = self.sampler {
            fields.push(("sampler".to_string(), sampler.name().to_string()));
        }
        if let Some(strength) = self.image_strength {
            fields.push(("image_strength".to_string(), strength.to_string()));
        }
        if let Some(source) = self.mask_source {
            fields.push(("mask_source".to_string(), source.as_str().to_string()));
        }
        if let Some(width) = self.width {
            fields.push(("width".to_string(), width.to_string()));
        }
        if let Some(height) = self.height {
            fields.push(("height".to_string(), height.to_string()));
        }
        fields
    }
}

/// Derive a deterministic 32-bit seed from a string label.
pub fn seed_from_str(label: &str) -> u32 {
    let hash = blake3::hash(label.as_bytes());
    let bytes: [u8; 4] = hash.as_bytes()[0..4]
        .try_into()
        .unwrap_or([0, 0, 0, 0]);
    u32::from_le_bytes(bytes)
}
