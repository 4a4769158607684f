//! Model loading and management
//!
//! Resolves checkpoints from the HuggingFace Hub or a local directory and picks
//! the compute device.

use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Device};
use hf_hub::{api::sync::Api, api::sync::ApiRepo, Repo, RepoType};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::info;

/// Configuration for model loading
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// HuggingFace model ID or local directory
    pub model_id: String,
    /// Model revision/branch
    pub revision: String,
    /// Where to take `tokenizer.json` from when the model repo has none
    pub tokenizer_id: Option<String>,
    /// Data type for model weights; `None` picks one for the device
    pub dtype: Option<DType>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::smollm_135m()
    }
}

impl ModelConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            revision: "main".to_string(),
            tokenizer_id: None,
            dtype: None,
        }
    }

    pub fn bert_base_uncased() -> Self {
        Self::new("google-bert/bert-base-uncased")
    }

    pub fn smollm_135m() -> Self {
        Self::new("HuggingFaceTB/SmolLM2-135M")
    }

    pub fn mamba_130m() -> Self {
        Self {
            revision: "refs/pr/1".to_string(),
            tokenizer_id: Some("EleutherAI/gpt-neox-20b".to_string()),
            dtype: Some(DType::F32),
            ..Self::new("state-spaces/mamba-130m")
        }
    }

    /// The configured dtype, or [`preferred_dtype`] for `device`.
    pub fn dtype_for(&self, device: &Device) -> DType {
        self.dtype.unwrap_or_else(|| preferred_dtype(device))
    }
}

/// A place model files can be fetched from
pub enum ModelFiles {
    Hub(ApiRepo),
    Local(PathBuf),
}

impl ModelFiles {
    /// An existing directory is used as-is; anything else is a Hub repo id.
    pub fn open(id: &str, revision: &str) -> Result<Self> {
        let path = Path::new(id);
        if path.is_dir() {
            info!("Using local checkpoint at {}", path.display());
            return Ok(ModelFiles::Local(path.to_path_buf()));
        }
        let api = Api::new()?;
        Ok(ModelFiles::Hub(api.repo(Repo::with_revision(
            id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ))))
    }

    pub fn get(&self, name: &str) -> Result<PathBuf> {
        match self {
            ModelFiles::Hub(repo) => Ok(repo.get(name)?),
            ModelFiles::Local(dir) => {
                let path = dir.join(name);
                if !path.is_file() {
                    bail!("{} not found in {}", name, dir.display());
                }
                Ok(path)
            }
        }
    }

    pub fn config<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let config_file = self.get("config.json")?;
        Ok(serde_json::from_slice(&std::fs::read(&config_file)?)?)
    }

    /// Load safetensors files (handles both single and sharded models)
    pub fn safetensors(&self) -> Result<Vec<PathBuf>> {
        if let Ok(single) = self.get("model.safetensors") {
            return Ok(vec![single]);
        }

        let json_file = self.get("model.safetensors.index.json")?;
        let json: serde_json::Value = serde_json::from_reader(&std::fs::File::open(&json_file)?)?;
        let weight_map = match json.get("weight_map") {
            Some(serde_json::Value::Object(map)) => map,
            _ => bail!("no weight map in {:?}", json_file),
        };

        let mut safetensors_files = HashSet::new();
        for value in weight_map.values() {
            if let Some(file) = value.as_str() {
                safetensors_files.insert(file.to_string());
            }
        }

        safetensors_files.iter().map(|v| self.get(v)).collect()
    }
}

/// Load `tokenizer.json` from the tokenizer repo if one is configured,
/// otherwise from the model itself.
pub fn load_tokenizer(config: &ModelConfig, model_files: &ModelFiles) -> Result<Tokenizer> {
    info!("Loading tokenizer...");
    let tokenizer_file = match &config.tokenizer_id {
        Some(id) => ModelFiles::open(id, "main")?.get("tokenizer.json")?,
        None => model_files.get("tokenizer.json")?,
    };
    Tokenizer::from_file(&tokenizer_file).map_err(|e| anyhow!("Failed to load tokenizer: {}", e))
}

/// CUDA or Metal when compiled in and present, CPU otherwise.
pub fn select_device(cpu: bool) -> Result<Device> {
    if cpu {
        return Ok(Device::Cpu);
    }
    if candle_core::utils::cuda_is_available() {
        return Ok(Device::new_cuda(0)?);
    }
    if candle_core::utils::metal_is_available() {
        return Ok(Device::new_metal(0)?);
    }
    Ok(Device::Cpu)
}

/// F16 on accelerators, F32 on CPU.
pub fn preferred_dtype(device: &Device) -> DType {
    if device.is_cpu() {
        DType::F32
    } else {
        DType::F16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_choose_dtype() {
        assert_eq!(ModelConfig::smollm_135m().dtype, None);
        assert_eq!(ModelConfig::bert_base_uncased().dtype_for(&Device::Cpu), DType::F32);
        assert_eq!(ModelConfig::mamba_130m().dtype, Some(DType::F32));
        assert_eq!(ModelConfig::mamba_130m().dtype_for(&Device::Cpu), DType::F32);
    }

    #[test]
    fn test_explicit_dtype_wins() {
        let config = ModelConfig {
            dtype: Some(DType::BF16),
            ..ModelConfig::default()
        };
        assert_eq!(config.dtype_for(&Device::Cpu), DType::BF16);
    }

    #[test]
    fn test_local_directory_files() {
        let dir = std::env::temp_dir().join(format!("parrot-model-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("model.safetensors"), b"").unwrap();

        let files = ModelFiles::open(dir.to_str().unwrap(), "main").unwrap();
        assert!(matches!(files, ModelFiles::Local(_)));
        assert_eq!(files.safetensors().unwrap(), vec![dir.join("model.safetensors")]);
        assert!(files.get("config.json").is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
