use rand::Rng;
use serde::Serialize;

pub const MIN_SEED: i64 = 1;
pub const MAX_SEED: i64 = 2_147_483_647;

/// Configured seed, before a concrete value is drawn for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSetting {
    Random,
    Fixed(i64),
}

impl SeedSetting {
    /// Absent, blank, `random`/`随机` or unparsable values all mean random.
    pub fn from_config(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") => return SeedSetting::Random,
            Some(s) => s,
        };

        if raw.eq_ignore_ascii_case("random") || raw == "随机" {
            return SeedSetting::Random;
        }

        match raw.parse::<i64>() {
            Ok(seed) => SeedSetting::Fixed(seed),
            Err(_) => {
                log::warn!("Unparsable seed {:?} in config, using a random seed", raw);
                SeedSetting::Random
            }
        }
    }

    pub fn resolve(&self) -> i64 {
        match self {
            SeedSetting::Fixed(seed) => *seed,
            SeedSetting::Random => random_seed(),
        }
    }
}

pub fn random_seed() -> i64 {
    rand::rng().random_range(MIN_SEED..=MAX_SEED)
}

/// Body of `POST v1/images/generations`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub seed: i64,
    pub size: String,
    pub num_inference_steps: String,
}

/// A finished generation, with what the chat reply needs to describe it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: String,
    pub seed: i64,
    pub size: String,
    pub task_id: String,
}
