use anyhow::Result;
use std::path::Path;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::asr::AsrEngine;

pub struct WhisperAsr {
    whisper_ctx: WhisperContext,
}

impl WhisperAsr {
    pub fn new(model_path: String) -> Result<Self> {
        match WhisperContext::new_with_params(&model_path, WhisperContextParameters::default()) {
            Ok(whisper_ctx) => Ok(Self { whisper_ctx }),
            Err(e) => Err(anyhow::anyhow!("failed to open whisper model: {}", e)),
        }
    }

    fn build_params(&self) -> FullParams {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_language(Some("auto"));
        params.set_temperature(0.0);
        params.set_n_threads(4);
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_suppress_blank(true);
        params.set_suppress_non_speech_tokens(true);

        params
    }
}

#[async_trait::async_trait]
impl AsrEngine for WhisperAsr {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let samples = crate::audio::parse_audio_file(audio)?;

        let mut state = self.whisper_ctx.create_state()?;
        let params = self.build_params();
        state.full(params, &samples)?;

        let num_segments = state.full_n_segments()?;
        let mut full_text = String::new();
        for i in 0..num_segments {
            full_text.push_str(&state.full_get_segment_text(i)?);
        }

        Ok(full_text.trim().to_string())
    }
}
