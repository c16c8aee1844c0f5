//! Configuration module for tubeqa.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, OpenAISettings,
    RetrievalSettings, ServerSettings, Settings, VectorStoreSettings, YoutubeSettings,
};
