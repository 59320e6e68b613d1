/// Stable identifier of a scene within one orchestration run.
pub type SceneId = String;

/// Identifier of a generative model / backend (e.g. `"kling"`).
pub type ModelId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
