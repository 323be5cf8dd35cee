pub mod ai;
pub mod config;
pub mod consultation;
pub mod diseases;
pub mod error;
pub mod intent;
pub mod prompt;
pub mod provider;
pub mod responder;
pub mod session;
pub mod state;
pub mod vision;

// Re-export main types for convenience
pub use ai::{GeminiClient, OllamaClient, TextGenerator};
pub use config::Config;
pub use consultation::{Consultation, Dispatch, TurnOutcome, UPLOAD_PROMPT};
pub use diseases::{lookup, Diagnosis, DiseaseRecord, Lookup};
pub use error::{DoctorError, Result};
pub use intent::{classify_intent, Intent};
pub use prompt::PromptTemplate;
pub use provider::Provider;
pub use responder::{PendingReply, Responder};
pub use session::{ImagePolicy, Session};
pub use state::{ChatTurn, TurnRole};
pub use vision::{ImageClassifier, ModelWeights, UploadedImage, VitClassifier};
