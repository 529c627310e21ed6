pub mod recovery;
pub mod unit_ctx;
pub mod upload_flow;

pub use recovery::{AutoRecovery, PromptRecovery, RecoveryDecision, RecoveryPolicy};
pub use unit_ctx::UnitCtx;
pub use upload_flow::{FlowResult, UploadFlow};
