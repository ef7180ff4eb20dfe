//! 编辑会话与用户提示。

mod notice;
mod session;

pub use notice::{Notice, NoticeVariant};
pub use session::{DetectOutcome, MaskMode, SessionSnapshot, StudioSession, UploadSummary};
