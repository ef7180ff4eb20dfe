//! 面向用户的提示（toast）。

use serde::Serialize;

use crate::error::AppError;
use crate::tone::Tone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Info,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    pub fn invalid_file_type() -> Self {
        Self::destructive("Invalid file type", "Please upload an image file")
    }

    pub fn analysis_complete(tone: Tone) -> Self {
        Self::info(
            "Analysis Complete!",
            format!("Your {} tone has been detected", tone),
        )
    }

    pub fn analysis_failed() -> Self {
        Self::destructive("Analysis Failed", "Please try another image")
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}

impl From<&AppError> for Notice {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Image(e) if e.is_invalid_file_type() => Self::invalid_file_type(),
            AppError::Image(_) => Self::analysis_failed(),
            AppError::Color(e) => Self::destructive("Invalid color", e.to_string()),
            AppError::NoPhoto => Self::destructive("No photo", "Upload a photo first"),
            other => Self::destructive("Something went wrong", other.to_string()),
        }
    }
}
