//! # ShadeStyle — 命令行入口
//!
//! 以无界面方式驱动一次编辑会话：上传照片 → 色调分析 → （可选）人体分割 → 叠色预览。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use shade_style::error::AppError;
use shade_style::photo::{ImageError, PhotoSource, PreviewProfile};
use shade_style::settings::StudioConfig;
use shade_style::studio::{DetectOutcome, Notice, StudioSession};

#[derive(Parser)]
#[command(name = "shade-style")]
#[command(version, about = "Detect a photo's color tone and preview color overlays", long_about = None)]
struct Cli {
    /// Photo to analyze
    #[arg(value_name = "PHOTO")]
    photo: PathBuf,

    /// Overlay color (#RGB or #RRGGBB)
    #[arg(short, long, value_name = "HEX")]
    color: Option<String>,

    /// Overlay opacity, 0-100
    #[arg(long, value_name = "N")]
    opacity: Option<i64>,

    /// Where the overlay is applied
    #[arg(short, long, value_enum, default_value_t = MaskArg::Auto)]
    mask: MaskArg,

    /// Working resolution: quality, balanced or speed
    #[arg(long, value_name = "PROFILE")]
    profile: Option<String>,

    /// JSON config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the composited preview to this PNG file
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MaskArg {
    /// Body mask from person segmentation
    Auto,
    /// Skip segmentation; preview shows the original photo
    #[value(name = "none")]
    Off,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let notice = Notice::from(&err);
            log::error!("❌ {}", err);
            eprintln!("{}: {}", notice.title, notice.description);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = match &cli.config {
        Some(path) => StudioConfig::load_from_path(path)?,
        None => StudioConfig::default(),
    };
    let session = StudioSession::with_segformer(config)?;
    if let Some(profile) = &cli.profile {
        session.set_preview_profile(PreviewProfile::parse(profile)?)?;
    }

    let summary = session.upload(PhotoSource::FilePath(cli.photo.clone()))?;
    println!("{}: {}", summary.notice.title, summary.notice.description);
    println!(
        "Photo: {}x{} | Tone: {}",
        summary.width,
        summary.height,
        summary.tone.label()
    );
    println!("Recommended colors:");
    for shade in summary.palette {
        println!("  {:<14} {}", shade.name, shade.hex);
    }

    if cli.mask == MaskArg::Auto {
        match session.detect_body_mask().await? {
            DetectOutcome::Detected { coverage } => {
                println!("Body mask: {} pixels", coverage);
            }
            DetectOutcome::NotFound => println!("Body mask: no person detected"),
            DetectOutcome::Superseded => {}
        }
    }

    if let Some(color) = &cli.color {
        let color = session.select_color(color)?;
        println!("Overlay color: {}", color);
    }
    if let Some(opacity) = cli.opacity {
        let opacity = session.set_opacity(opacity)?;
        println!("Overlay opacity: {}%", opacity);
    }

    if let Some(out) = &cli.out {
        let preview = session.render()?;
        preview.save(out).map_err(|e| {
            ImageError::FileSystem(format!("无法写入预览图 {}: {}", out.display(), e))
        })?;
        log::info!("💾 预览图已写入: {}", out.display());
        println!("Preview written to {}", out.display());
    }

    Ok(())
}
