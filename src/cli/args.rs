//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Lesson title, also used for the title card
    #[arg(short, long)]
    pub title: String,

    /// Source text file used for narration
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Screenshot image, repeatable; order is kept
    #[arg(long = "screenshot")]
    pub screenshots: Vec<PathBuf>,

    /// Directory of screenshots, read in file-name order
    #[arg(long)]
    pub screenshot_dir: Option<PathBuf>,

    /// Prompt for a remotely generated image, repeatable
    #[arg(long = "image-prompt")]
    pub image_prompts: Vec<String>,

    /// Prompt for a remotely generated video, repeatable
    #[arg(long = "video-prompt")]
    pub video_prompts: Vec<String>,

    /// Prerecorded narration audio
    #[arg(short, long)]
    pub audio: Option<PathBuf>,

    /// Output file path (default: <media_dir>/video_<slug>_<request>.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Remote generation service base URL; enables remote assets
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Narration mode (verbatim, chat)
    #[arg(long)]
    pub narration: Option<String>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Narration duration in seconds
    #[arg(short, long)]
    pub duration: f64,

    /// Lesson title
    #[arg(short, long, default_value = "Lesson")]
    pub title: String,

    /// Candidate asset as KIND=VALUE (slide, screenshot, remote_image, remote_video), repeatable
    #[arg(short, long = "candidate")]
    pub candidates: Vec<String>,
}

/// Arguments for the slide command
#[derive(Args, Debug)]
pub struct SlideArgs {
    /// Slide text
    #[arg(short, long)]
    pub text: String,

    /// Output PNG path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Height in pixels
    #[arg(long)]
    pub height: Option<u32>,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Rendered video file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Expected duration in seconds (usually the narration length)
    #[arg(short, long)]
    pub expected: f64,

    /// Allowed difference in seconds
    #[arg(long, default_value_t = 1.0 / 24.0)]
    pub tolerance: f64,
}
