//! # 物理笔记点评：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与运行时搭建。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use physics_note_check::analysis::{parse_analysis_response, AnalysisRequest, GenerationSettings};
use physics_note_check::error::AppError;
use physics_note_check::image_normalizer::{
    read_orientation_raw, ImageNormalizer, ImageSource, NormalizerConfig,
    NormalizerConfigOverrides,
};
use physics_note_check::intent::{build_prompt, IntentType};
use physics_note_check::submission::{normalize_all, ImageRole, UploadedImages};

#[derive(Parser)]
#[command(
    name = "physics-note-check",
    about = "Normalize handwritten physics notes and assemble review requests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct NormalizeArgs {
    /// Longest output side in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Decode timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON file with config overrides (camelCase keys)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a single image (file path or data URI)
    Normalize {
        /// Input image path, or a data URI
        input: String,

        /// Output JPEG path (default: print a data URI)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        args: NormalizeArgs,
    },

    /// Print the EXIF orientation code of an image
    Orientation {
        /// Input image path
        input: PathBuf,
    },

    /// Print the prompt for an intent
    Prompt {
        /// check_mistake, explain_solution, validate_approach, teach_method,
        /// continue_stuck, partial_credit_check
        intent: IntentType,

        /// Provided image roles: problem, solution, studentWork
        #[arg(long, value_delimiter = ',')]
        roles: Vec<ImageRole>,
    },

    /// Normalize a submission and print the request body as JSON
    Request {
        intent: IntentType,

        #[arg(long)]
        problem: Option<String>,

        #[arg(long)]
        solution: Option<String>,

        #[arg(long)]
        student_work: Option<String>,

        #[command(flatten)]
        args: NormalizeArgs,
    },

    /// Validate a raw model response against an intent
    CheckResponse {
        intent: IntentType,

        /// File holding the raw response text
        response: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("❌ 创建异步运行时失败: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(cli.command)) {
        log::error!("❌ {err}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Normalize {
            input,
            output,
            args,
        } => {
            let normalizer = ImageNormalizer::new(build_config(&args)?)?;
            let normalized = normalizer.normalize(read_source(&input)?).await?;

            match output {
                Some(path) => {
                    let (width, height) = (normalized.width(), normalized.height());
                    std::fs::write(&path, normalized.into_bytes())?;
                    log::info!("💾 已写入 {}（{}x{}）", path.display(), width, height);
                }
                None => println!("{}", normalized.to_data_uri()),
            }
        }
        Commands::Orientation { input } => {
            let normalizer = ImageNormalizer::new(NormalizerConfig::default())?;
            let encoded = normalizer.load(ImageSource::Bytes(std::fs::read(&input)?))?;
            let code = ImageNormalizer::orientation_of(&encoded);
            match read_orientation_raw(encoded.bytes()) {
                Some(raw) if u16::from(code.value()) != raw => {
                    println!("{} (raw tag value {} out of range)", code.value(), raw)
                }
                _ => println!("{}", code.value()),
            }
        }
        Commands::Prompt { intent, roles } => {
            println!("{}", build_prompt(intent, &roles));
        }
        Commands::Request {
            intent,
            problem,
            solution,
            student_work,
            args,
        } => {
            let normalizer = ImageNormalizer::new(build_config(&args)?)?;

            let mut uploads = UploadedImages::default();
            for (role, input) in [
                (ImageRole::Problem, problem),
                (ImageRole::Solution, solution),
                (ImageRole::StudentWork, student_work),
            ] {
                if let Some(input) = input {
                    uploads.set(role, read_data_uri(&input)?);
                }
            }

            let images = normalize_all(&normalizer, uploads).await?;
            let request = AnalysisRequest::build(intent, &images, GenerationSettings::default())?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Commands::CheckResponse { intent, response } => {
            let raw = std::fs::read_to_string(&response)?;
            let result = parse_analysis_response(&raw, intent)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn build_config(args: &NormalizeArgs) -> Result<NormalizerConfig, AppError> {
    let mut overrides = match &args.config {
        Some(path) => serde_json::from_str::<NormalizerConfigOverrides>(&std::fs::read_to_string(path)?)?,
        None => NormalizerConfigOverrides::default(),
    };

    if args.max_dimension.is_some() {
        overrides.max_dimension = args.max_dimension;
    }
    if args.quality.is_some() {
        overrides.jpeg_quality = args.quality;
    }
    if args.timeout_ms.is_some() {
        overrides.decode_timeout_ms = args.timeout_ms;
    }

    Ok(NormalizerConfig::default().with_overrides(&overrides)?)
}

fn read_source(input: &str) -> Result<ImageSource, AppError> {
    if input.starts_with("data:") {
        return Ok(ImageSource::Base64(input.to_string()));
    }
    Ok(ImageSource::Bytes(std::fs::read(Path::new(input))?))
}

/// 提交接口只接受 data URL；文件路径在这里转成 data URL。
fn read_data_uri(input: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};

    if input.starts_with("data:") {
        return Ok(input.to_string());
    }

    let bytes = std::fs::read(Path::new(input))?;
    let mime = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    Ok(format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes)))
}
