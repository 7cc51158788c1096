use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use wavelet_stego::config::DEFAULT_WINDOW;
use wavelet_stego::{
    capacity, default_candidates, embed, extract, extract_any, max_payload_len, media, psnr,
    spatial_capacity, EmbeddingConfig, Result, SelectionStrategy,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hides a message or file in a grayscale image
    Embed(EmbedArgs),
    /// Recovers hidden data from a stego image
    Extract(ExtractArgs),
    /// Prints how many bytes a cover can carry
    Capacity(CapacityArgs),
    /// Compares two images
    Psnr(PsnrArgs),
    /// Writes a synthetic cover image
    Generate(GenerateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyKind {
    Fixed,
    Chaotic,
    Robustness,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON configuration file; overrides the strategy flags
    #[arg(short, long, value_name = "config file")]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = StrategyKind::Fixed)]
    strategy: StrategyKind,

    /// Logistic-map seed, strictly between 0 and 1
    #[arg(long)]
    seed: Option<f64>,

    /// Logistic-map control parameter, in (3.57, 4]
    #[arg(long)]
    mu: Option<f64>,

    /// Candidate window of the robustness strategy
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,
}

impl ConfigArgs {
    fn load(&self) -> Result<EmbeddingConfig> {
        if let Some(path) = &self.config {
            return EmbeddingConfig::from_json(&fs::read_to_string(path)?);
        }
        let strategy = match self.strategy {
            StrategyKind::Fixed => SelectionStrategy::Fixed,
            StrategyKind::Chaotic => {
                SelectionStrategy::chaotic(self.seed.unwrap_or(0.5), self.mu.unwrap_or(3.99))
            }
            StrategyKind::Robustness => SelectionStrategy::robustness(
                self.seed.unwrap_or(0.618),
                self.mu.unwrap_or(3.95),
                self.window,
            ),
        };
        let config = EmbeddingConfig::new(strategy);
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct EmbedArgs {
    /// Cover image, used read-only
    #[arg(short = 'i', long = "in", value_name = "cover image")]
    cover: PathBuf,

    /// Stego image to write; use a lossless format
    #[arg(short = 'o', long = "out", value_name = "output image")]
    output: PathBuf,

    /// File whose bytes are hidden
    #[arg(short, long, value_name = "data file", required_unless_present = "message")]
    data: Option<PathBuf>,

    /// Text message to hide
    #[arg(short, long, value_name = "text message", conflicts_with = "data")]
    message: Option<String>,

    /// Also write the configuration as JSON, for the receiver
    #[arg(long, value_name = "config file")]
    save_config: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Stego image
    #[arg(short = 'i', long = "in", value_name = "stego image")]
    stego: PathBuf,

    /// Where to write the payload; stdout when omitted
    #[arg(short = 'o', long = "out", value_name = "output file")]
    output: Option<PathBuf>,

    /// Try every built-in strategy with default parameters
    #[arg(long)]
    auto: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct CapacityArgs {
    /// Cover image
    #[arg(short = 'i', long = "in", value_name = "cover image")]
    cover: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct PsnrArgs {
    original: PathBuf,
    modified: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Pattern {
    Checkerboard,
    Speckled,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(short = 'o', long = "out", value_name = "output image")]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Pattern::Checkerboard)]
    pattern: Pattern,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Noise seed of the speckled pattern
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    match CliArgs::parse().command {
        Commands::Embed(args) => {
            let config = args.config.load()?;
            let payload = match (&args.data, &args.message) {
                (Some(path), _) => fs::read(path)?,
                (None, Some(message)) => message.clone().into_bytes(),
                (None, None) => Vec::new(),
            };
            let cover = media::load_grayscale(&args.cover)?;
            let stego = embed(&cover, &payload, &config)?;
            media::save_image(&stego, &args.output)?;
            if let Some(path) = &args.save_config {
                fs::write(path, config.to_json()?)?;
            }
            println!(
                "hid {} bytes, PSNR {:.2} dB",
                payload.len(),
                psnr(&cover, &stego)?
            );
        }
        Commands::Extract(args) => {
            let stego = media::load_grayscale(&args.stego)?;
            let payload = if args.auto {
                let candidates = default_candidates();
                let (index, payload) = extract_any(&stego, &candidates)?;
                info!("decoded with {} selection", candidates[index].strategy().name());
                payload
            } else {
                extract(&stego, &args.config.load()?)?
            };
            match &args.output {
                Some(path) => fs::write(path, &payload)?,
                None => std::io::stdout().write_all(&payload)?,
            }
        }
        Commands::Capacity(args) => {
            let config = args.config.load()?;
            let cover = media::load_grayscale(&args.cover)?;
            let (width, height) = cover.dimensions();
            println!("{}x{} {} selection", width, height, config.strategy().name());
            println!("framed capacity: {} bytes", capacity(width, height, &config)?);
            println!("max payload:     {} bytes", max_payload_len(width, height, &config)?);
            println!("spatial LSB:     {} bytes", spatial_capacity(width, height));
        }
        Commands::Psnr(args) => {
            let original = media::load_grayscale(&args.original)?;
            let modified = media::load_grayscale(&args.modified)?;
            println!("{:.4} dB", psnr(&original, &modified)?);
        }
        Commands::Generate(args) => {
            let image = match args.pattern {
                Pattern::Checkerboard => media::checkerboard_gradient(args.width, args.height),
                Pattern::Speckled => media::speckled_disc(args.width, args.height, args.seed),
            };
            media::save_image(&image, &args.output)?;
        }
    }

    Ok(())
}
