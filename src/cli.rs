use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "actstruct",
    version,
    about = "Section structure and citation extraction for converted legislation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Batch(BatchArgs),
    Inspect(InspectArgs),
    Validate(ValidateArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DepthRuleMode {
    Weighted,
    Flat,
}

impl DepthRuleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Flat => "flat",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractionOptions {
    /// Characters that disqualify a bold run from being a heading when it ends with one.
    #[arg(long, default_value = ".,;:!?")]
    pub terminal_punctuation: String,

    #[arg(long, value_enum, default_value_t = DepthRuleMode::Weighted)]
    pub depth_rule: DepthRuleMode,

    #[arg(long, default_value = "https://classic.austlii.edu.au")]
    pub citation_base_url: String,

    #[arg(long, default_value = "cth")]
    pub default_jurisdiction: String,

    /// Base URL of the act being extracted; enables bare `section 6-5` references.
    #[arg(long)]
    pub act_url: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub records: Option<PathBuf>,

    #[arg(long)]
    pub image_map: Option<PathBuf>,

    #[arg(long)]
    pub doc_id: Option<String>,

    #[command(flatten)]
    pub options: ExtractionOptions,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub config: PathBuf,

    #[arg(long, default_value = "out")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub options: ExtractionOptions,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub options: ExtractionOptions,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Citation URLs must start with this prefix.
    #[arg(long, default_value = "http")]
    pub url_prefix: String,
}
