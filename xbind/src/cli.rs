use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "xbind",
    about = "Decode, re-encode and bind XML documents through a typed binding.",
    version
)]
pub struct Cli {
    /// Log codec decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(visible_alias = "d", about = "Decode a document and print it as JSON")]
    Decode(DecodeArgs),

    #[command(visible_alias = "r", about = "Decode a document and encode it again")]
    Roundtrip(RoundtripArgs),

    #[command(
        visible_alias = "b",
        about = "Bind the value of one document onto another in place"
    )]
    Bind(BindArgs),
}

#[derive(Debug, clap::Args)]
pub struct BindingArgs {
    /// JSON binding description
    #[arg(short, long = "binding", value_name = "FILE")]
    pub path: PathBuf,

    /// Type of the document element (default: looked up by element name)
    #[arg(short, long, value_name = "TYPE")]
    pub root: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
\x1b[1m\x1b[4mExamples:\x1b[0m
  xbind decode -b shop.json order.xml
  xbind decode -b shop.json --root Line line.xml -o line.json")]
pub struct DecodeArgs {
    #[command(flatten)]
    pub binding: BindingArgs,

    /// Document to decode
    pub input: PathBuf,

    /// Write JSON here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct RoundtripArgs {
    #[command(flatten)]
    pub binding: BindingArgs,

    /// Document to decode
    pub input: PathBuf,

    /// Indent element-only content by this many spaces
    #[arg(long, value_name = "WIDTH")]
    pub indent: Option<usize>,

    /// Write XML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
The target document is updated with as few node changes as possible: elements \
whose tag still matches are reused, mismatched ones are replaced and missing \
ones appended.")]
pub struct BindArgs {
    #[command(flatten)]
    pub binding: BindingArgs,

    /// Document holding the value
    pub source: PathBuf,

    /// Document to update
    pub target: PathBuf,

    /// Write the updated document here instead of over the target
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
