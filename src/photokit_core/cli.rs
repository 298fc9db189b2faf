use crate::photokit_core::profile::BuiltinProfile;
use clap::{Parser, Subcommand};
use simplelog::LevelFilter;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect EXIF, convert HEIC to JPEG, sort photos by date")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable file logging to photokit.log
    #[arg(long = "log", global = true)]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug, global = true)]
    pub log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every metadata field of one image
    Exif {
        /// Image to inspect (prompted for if omitted)
        file_path: Option<PathBuf>,
    },

    /// Convert HEIC images to JPEG, keeping a fixed set of EXIF tags.
    ///
    /// Walks INPUT recursively and converts every .heic file. With --output,
    /// the directory structure under INPUT is mirrored there; otherwise each
    /// JPEG is written next to its source. Without INPUT, the input directory,
    /// output directory and quality are prompted for.
    Heic2jpg {
        /// Directory containing HEIC files, or a single file with --single
        input: Option<PathBuf>,

        /// Output directory (defaults to alongside each source)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// JPEG quality (1-100)
        #[arg(long, short, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,

        /// Built-in tag allow-list to copy
        #[arg(long, value_enum, default_value_t = BuiltinProfile::Xiaomi)]
        profile: BuiltinProfile,

        /// TOML file with a custom tag allow-list (overrides --profile)
        #[arg(long)]
        profile_file: Option<PathBuf>,

        /// Convert a single file instead of a directory tree
        #[arg(long)]
        single: bool,
    },

    /// Move photos into <year>/<year>_<month> folders by capture date
    Organize {
        /// Folder whose photos should be sorted (prompted for if omitted)
        source_folder: Option<PathBuf>,

        /// Show what would be moved without making changes
        #[arg(long)]
        dry_run: bool,
    },
}

/// Ask a question on stdout and read one trimmed line from `input`.
pub fn prompt_line<R: BufRead>(input: &mut R, question: &str) -> io::Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Ask for a path; an empty answer yields `None`.
pub fn prompt_path<R: BufRead>(input: &mut R, question: &str) -> io::Result<Option<PathBuf>> {
    let answer = prompt_line(input, question)?;
    Ok((!answer.is_empty()).then(|| PathBuf::from(answer)))
}

/// Ask for a JPEG quality; an empty answer yields `default`.
pub fn prompt_quality<R: BufRead>(input: &mut R, question: &str, default: u8) -> io::Result<u8> {
    let answer = prompt_line(input, question)?;
    if answer.is_empty() {
        return Ok(default);
    }
    answer.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a number between 1 and 100", answer),
        )
    })
}
