use anyhow::Result;
use clap::Parser;
use photokit::photokit_core::cli::{prompt_path, prompt_quality};
use photokit::photokit_core::{
    Cli, Commands, Converter, DEFAULT_QUALITY, ExifToolSession, PhotokitError, TagProfile,
    organize_photos, report_exif,
};
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::io;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("photokit.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();

    match cli.command {
        Commands::Exif { file_path } => {
            let file_path = match file_path {
                Some(path) => path,
                None => match prompt_path(&mut input, "Enter the path of a photo: ")? {
                    Some(path) => path,
                    None => {
                        println!("No file path given.");
                        return Ok(());
                    }
                },
            };

            report_exif(&file_path, &mut io::stdout(), ExifToolSession::new)?;
        }

        Commands::Heic2jpg {
            input: source,
            output,
            quality,
            profile,
            profile_file,
            single,
        } => {
            let (source, output, quality) = match source {
                Some(source) => (source, output, quality.unwrap_or(DEFAULT_QUALITY)),
                None => {
                    let Some(source) =
                        prompt_path(&mut input, "Enter the directory containing HEIC files: ")?
                    else {
                        println!("No input directory given.");
                        return Ok(());
                    };
                    let output = match output {
                        Some(dir) => Some(dir),
                        None => prompt_path(
                            &mut input,
                            "Enter the output directory (empty to save next to the originals): ",
                        )?,
                    };
                    let quality = match quality {
                        Some(q) => q,
                        None => prompt_quality(
                            &mut input,
                            "Enter the JPEG quality (1-100, default 95): ",
                            DEFAULT_QUALITY,
                        )?,
                    };
                    (source, output, quality)
                }
            };

            let profile = match profile_file {
                Some(path) => TagProfile::load(&path)?,
                None => profile.profile(),
            };
            log::info!("Using tag profile '{}'", profile.name);

            let mut converter = Converter::with_system_tools(profile);

            if single {
                match converter.heic_to_jpg(&source, output.as_deref(), quality) {
                    Ok(outcome) => println!("{}", outcome.describe()),
                    Err(PhotokitError::NotFound(path)) => {
                        println!("File not found: {}", path.display());
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                let report =
                    converter.batch_convert_heic_to_jpg(&source, output.as_deref(), quality)?;
                log::info!(
                    "Batch finished: {} converted, {} failed",
                    report.converted.len(),
                    report.failed.len()
                );
            }
        }

        Commands::Organize {
            source_folder,
            dry_run,
        } => {
            let source_folder = match source_folder {
                Some(path) => path,
                None => match prompt_path(&mut input, "Enter the folder containing photos: ")? {
                    Some(path) => path,
                    None => {
                        println!("No folder given.");
                        return Ok(());
                    }
                },
            };

            match organize_photos(&source_folder, dry_run) {
                Ok(_) => {}
                Err(PhotokitError::NotFound(path)) => {
                    println!("Error: folder {} does not exist!", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
