use clap::{Parser, Subcommand};
use log::debug;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use ptimer::config::Config;
use ptimer::sequencer::{PlaybackState, Player};
use ptimer::{Descriptor, Ptimer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Create, extract and play .ptimer files")]
struct Args {
    /// Path to config file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate .ptimer file from JSON and asset files
    Create {
        /// JSON descriptor; read from stdin when omitted (asset paths are then relative to the working directory)
        json: Option<PathBuf>,

        /// Path to the output file; the container is written to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,

        /// Accept steps whose sound does not name a bundled asset
        #[arg(long)]
        no_check_sound_references: bool,
    },
    /// Save .ptimer contents into standard files
    Extract {
        /// Container file; read from stdin when omitted
        ptimer: Option<PathBuf>,

        /// Path to the output directory
        #[arg(long)]
        outdir: PathBuf,

        /// Remove the output directory before extracting
        #[arg(long)]
        clean: bool,
    },
    /// Play a .ptimer file in the terminal
    Play {
        /// Container file
        ptimer: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Create {
            json,
            out,
            no_check_sound_references,
        } => {
            let mut options = config.create;
            if no_check_sound_references {
                options.check_sound_references = false;
            }
            create(json, out, &options)
        }
        Command::Extract {
            ptimer,
            outdir,
            clean,
        } => {
            let mut options = config.extract;
            options.clean |= clean;
            extract(ptimer, outdir, &options)
        }
        Command::Play { ptimer } => play(ptimer),
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn create(
    json_path: Option<PathBuf>,
    out: Option<PathBuf>,
    options: &ptimer::config::CreateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let (json, base_dir) = match json_path {
        Some(path) => {
            let path = absolute(&path)
                .map_err(|e| format!("Path for a JSON file is invalid: {}", e))?;
            let json = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .ok_or("JSON file has no parent directory")?;
            (json, base_dir)
        }
        None => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .map_err(|e| format!("Failed to read from stdin: {}", e))?;
            let base_dir = std::env::current_dir()
                .map_err(|e| format!("Failed to get working directory: {}", e))?;
            (json, base_dir)
        }
    };

    let descriptor = Descriptor::parse(&json)?;
    debug!("Resolving assets against {}", base_dir.display());

    let rt = tokio::runtime::Runtime::new()?;
    match out {
        Some(out) => {
            let out = absolute(&out)?;
            let options = ptimer::config::CreateOptions {
                overwrite: true,
                ..options.clone()
            };
            rt.block_on(ptimer::create_container(&descriptor, &base_dir, &out, &options))?;
        }
        None => {
            let temp_dir = tempfile::tempdir()?;
            let temp_path = temp_dir.path().join("stdout.ptimer");
            rt.block_on(ptimer::create_container(
                &descriptor,
                &base_dir,
                &temp_path,
                options,
            ))?;

            let mut file = std::fs::File::open(&temp_path)?;
            let mut stdout = std::io::stdout().lock();
            std::io::copy(&mut file, &mut stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn extract(
    ptimer_path: Option<PathBuf>,
    outdir: PathBuf,
    options: &ptimer::config::ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let outdir = absolute(&outdir).map_err(|e| format!("Failed to resolve outdir: {}", e))?;

    // Keeps a stdin copy alive until extraction is done
    let mut _stdin_copy = None;
    let source = match ptimer_path {
        Some(path) => absolute(&path)
            .map_err(|e| format!("Path for .ptimer file is invalid: {}", e))?,
        None => {
            let mut file = tempfile::Builder::new()
                .prefix("stdin")
                .suffix(".ptimer")
                .tempfile()?;
            std::io::copy(&mut std::io::stdin().lock(), file.as_file_mut())?;
            let path = file.path().to_path_buf();
            _stdin_copy = Some(file);
            path
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(ptimer::extract_container(&source, &outdir, options))?;
    println!("{}", outdir.join(&options.descriptor_file_name).display());

    Ok(())
}

fn play(ptimer_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let timer = ptimer::read_container(&ptimer_path).await?;
        run_player(&timer).await
    })
}

async fn run_player(timer: &Ptimer) -> Result<(), Box<dyn std::error::Error>> {
    let (mut player, mut timers) = Player::new(timer.steps.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    render(&player, timer);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim() == "q" {
                    break;
                }

                let before = player.state();
                match before {
                    PlaybackState::NotStarted => {
                        player.start()?;
                    }
                    PlaybackState::Active { .. } if player.has_pending_timer() => {
                        println!("Timed step, please wait.");
                    }
                    PlaybackState::Active { .. } => {
                        player.advance()?;
                    }
                    PlaybackState::Finished => {
                        player.restart()?;
                    }
                }
                if player.state() != before {
                    render(&player, timer);
                }
            }
            Some(expired) = timers.recv() => {
                let before = player.state();
                if player.on_timer_expired(expired)? != before {
                    render(&player, timer);
                }
            }
        }
    }

    Ok(())
}

fn render(player: &Player, timer: &Ptimer) {
    match player.state() {
        PlaybackState::NotStarted => {
            println!("\n{}", timer.metadata.title);
            if let Some(description) = &timer.metadata.description {
                println!("{}", description);
            }
            println!("[Enter] Start  [q] Quit");
        }
        PlaybackState::Active { index } => {
            let Some(step) = player.current_step() else {
                println!("\nIllegal step reached");
                return;
            };
            println!("\n({}/{}) {}", index + 1, player.steps().len(), step.title);
            if let Some(description) = &step.description {
                println!("{}", description);
            }
            if let Some(sound) = timer.sound_of(step) {
                println!("Sound: {} ({})", sound.name, sound.mime);
            }
            match step.duration_seconds {
                Some(seconds) => println!("Wait for {} seconds", seconds),
                None => println!("[Enter] Next"),
            }
        }
        PlaybackState::Finished => {
            println!("\nCompleted");
            println!("All steps completed.");
            println!("[Enter] Done  [q] Quit");
        }
    }
}
