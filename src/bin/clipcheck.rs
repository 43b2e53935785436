use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use clipcheck::{
    ApngReader, ApngVerifier, ApngWriter, ClipError, FrameRGBA, VerifyConfig, VerifyOptions,
    compare_frames,
};

#[derive(Parser, Debug)]
#[command(name = "clipcheck", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print clip metadata and decode every frame.
    Inspect(InspectArgs),
    /// Compare two still images and write the delta image.
    Diff(DiffArgs),
    /// Replay a rendered APNG against a golden APNG.
    Verify(VerifyArgs),
    /// Encode a directory of PNG frames into an APNG.
    Record(RecordArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input PNG/APNG.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct DiffArgs {
    /// Golden image.
    #[arg(long)]
    expected: PathBuf,

    /// Rendered image.
    #[arg(long)]
    actual: PathBuf,

    /// Output delta PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Verification config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct VerifyArgs {
    /// Golden APNG.
    #[arg(long)]
    golden: PathBuf,

    /// Rendered APNG.
    #[arg(long)]
    actual: PathBuf,

    /// Delta APNG written on failure (default: `<failure_dir>/delta-<golden name>`).
    #[arg(long)]
    delta: Option<PathBuf>,

    /// Verification config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RecordArgs {
    /// Directory of PNG frames, encoded in file name order.
    #[arg(long)]
    frames: PathBuf,

    /// Frames per second.
    #[arg(long)]
    fps: u32,

    /// Output APNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let res = match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Diff(args) => cmd_diff(args),
        Command::Verify(args) => cmd_verify(args),
        Command::Record(args) => cmd_record(args),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ClipError>() {
                Some(ClipError::Verification(failure)) => eprintln!("{failure}"),
                _ => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<VerifyConfig> {
    match path {
        Some(p) => {
            VerifyConfig::from_path(p).with_context(|| format!("load config '{}'", p.display()))
        }
        None => Ok(VerifyConfig::default()),
    }
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let mut reader = ApngReader::open(&args.in_path)?;
    println!("file: {}", args.in_path.display());
    println!("canvas: {}x{}", reader.width(), reader.height());
    println!("color: {}", if reader.has_alpha() { "rgba" } else { "rgb" });
    println!("declared frames: {}", reader.frame_count());

    let mut decoded = 0u32;
    while reader.next_frame()?.is_some() {
        decoded += 1;
    }
    println!("decoded frames: {decoded}");
    println!("delay: {}", reader.delay());
    if decoded != reader.frame_count() {
        anyhow::bail!(
            "declared {} frames but decoded {decoded}",
            reader.frame_count()
        );
    }
    Ok(())
}

fn cmd_diff(args: DiffArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let differ = cfg.build_differ();
    let expected = FrameRGBA::load_png(&args.expected)?;
    let actual = FrameRGBA::load_png(&args.actual)?;

    let result = compare_frames(differ.as_ref(), &expected, &actual)?;
    result.delta.save_png(&args.out)?;
    println!(
        "{:.3}% different ({} different, {} similar pixels)",
        result.percent_different, result.different_pixels, result.similar_pixels
    );
    println!("delta: {}", args.out.display());

    if f64::from(result.percent_different) > cfg.max_percent_difference {
        anyhow::bail!(
            "images differ by more than {:.1}%",
            cfg.max_percent_difference
        );
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let delta_path = match args.delta {
        Some(p) => p,
        None => {
            let name = args
                .golden
                .file_name()
                .context("golden path has no file name")?;
            let mut delta = std::ffi::OsString::from("delta-");
            delta.push(name);
            cfg.failure_dir.join(delta)
        }
    };

    let mut actual = ApngReader::open(&args.actual)?;
    let first = actual.next_frame()?;
    let fps = actual
        .delay()
        .fps()
        .context("rendered clip has no whole-number frame rate")?;

    let mut verifier = ApngVerifier::new(
        VerifyOptions {
            golden_path: args.golden.clone(),
            delta_path,
            fps,
            frame_count: actual.frame_count(),
            max_percent_difference: cfg.max_percent_difference,
        },
        cfg.build_differ(),
    )?;

    let mut frame = first;
    while let Some(f) = frame {
        verifier.verify_frame(&f)?;
        frame = actual.next_frame()?;
    }
    verifier.assert_finished()?;
    verifier.close()?;
    println!(
        "{} matches {}",
        args.actual.display(),
        args.golden.display()
    );
    Ok(())
}

fn cmd_record(args: RecordArgs) -> anyhow::Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&args.frames)
        .with_context(|| format!("read frames dir '{}'", args.frames.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .with_context(|| format!("list frames dir '{}'", args.frames.display()))?;
    paths.retain(|p| {
        p.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
    });
    paths.sort();
    if paths.is_empty() {
        anyhow::bail!("no .png frames in '{}'", args.frames.display());
    }

    let frame_count = u32::try_from(paths.len()).context("too many frames")?;
    let mut writer = ApngWriter::with_frame_count(&args.out, args.fps, frame_count)?;
    for p in &paths {
        let frame = FrameRGBA::load_png(p)?;
        writer.write_image(&frame)?;
    }
    writer.close()?;
    println!("wrote {} frames to {}", paths.len(), args.out.display());
    Ok(())
}
