use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser, Debug)]
#[command(name = "wavyte-bridge", version)]
struct Cli {
    /// Composition list JSON.
    #[arg(long = "in", global = true)]
    in_path: Option<PathBuf>,

    /// Page environment JSON (input props, timeouts, static files).
    #[arg(long, global = true)]
    env: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered composition ids.
    Names,
    /// Resolve one composition's metadata and print it as JSON.
    Calc(CalcArgs),
    /// Drive the capture loop and print collected assets as JSON lines.
    Assets(AssetsArgs),
}

#[derive(Parser, Debug)]
struct CalcArgs {
    /// Composition id.
    #[arg(long)]
    comp: String,

    /// Runtime props as inline JSON; defaults to the environment's input props.
    #[arg(long)]
    props: Option<String>,
}

#[derive(Parser, Debug)]
struct AssetsArgs {
    /// Composition id.
    #[arg(long)]
    comp: String,

    /// First frame (inclusive).
    #[arg(long, default_value_t = 0)]
    from: u64,

    /// Last frame (exclusive); defaults to the composition's duration.
    #[arg(long)]
    to: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut bridge = open_bridge(cli.in_path.as_deref(), cli.env.as_deref())?;
    match cli.cmd {
        Command::Names => cmd_names(&bridge),
        Command::Calc(args) => cmd_calc(&mut bridge, args),
        Command::Assets(args) => cmd_assets(&mut bridge, args),
    }
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info,wavyte_bridge=debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr)
        .with_target(true)
        .compact()
        .init();
}

fn open_bridge(
    in_path: Option<&Path>,
    env_path: Option<&Path>,
) -> anyhow::Result<wavyte_bridge::Bridge> {
    let env = match env_path {
        Some(p) => wavyte_bridge::PageEnv::from_path(p)
            .with_context(|| format!("load page env '{}'", p.display()))?,
        None => wavyte_bridge::PageEnv::default(),
    };

    let mut resolver = wavyte_bridge::CompositionResolver::new();
    if let Some(p) = in_path {
        let file = wavyte_bridge::CompositionFile::from_path(p)
            .with_context(|| format!("load compositions '{}'", p.display()))?;
        let n = file.register_into(&mut resolver)?;
        tracing::info!(count = n, "compositions registered");
    }
    let host = wavyte_bridge::DeclaredMediaHost::from_resolver(&resolver);

    let mut bridge = wavyte_bridge::Bridge::new(
        env,
        Arc::new(wavyte_bridge::SystemClock::new()),
        host,
    )?;
    *bridge.compositions_mut() = resolver;
    Ok(bridge)
}

fn cmd_names(bridge: &wavyte_bridge::Bridge) -> anyhow::Result<()> {
    for name in bridge.get_composition_names()? {
        println!("{name}");
    }
    Ok(())
}

fn cmd_calc(bridge: &mut wavyte_bridge::Bridge, args: CalcArgs) -> anyhow::Result<()> {
    let props = args
        .props
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .with_context(|| "parse --props JSON")?;

    let meta = resolve_metadata(bridge, &args.comp, props.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}

fn cmd_assets(bridge: &mut wavyte_bridge::Bridge, args: AssetsArgs) -> anyhow::Result<()> {
    let meta = resolve_metadata(bridge, &args.comp, None)?;
    let end = args
        .to
        .unwrap_or(meta.duration_in_frames)
        .min(meta.duration_in_frames);
    let range = wavyte_bridge::FrameRange::new(
        wavyte_bridge::FrameIndex(args.from),
        wavyte_bridge::FrameIndex(end),
    )?;
    if range.is_empty() {
        anyhow::bail!("empty frame range {}..{end} for '{}'", args.from, args.comp);
    }

    bridge.set_bundle_mode(wavyte_bridge::BundleState::composition(&meta))?;
    wait_ready(bridge)?;

    let mut total = 0usize;
    for f in range.start.0..range.end.0 {
        bridge
            .set_frame(wavyte_bridge::FrameIndex(f), &args.comp)
            .with_context(|| format!("set frame {f}"))?;
        wait_ready(bridge).with_context(|| format!("frame {f} never became ready"))?;
        for asset in bridge.collect_assets()? {
            println!("{}", serde_json::to_string(&asset)?);
            total += 1;
        }
    }
    eprintln!("collected {total} asset(s) over {} frame(s)", range.len_frames());
    Ok(())
}

fn resolve_metadata(
    bridge: &mut wavyte_bridge::Bridge,
    comp: &str,
    props: Option<&serde_json::Value>,
) -> anyhow::Result<wavyte_bridge::CompositionMetadata> {
    let mut step = bridge.calculate_composition(comp, props)?;
    loop {
        match step {
            wavyte_bridge::Calculation::Ready(meta) => return Ok(meta),
            wavyte_bridge::Calculation::Pending => {
                wait_ready(bridge).with_context(|| format!("metadata of '{comp}' never settled"))?;
                step = bridge.finish_calculation()?;
            }
        }
    }
}

fn wait_ready(bridge: &mut wavyte_bridge::Bridge) -> anyhow::Result<()> {
    loop {
        if bridge.is_render_ready() {
            return Ok(());
        }
        bridge.render_error()?;
        std::thread::sleep(Duration::from_millis(5));
    }
}
