use std::path::PathBuf;

use atty::Stream;
use bx_core::commands;
use bx_core::{
    AppTarget, CommandContext, ExecutionOutcome, FetchToolRequest, GlobalOptions, RunRequest,
};
use bx_domain::AppDescriptor;
use clap::{value_parser, ArgAction, Args, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

mod style;

use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = BxCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };

    let ctx = CommandContext::new(&global).map_err(|err| eyre!("{err:?}"))?;
    let outcome = dispatch(&ctx, &cli.command).map_err(|err| eyre!("{err:?}"))?;
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "error",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bx_core={level},bx_cli={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn dispatch(ctx: &CommandContext, command: &CommandCli) -> anyhow::Result<ExecutionOutcome> {
    match command {
        CommandCli::Verify => commands::verify(ctx),
        CommandCli::Prepare(args) => commands::prepare(ctx, &args.target()?),
        CommandCli::Run(args) => commands::run(
            ctx,
            &RunRequest {
                target: args.app.target()?,
                local: args.local,
                capture: args.capture,
                env: args.env.clone(),
                cwd: args.cwd.clone(),
                command: args.command.clone(),
            },
        ),
        CommandCli::FetchTool(args) => commands::fetch_tool(
            ctx,
            &FetchToolRequest {
                tool: args.tool.clone(),
                install: !args.no_install,
            },
        ),
    }
}

fn command_name(command: &CommandCli) -> &'static str {
    match command {
        CommandCli::Verify => "verify",
        CommandCli::Prepare(_) => "prepare",
        CommandCli::Run(_) => "run",
        CommandCli::FetchTool(_) => "fetch-tool",
    }
}

fn emit_output(cli: &BxCli, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = outcome.to_json(command_name(&cli.command));
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if is_passthrough(&outcome.details) {
        print!("{}", outcome.message);
    } else if !cli.quiet || code != 0 {
        println!("{}", style.status(outcome.status, &outcome.message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            println!("{}", style.hint(hint));
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(
    name = "bx",
    version,
    about = "Run packaging tools on the host or inside an app's build container",
    after_help = "Examples:\n  bx verify\n  bx prepare --app-name hello --bundle com.example --source src/hello\n  bx run --app-name hello --bundle com.example -- python3 -m hello"
)]
struct BxCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print)"
    )]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase verbosity (-v echoes every subprocess)")]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    json: bool,
    #[arg(long, help = "Disable colored human output")]
    no_color: bool,
    #[command(subcommand)]
    command: CommandCli,
}

#[derive(Subcommand, Debug)]
enum CommandCli {
    #[command(about = "Check that the container engine is installed and usable.")]
    Verify,
    #[command(about = "Build the app's container image.")]
    Prepare(AppArgs),
    #[command(
        about = "Run a command for an app, inside its container unless --local is given.",
        override_usage = "bx run [OPTIONS] --app-name <NAME> --bundle <BUNDLE> -- <COMMAND>..."
    )]
    Run(RunArgs),
    #[command(
        name = "fetch-tool",
        about = "Make sure a helper binary is installed (rcedit, linuxdeploy, or a plugin URL)."
    )]
    FetchTool(FetchToolArgs),
}

#[derive(Args, Debug)]
struct AppArgs {
    #[arg(long, value_name = "NAME")]
    app_name: String,
    #[arg(long, value_name = "BUNDLE", help = "Reverse-DNS bundle prefix, e.g. com.example")]
    bundle: String,
    #[arg(long = "source", value_name = "PATH", help = "Source package path (repeatable)")]
    sources: Vec<String>,
    #[arg(long, num_args = 1.., value_name = "PACKAGE")]
    system_requires: Option<Vec<String>>,
    #[arg(long, default_value = "linux")]
    platform: String,
    #[arg(long, value_parser = value_parser!(PathBuf), help = "Project root (defaults to the current directory)")]
    base: Option<PathBuf>,
}

impl AppArgs {
    fn target(&self) -> std::io::Result<AppTarget> {
        let base_path = match &self.base {
            Some(base) => base.clone(),
            None => std::env::current_dir()?,
        };
        let mut app = AppDescriptor::new(&self.app_name, &self.bundle).with_sources(&self.sources);
        if let Some(requires) = &self.system_requires {
            app = app.with_system_requires(requires);
        }
        Ok(AppTarget {
            app,
            base_path,
            platform: self.platform.clone(),
        })
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    app: AppArgs,
    #[arg(long, help = "Run on the host instead of in the container")]
    local: bool,
    #[arg(long, help = "Capture the command's output and print it when it finishes")]
    capture: bool,
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,
    #[arg(long, value_parser = value_parser!(PathBuf))]
    cwd: Option<PathBuf>,
    #[arg(last = true, required = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[derive(Args, Debug)]
struct FetchToolArgs {
    #[arg(value_name = "TOOL")]
    tool: String,
    #[arg(long, help = "Fail instead of downloading a missing tool")]
    no_install: bool,
}

fn parse_env_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
