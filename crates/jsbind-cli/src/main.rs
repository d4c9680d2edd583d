//! # jsbind CLI
//!
//! Runs JavaScript with a `host` object installed on the global.
//!
//! ```bash
//! # Run a script file, passing it arguments
//! jsbind run script.js first second
//!
//! # Evaluate a one-liner
//! jsbind eval 'host.args.length'
//!
//! # Cap runaway loops
//! jsbind --loop-limit 100000 run script.js
//! ```
//!
//! The completion value is printed as JSON unless it is undefined. Set
//! `RUST_LOG` to see engine logs.

mod host;

use anyhow::{Context as _, Result};
use argh::FromArgs;
use jsbind::{Runtime, RuntimeConfig, Value};

#[derive(FromArgs)]
/// Run JavaScript with jsbind host bindings
struct Cli {
    /// maximum iterations of a single loop
    #[argh(option, long = "loop-limit")]
    loop_limit: Option<u64>,

    /// maximum call depth
    #[argh(option, long = "recursion-limit")]
    recursion_limit: Option<usize>,

    /// maximum size of the engine's value stack
    #[argh(option, long = "stack-limit")]
    stack_limit: Option<usize>,

    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Run(RunArgs),
    Eval(EvalArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "run")]
/// evaluate a script file
struct RunArgs {
    /// path to the script
    #[argh(positional)]
    script: String,

    /// arguments exposed to the script as `host.args`
    #[argh(positional, greedy)]
    args: Vec<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "eval")]
/// evaluate a source string
struct EvalArgs {
    /// source to evaluate
    #[argh(positional)]
    source: String,
}

impl Cli {
    fn runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::new();
        if let Some(limit) = self.loop_limit {
            config = config.with_loop_iteration_limit(limit);
        }
        if let Some(limit) = self.recursion_limit {
            config = config.with_recursion_limit(limit);
        }
        if let Some(limit) = self.stack_limit {
            config = config.with_stack_size_limit(limit);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Default to WARN so script output stays clean; RUST_LOG overrides.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = Runtime::with_config(cli.runtime_config());
    let cx = runtime.new_context();
    cx.set_error_reporter(|message| eprintln!("error: {message}"));

    let script_args = match &cli.command {
        Commands::Run(args) => args.args.clone(),
        Commands::Eval(_) => Vec::new(),
    };
    // Kept until after rendering: the completion value may read host accessors.
    let _host = host::install(&cx, script_args, |line| println!("{line}"))?;

    let result = match &cli.command {
        Commands::Run(args) => {
            tracing::info!("Running script: {}", args.script);
            cx.eval_file(&args.script)
                .with_context(|| format!("failed to run {}", args.script))?
        }
        Commands::Eval(args) => cx.eval(&args.source).context("evaluation failed")?,
    };

    if let Some(output) = render(&result)? {
        println!("{output}");
    }
    Ok(())
}

/// The JSON text printed for a completion value, or `None` for undefined.
fn render(value: &Value) -> Result<Option<String>> {
    if value.is_undefined() {
        return Ok(None);
    }
    let json = value.to_json()?;
    Ok(Some(serde_json::to_string_pretty(&json)?))
}
