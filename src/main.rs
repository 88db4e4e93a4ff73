use clap::Parser;
use ez_switch_lib::cli::{Cli, Commands};
use ez_switch_lib::{AppError, SwitchContext};
use std::process;

fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 默认只显示错误日志，避免干扰命令输出
    let log_level = if cli.verbose { "debug" } else { "error" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(Commands::Completions { shell }) = cli.command {
        ez_switch_lib::cli::generate_completions(shell);
        return Ok(());
    }

    // 后端只在启动时选择一次
    let ctx = SwitchContext::from_system(cli.backend)?;

    match cli.command {
        None | Some(Commands::Interactive) => ez_switch_lib::cli::interactive::run(&ctx),
        Some(Commands::Status { json }) => {
            ez_switch_lib::cli::commands::status::show_status(&ctx, json)
        }
        Some(Commands::Env { process, json }) => {
            ez_switch_lib::cli::commands::status::show_env(&ctx, process, json)
        }
        Some(Commands::Switch(cmd)) => ez_switch_lib::cli::commands::switch::execute(cmd, &ctx),
        Some(Commands::Key(cmd)) => ez_switch_lib::cli::commands::key::execute(cmd, &ctx),
        Some(Commands::Paths) => ez_switch_lib::cli::commands::status::show_paths(&ctx),
        Some(Commands::Completions { .. }) => Ok(()),
    }
}
