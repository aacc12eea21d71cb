use clap::Parser;

use qrlinker::cli::{Cli, Commands, ConfigCommands};
use qrlinker::config::{StaticConfig, get_config, init_config_with};
use qrlinker::errors::QrlinkerError;
use qrlinker::runtime::modes::run_server;
use qrlinker::system::init_logging;
use qrlinker::utils::password::hash_password;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::HashPassword { password }) => {
            match hash_password(&password) {
                Ok(hash) => {
                    println!("{}", hash);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{}", e.format_simple());
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Config {
            action: ConfigCommands::Generate { output_path },
        }) => {
            match output_path {
                Some(path) => {
                    StaticConfig::default()
                        .save_to_file(&path)
                        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;
                    println!("Configuration written to {}", path);
                }
                None => println!("{}", StaticConfig::generate_sample_config()),
            }
            Ok(())
        }
        Some(Commands::Serve) | None => {
            init_config_with(StaticConfig::load_from(&cli.config));
            let config = get_config();

            // guard 必须存活到进程结束，否则文件日志丢失
            let _log_guard = init_logging(&config.logging)?;

            run_server().await.inspect_err(|e| {
                if let Some(err) = e.downcast_ref::<QrlinkerError>() {
                    eprintln!("{}", err.format_colored());
                }
            })
        }
    }
}
