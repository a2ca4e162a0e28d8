use clap::Parser;
use coriolis::adapters::download::{years_from_args, Downloader};
use coriolis::core::ConfigProvider;
use coriolis::utils::{logger, validation::Validate};
use coriolis::{
    CliConfig, Command, EtlEngine, GridPipeline, LocalStorage, TomlConfig, ZipsPipeline,
};

async fn run(
    command: Command,
    settings: TomlConfig,
    monitor_enabled: bool,
) -> coriolis::Result<String> {
    match command {
        Command::BuildZips => {
            let storage = LocalStorage::new(settings.work_dir());
            let pipeline = ZipsPipeline::new(storage, settings);
            EtlEngine::new_with_monitoring(pipeline, monitor_enabled).run().await
        }
        Command::BuildGrid => {
            let storage = LocalStorage::new(settings.work_dir());
            let pipeline = GridPipeline::new(storage, settings);
            EtlEngine::new_with_monitoring(pipeline, monitor_enabled).run().await
        }
        Command::Download { years } => {
            let years = years_from_args(&years)?;
            let downloader = Downloader::new(settings.download_base_url(), settings.data_dir())?;
            let fetched = downloader
                .download_all(settings.history_file_name(), &years)
                .await?;
            tracing::info!("⬇️  Fetched {} files for {} years", fetched, years.len());
            Ok(settings.data_dir().display().to_string())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting coriolis");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證設定檔
    let settings = match TomlConfig::from_file_or_default(&cli.config)
        .map(|s| s.with_dirs(cli.data.clone(), cli.work.clone()))
        .and_then(|s| s.validate().map(|_| s))
    {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let monitor_enabled = cli.monitor || settings.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(cli.command, settings, monitor_enabled).await {
        Ok(output_path) => {
            tracing::info!("✅ Completed successfully!");
            println!("✅ Completed successfully!");
            println!("📁 Output: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}
