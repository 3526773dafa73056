use clap::Parser;
use gcam_etl::utils::{logger, validation::Validate};
use gcam_etl::{CliConfig, EtlEngine, LocalStorage, QueryPipeline, RunConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting GCAM query post-processor");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match RunConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(output_path) = args.output_path.clone() {
        tracing::info!("🔧 Output path overridden to: {}", output_path);
        config.set_output_path(output_path);
    }
    if args.report {
        tracing::info!("🔧 Report generation forced on");
        config.force_report();
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 顯示配置摘要
    display_run_summary(&config);

    // 決定監控設定
    let monitor_enabled = args.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立存儲與管線
    let storage = LocalStorage::new(config.results_dir().to_string());
    let pipeline = QueryPipeline::new(storage, config);

    // 建立 ETL 引擎並運行
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Post-processing completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Post-processing completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Post-processing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                gcam_etl::utils::error::ErrorSeverity::Low => 0, // 警告，但成功
                gcam_etl::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
                gcam_etl::utils::error::ErrorSeverity::High => 1, // 處理錯誤
                gcam_etl::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_run_summary(config: &RunConfig) {
    println!("📋 Run Summary:");
    println!("  Run: {}", config.run.name);
    if let Some(description) = &config.run.description {
        println!("  Description: {}", description);
    }
    println!("  Scenarios: {}", config.scenario_names().join(", "));
    if let Some(baseline) = config.baseline() {
        println!("  Baseline: {}", baseline);
    }
    println!("  Results dir: {}", config.results_dir());
    println!("  Output: {}", config.output_path());
    println!(
        "  Report: {}",
        if config.report_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();
}
