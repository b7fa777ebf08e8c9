use clap::Parser;
use family_admin::app::commands::{execute, CommandContext};
use family_admin::utils::error::{AdminError, ErrorSeverity};
use family_admin::utils::{logger, validation::Validate};
use family_admin::{ApiClient, CliConfig, FileSessionStore, Session};
use std::sync::Arc;

fn report(e: &AdminError) -> i32 {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Low => 4,      // 輸入錯誤
        ErrorSeverity::Medium => 2,   // 可重試
        ErrorSeverity::High => 1,     // 需要使用者處理
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => std::process::exit(report(&e)),
    };
    tracing::debug!("Resolved settings: {:?}", settings);

    // 驗證配置
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        std::process::exit(report(&e));
    }

    let store = Arc::new(FileSessionStore::new(&settings.session_file));
    let session = match Session::restore(store) {
        Ok(session) => session,
        Err(e) => std::process::exit(report(&e)),
    };

    let api = match ApiClient::from_config(&settings, session) {
        Ok(api) => api,
        Err(e) => std::process::exit(report(&e)),
    };

    let today = chrono::Local::now().date_naive();
    let ctx = CommandContext::new(api, &settings, today);

    match execute(cli.command, &ctx).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => std::process::exit(report(&e)),
    }
}
