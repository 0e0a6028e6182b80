use clap::{Parser, Subcommand};
use loanbook::config::toml_config::TomlConfig;
use loanbook::config::{Overrides, Settings};
use loanbook::domain::ports::{ConfigProvider, SessionStore};
use loanbook::session::{guard, FileSession, Redirect, Route};
use loanbook::utils::{logger, validation::Validate};
use loanbook::{
    CsvImportPipeline, ImportEngine, Loan, LoanService, LoanStatus, LoanUpdate, LoadSource,
    NewLoan, SearchFilters, TableClient,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "loanbook")]
#[command(about = "Data-access CLI for the hosted loanable table")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend project URL
    #[arg(long, env = "LOANBOOK_URL")]
    base_url: Option<String>,

    /// Backend API key
    #[arg(long, env = "LOANBOOK_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Remote table name
    #[arg(long)]
    table: Option<String>,

    /// Login flag file
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mark this machine as logged in
    Login,
    /// Clear the login flag
    Logout,
    /// Check the backend connection
    Ping,
    /// List all loans ordered by borrower name
    List,
    /// Show a single loan by account number
    Get { account_no: i64 },
    /// Insert a new loan record
    Add {
        #[arg(long)]
        borrower: String,
        #[arg(long)]
        account_no: i64,
        #[arg(long)]
        loan_type: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        closing_balance: f64,
        #[arg(long, default_value_t = 0.0)]
        overdue_amount: f64,
    },
    /// Update fields of an existing loan
    Update {
        account_no: i64,
        #[arg(long)]
        borrower: Option<String>,
        #[arg(long)]
        loan_type: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        closing_balance: Option<f64>,
        #[arg(long)]
        overdue_amount: Option<f64>,
    },
    /// Delete a loan
    Delete { account_no: i64 },
    /// Search loans by term and filters
    Search {
        term: Option<String>,
        #[arg(long)]
        loan_type: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        /// overdue, active or closed
        #[arg(long)]
        status: Option<LoanStatus>,
        /// Push all filters to the server instead of filtering in memory
        #[arg(long)]
        simple: bool,
    },
    /// List distinct loan types
    Types,
    /// List distinct branches
    Branches,
    /// Import a CSV file into the table
    Import {
        csv: Option<PathBuf>,
        /// Clear existing rows first
        #[arg(long)]
        truncate: bool,
    },
}

fn route_for(command: &Command) -> Route {
    match command {
        Command::Login => Route::Login,
        Command::Logout | Command::Ping => Route::Landing,
        _ => Route::Protected,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.log_json);

    tracing::info!("Starting loanbook CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    // 載入配置檔（有指定才載）
    let file_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => {
                if let Err(e) = config.validate() {
                    tracing::error!("❌ Configuration validation failed: {}", e);
                    eprintln!("❌ {}", e);
                    std::process::exit(2);
                }
                Some(config)
            }
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path.display(), e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(2);
            }
        },
        None => None,
    };
    let import_defaults = file_config.as_ref().and_then(|c| c.import.clone());

    let overrides = Overrides {
        base_url: cli.base_url.clone(),
        api_key: cli.api_key.clone(),
        table: cli.table.clone(),
        session_file: cli.session_file.clone(),
    };
    let settings = match Settings::resolve(file_config, overrides) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 Provide --base-url/--api-key, LOANBOOK_URL/LOANBOOK_KEY or a config file");
            std::process::exit(2);
        }
    };
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    let session = FileSession::new(settings.session_file.clone());

    if let Err(e) = run(cli.command, &settings, &session, import_defaults).await {
        tracing::error!("❌ Command failed: {}", e);
        eprintln!("❌ {}", e);
        if matches!(e, loanbook::LoanError::NotLoggedInError) {
            eprintln!("💡 Run `loanbook login` first");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    command: Command,
    settings: &Settings,
    session: &FileSession,
    import_defaults: Option<loanbook::config::toml_config::ImportConfig>,
) -> loanbook::Result<()> {
    // 路由守門：資料指令一律要先登入
    match guard(route_for(&command), session.is_logged_in()) {
        Some(Redirect::ToLogin) => return Err(loanbook::LoanError::NotLoggedInError),
        Some(Redirect::ToDashboard) => {
            println!("✅ Already logged in");
            return Ok(());
        }
        None => {}
    }

    match command {
        Command::Login => {
            session.log_in()?;
            println!("✅ Logged in");
        }
        Command::Logout => {
            session.log_out()?;
            println!("Logged out");
        }
        Command::Ping => {
            let client = TableClient::from_config(settings)?;
            if client.ping().await {
                println!("✅ Backend connection OK ({})", settings.base_url());
            } else {
                eprintln!("❌ Backend connection failed ({})", settings.base_url());
                std::process::exit(1);
            }
        }
        Command::List => {
            let mut service = LoanService::new(TableClient::from_config(settings)?);
            match service.load_loans().await? {
                LoadSource::Empty => println!("⚠️ No records in table '{}'", settings.table()),
                LoadSource::Backend => print_loans(service.loans()),
            }
        }
        Command::Get { account_no } => {
            let service = LoanService::new(TableClient::from_config(settings)?);
            let loan = service.get_loan(account_no).await?;
            print_loans(std::slice::from_ref(&loan));
        }
        Command::Add {
            borrower,
            account_no,
            loan_type,
            branch,
            closing_balance,
            overdue_amount,
        } => {
            let mut service = LoanService::new(TableClient::from_config(settings)?);
            let stored = service
                .add_loan(NewLoan {
                    borrower_name: borrower,
                    account_no,
                    loan_type,
                    branch_name: branch,
                    closing_balance,
                    overdue_amount,
                })
                .await?;
            println!("✅ Added loan for account {}", stored.account_no);
        }
        Command::Update {
            account_no,
            borrower,
            loan_type,
            branch,
            closing_balance,
            overdue_amount,
        } => {
            let patch = LoanUpdate {
                borrower_name: borrower,
                loan_type,
                branch_name: branch,
                closing_balance,
                overdue_amount,
            };
            if patch.is_empty() {
                eprintln!("❌ Nothing to update: pass at least one field flag");
                std::process::exit(1);
            }

            let mut service = LoanService::new(TableClient::from_config(settings)?);
            let stored = service.update_loan(account_no, patch).await?;
            println!("✅ Updated loan for account {}", stored.account_no);
        }
        Command::Delete { account_no } => {
            let mut service = LoanService::new(TableClient::from_config(settings)?);
            service.delete_loan(account_no).await?;
            println!("🗑️ Deleted loan for account {}", account_no);
        }
        Command::Search {
            term,
            loan_type,
            branch,
            status,
            simple,
        } => {
            let filters = SearchFilters {
                loan_type,
                branch,
                status,
            };
            let term = term.unwrap_or_default();

            let mut service = LoanService::new(TableClient::from_config(settings)?);
            let results = if simple {
                service.search_loans(&term, &filters).await?
            } else {
                service.advanced_search(&term, &filters).await?
            };

            if results.is_empty() {
                println!("⚠️ No matching loans");
            } else {
                print_loans(&results);
            }
        }
        Command::Types => {
            let service = LoanService::new(TableClient::from_config(settings)?);
            for loan_type in service.loan_types().await? {
                println!("{}", loan_type);
            }
        }
        Command::Branches => {
            let service = LoanService::new(TableClient::from_config(settings)?);
            for branch in service.branches().await? {
                println!("{}", branch);
            }
        }
        Command::Import { csv, truncate } => {
            let csv_path = csv
                .or_else(|| {
                    import_defaults
                        .as_ref()
                        .and_then(|d| d.csv_path.clone())
                        .map(PathBuf::from)
                })
                .ok_or_else(|| loanbook::LoanError::MissingConfigError {
                    field: "import.csv_path".to_string(),
                })?;
            let truncate = truncate
                || import_defaults
                    .as_ref()
                    .and_then(|d| d.truncate)
                    .unwrap_or(false);

            let client = TableClient::from_config(settings)?;
            let pipeline = CsvImportPipeline::new(client, csv_path, truncate);
            let inserted = ImportEngine::new(pipeline).run().await?;
            println!("✅ Imported {} records into '{}'", inserted, settings.table());
        }
    }

    Ok(())
}

fn print_loans(loans: &[Loan]) {
    println!(
        "{:<10} {:<28} {:<12} {:<16} {:>16} {:>16}",
        "Account", "Borrower", "Type", "Branch", "Closing Balance", "Overdue"
    );
    for loan in loans {
        println!(
            "{:<10} {:<28} {:<12} {:<16} {:>16.2} {:>16.2}",
            loan.account_no,
            loan.borrower_name,
            loan.loan_type.as_deref().unwrap_or("-"),
            loan.branch_name.as_deref().unwrap_or("-"),
            loan.closing_balance,
            loan.overdue_amount,
        );
    }
    println!("{} loan(s)", loans.len());
}
