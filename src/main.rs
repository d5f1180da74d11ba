mod analysis;
mod audit;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod indexes;
mod models;
mod resolver;
mod rows;
mod settings;
mod statement;

use clap::Parser;

use cli::{
    AccountCommands, Cli, ClosingCommands, Commands, CompanyCommands, CostCenterCommands,
    ImportCommands, LineCommands, ReportCommands, TenantCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Tenants { command } => match command {
            TenantCommands::Add { name } => cli::tenants::add(&name),
            TenantCommands::List => cli::tenants::list(),
            TenantCommands::Use { name } => cli::tenants::set_default(&name),
        },
        Commands::Companies { command } => match command {
            CompanyCommands::Add {
                name,
                cnpj,
                erp_code,
                tenant,
            } => cli::companies::add(&name, cnpj.as_deref(), erp_code.as_deref(), tenant.as_deref()),
            CompanyCommands::List { tenant } => cli::companies::list(tenant.as_deref()),
        },
        Commands::Accounts { command } => match command {
            AccountCommands::Add { code, name, tenant } => {
                cli::accounts::add(&code, &name, tenant.as_deref())
            }
            AccountCommands::List { tenant } => cli::accounts::list(tenant.as_deref()),
        },
        Commands::CostCenters { command } => match command {
            CostCenterCommands::Add { code, name, tenant } => {
                cli::cost_centers::add(&code, &name, tenant.as_deref())
            }
            CostCenterCommands::List { tenant } => cli::cost_centers::list(tenant.as_deref()),
        },
        Commands::Lines { command } => match command {
            LineCommands::Add {
                name,
                kind,
                sign,
                parent,
                order,
                base,
                tenant,
            } => cli::lines::add(&name, &kind, sign, parent, order, base, tenant.as_deref()),
            LineCommands::List { tenant } => cli::lines::list(tenant.as_deref()),
            LineCommands::Map {
                account,
                line,
                tenant,
            } => cli::lines::map(&account, line, tenant.as_deref()),
        },
        Commands::Import { command } => match command {
            ImportCommands::Entries {
                file,
                mapping,
                audit,
                tenant,
            } => cli::import::entries(&file, mapping.as_deref(), audit.as_deref(), tenant.as_deref()),
            ImportCommands::Balances {
                file,
                year,
                mapping,
                audit,
                tenant,
            } => cli::import::balances(
                &file,
                year,
                mapping.as_deref(),
                audit.as_deref(),
                tenant.as_deref(),
            ),
        },
        Commands::Report { command } => match command {
            ReportCommands::Dre {
                years,
                role,
                vertical,
                horizontal,
                tenant,
            } => cli::report::dre(&years, &role, vertical, horizontal, tenant.as_deref()),
        },
        Commands::Closing { command } => match command {
            ClosingCommands::Set {
                year,
                month,
                tenant,
            } => cli::closing::set(year, &month, tenant.as_deref()),
            ClosingCommands::Show { tenant } => cli::closing::show(tenant.as_deref()),
        },
        Commands::Status { tenant } => cli::status::run(tenant.as_deref()),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
