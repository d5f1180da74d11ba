pub mod accounts;
pub mod closing;
pub mod companies;
pub mod cost_centers;
pub mod demo;
pub mod import;
pub mod init;
pub mod lines;
pub mod report;
pub mod status;
pub mod tenants;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db;
use crate::error::{ContabilError, Result};
use crate::models::Tenant;
use crate::settings::load_settings;

#[derive(Parser)]
#[command(name = "contabil", about = "Multi-tenant accounting imports and DRE reporting.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up contabil: choose a data directory and initialize the database.
    Init {
        /// Path for contabil data (default: ~/Documents/contabil)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage tenants.
    Tenants {
        #[command(subcommand)]
        command: TenantCommands,
    },
    /// Manage companies for a tenant.
    Companies {
        #[command(subcommand)]
        command: CompanyCommands,
    },
    /// Manage the chart of accounts for a tenant.
    Accounts {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Manage cost centers for a tenant.
    CostCenters {
        #[command(subcommand)]
        command: CostCenterCommands,
    },
    /// Manage DRE report lines and account mappings.
    Lines {
        #[command(subcommand)]
        command: LineCommands,
    },
    /// Import spreadsheets (accounting entries or monthly balances).
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Manage the period closing lock.
    Closing {
        #[command(subcommand)]
        command: ClosingCommands,
    },
    /// Show record counts for a tenant.
    Status {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Seed a sample tenant with companies, accounts and a DRE structure.
    Demo,
}

#[derive(Subcommand)]
pub enum TenantCommands {
    /// Add a new tenant.
    Add {
        /// Tenant name, e.g. 'matriz'
        name: String,
    },
    /// List all tenants with their closing locks.
    List,
    /// Set the default tenant used when --tenant is omitted.
    Use { name: String },
}

#[derive(Subcommand)]
pub enum CompanyCommands {
    /// Add a company.
    Add {
        /// Company name
        name: String,
        /// CNPJ (formatting is ignored on lookup)
        #[arg(long)]
        cnpj: Option<String>,
        /// ERP company code
        #[arg(long = "erp")]
        erp_code: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// List all companies.
    List {
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Add an account to the chart.
    Add {
        /// Account code, e.g. 341101
        code: String,
        /// Account name
        name: String,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// List the chart of accounts.
    List {
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CostCenterCommands {
    /// Add a cost center.
    Add {
        /// Cost center code, e.g. ADM
        code: String,
        /// Cost center name
        name: String,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// List cost centers.
    List {
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LineCommands {
    /// Add a report line.
    Add {
        /// Line name, e.g. 'RECEITA LIQUIDA'
        name: String,
        /// Line kind: data_bucket, header, total
        #[arg(long, default_value = "data_bucket")]
        kind: String,
        /// Contribution sign toward the parent: 1 or -1
        #[arg(long, default_value = "1")]
        sign: i64,
        /// Parent line id
        #[arg(long)]
        parent: Option<i64>,
        /// Display order among siblings
        #[arg(long, default_value = "0")]
        order: i64,
        /// Use this line as the vertical-analysis base
        #[arg(long)]
        base: bool,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// List report lines as an indented tree.
    List {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Map an account code to a report line.
    Map {
        /// Account code
        account: String,
        /// Report line id
        line: i64,
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import an accounting-entry spreadsheet (CSV/XLSX).
    Entries {
        /// Path to the spreadsheet
        file: String,
        /// JSON field-mapping file (defaults match the standard export)
        #[arg(long)]
        mapping: Option<String>,
        /// Write the audit log to this path
        #[arg(long)]
        audit: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Import a monthly trial-balance spreadsheet (CSV/XLSX).
    Balances {
        /// Path to the spreadsheet
        file: String,
        /// Fiscal year the month columns belong to
        #[arg(long)]
        year: i32,
        /// JSON field-mapping file
        #[arg(long)]
        mapping: Option<String>,
        /// Write the audit log to this path
        #[arg(long)]
        audit: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Hierarchical DRE with optional vertical/horizontal analysis.
    Dre {
        /// Fiscal year (repeatable)
        #[arg(long = "year")]
        years: Vec<i32>,
        /// Caller role: administrador, gerente, analista, leitor
        #[arg(long, default_value = "administrador")]
        role: String,
        /// Add a vertical-analysis column per period
        #[arg(long)]
        vertical: bool,
        /// Add a horizontal-analysis column per period
        #[arg(long)]
        horizontal: bool,
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClosingCommands {
    /// Set the closing lock to a period.
    Set {
        #[arg(long)]
        year: i32,
        /// Month name, e.g. JUNHO
        #[arg(long)]
        month: String,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Show the current closing lock.
    Show {
        #[arg(long)]
        tenant: Option<String>,
    },
}

/// Resolve the target tenant: an explicit --tenant wins, otherwise the
/// default from settings. No default configured is an error, not a guess.
pub fn resolve_tenant(conn: &Connection, name: Option<&str>) -> Result<Tenant> {
    let name = match name {
        Some(n) => n.to_string(),
        None => {
            let settings = load_settings();
            if settings.default_tenant.is_empty() {
                return Err(ContabilError::UnknownTenant(
                    "nenhum tenant informado (use --tenant ou 'tenants use')".to_string(),
                ));
            }
            settings.default_tenant
        }
    };
    db::get_tenant(conn, &name)?.ok_or(ContabilError::UnknownTenant(name))
}
