use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listdash_core::dispatch::{self, smtp::SmtpMailTransport, ReportForm};
use listdash_core::domain::criteria::{EtfSelection, FilterCriteria, StatusSelection};
use listdash_core::domain::listing::NumericColumn;
use listdash_core::ingest::Source;
use listdash_core::report::{self, ChartLabels, ATTACHMENT_FILENAME};
use listdash_core::session::Session;

const PASSWORD_ENV: &str = "REPORT_SENDER_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "listdash_worker")]
struct Args {
    /// Listing CSV to load. The bundled fixture is used when omitted.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Exchange to include; repeat for several. Defaults to every exchange in the data.
    #[arg(long = "exchange")]
    exchanges: Vec<String>,

    #[arg(long, default_value = "All")]
    etf: EtfSelection,

    #[arg(long, default_value = "All")]
    status: String,

    /// Numeric column to average per exchange.
    #[arg(long, default_value = "Round Lot Size", value_parser = parse_column)]
    column: NumericColumn,

    /// Defaults to REPORT_SENDER.
    #[arg(long)]
    sender: Option<String>,

    #[arg(long)]
    recipient: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    /// Where the PNG goes on a dry run.
    #[arg(long, default_value = ATTACHMENT_FILENAME)]
    out: PathBuf,

    /// Render the report to --out instead of emailing it.
    #[arg(long)]
    dry_run: bool,
}

fn parse_column(s: &str) -> Result<NumericColumn, String> {
    NumericColumn::from_name(s).ok_or_else(|| {
        format!(
            "unknown column {s:?} (expected {:?} or {:?})",
            NumericColumn::RoundLotSize.name(),
            NumericColumn::MarketCap.name()
        )
    })
}

impl Args {
    fn criteria(&self, session: &Session) -> FilterCriteria {
        let exchanges: BTreeSet<String> = if self.exchanges.is_empty() {
            session.criteria().exchanges.clone()
        } else {
            self.exchanges.iter().cloned().collect()
        };
        FilterCriteria {
            exchanges,
            etf: self.etf,
            status: StatusSelection::from(self.status.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = listdash_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let mut session = match &args.csv {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read {}", path.display()))?;
            Session::open(Source::Upload(&bytes))?
        }
        None => Session::open(Source::Fixture)?,
    };
    session.filters_changed(args.criteria(&session))?;

    let aggregation = session.aggregate(args.column)?;
    let labels = if args.column == NumericColumn::RoundLotSize {
        ChartLabels::round_lot_report()
    } else {
        ChartLabels {
            title: format!("Avg {} by Exchange", args.column),
            x_label: "Exchange".to_string(),
            y_label: args.column.to_string(),
        }
    };
    let artifact = report::render_bar_chart(&aggregation, &labels)?;

    tracing::info!(
        records = session.filtered().len(),
        groups = aggregation.len(),
        column = %args.column,
        "report rendered"
    );

    if args.dry_run {
        std::fs::write(&args.out, artifact.bytes())
            .with_context(|| format!("write {}", args.out.display()))?;
        tracing::info!(out = %args.out.display(), dry_run = true, "report written");
        return Ok(());
    }

    let sender = args
        .sender
        .clone()
        .or_else(|| settings.report_sender.clone())
        .context("--sender or REPORT_SENDER is required")?;
    let recipient = args.recipient.clone().context("--recipient is required")?;
    let credential = SecretString::from(std::env::var(PASSWORD_ENV).unwrap_or_default());

    let form = ReportForm::new(sender, credential, recipient, args.subject.clone());
    let transport = SmtpMailTransport::from_settings(&settings);

    if let Err(err) =
        dispatch::dispatch_report(&transport, form, artifact, settings.dispatch_timeout).await
    {
        let err = anyhow::Error::new(err);
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }
    Ok(())
}

fn init_sentry(settings: &listdash_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
