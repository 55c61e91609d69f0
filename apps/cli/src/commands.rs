use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use devicewatch_openfda::models::{DEFAULT_SEARCH_LIMIT, MAX_LIMIT};
use devicewatch_openfda::{
    EventQuery, FacetField, FdaClient, FetchOutcome, RetryClass, SearchKind,
};
use serde::Serialize;

use crate::config::Config;
use crate::{Cli, Commands};

#[derive(Args)]
pub struct FieldsArgs {
    /// Field to enumerate, e.g. `device.generic_name.exact`.
    pub field: String,

    #[arg(long, short, default_value_t = 100)]
    pub limit: u32,
}

/// Filters with selectable values.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ChoiceKind {
    Manufacturer,
    Model,
    Modality,
    DeviceClass,
}

impl ChoiceKind {
    fn facet_field(self) -> &'static str {
        match self {
            Self::Manufacturer => SearchKind::Manufacturer.facet_field(),
            Self::Model => SearchKind::Model.facet_field(),
            Self::Modality => SearchKind::Modality.facet_field(),
            Self::DeviceClass => FacetField::DEVICE_CLASS,
        }
    }
}

#[derive(Args)]
pub struct ChoicesArgs {
    pub kind: ChoiceKind,

    #[arg(long, short, default_value_t = MAX_LIMIT)]
    pub limit: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SearchBy {
    Manufacturer,
    Model,
    Modality,
}

impl From<SearchBy> for SearchKind {
    fn from(by: SearchBy) -> Self {
        match by {
            SearchBy::Manufacturer => SearchKind::Manufacturer,
            SearchBy::Model => SearchKind::Model,
            SearchBy::Modality => SearchKind::Modality,
        }
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// What `term` names.
    #[arg(long)]
    pub by: SearchBy,

    /// Manufacturer, brand or generic name to match.
    pub term: String,

    /// Restrict to one device class (1, 2, 3, ...).
    #[arg(long)]
    pub device_class: Option<String>,

    #[arg(long, short, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,
}

#[derive(Args)]
pub struct SearchRawArgs {
    /// openFDA search expression, e.g. `device.generic_name:"STENT"`.
    pub expression: String,

    #[arg(long, short, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let client = FdaClient::new(config.fda)?;

    match cli.command {
        Commands::Fields(args) => {
            let outcome = client.fetch_field_values(&args.field, args.limit).await;
            render(outcome, cli.pretty)
        }
        Commands::Choices(args) => {
            let outcome = client
                .fetch_field_values(args.kind.facet_field(), args.limit)
                .await;
            render(outcome, cli.pretty)
        }
        Commands::Search(args) => {
            let mut query = EventQuery::by_kind(args.by.into(), &args.term).with_limit(args.limit);
            if let Some(device_class) = &args.device_class {
                query = query.and_device_class(device_class);
            }
            tracing::info!("Searching events: {}", query.search_expression());
            render(client.search(&query).await, cli.pretty)
        }
        Commands::SearchRaw(args) => {
            let query = EventQuery::raw(args.expression).with_limit(args.limit);
            render(client.search(&query).await, cli.pretty)
        }
    }
}

/// Print a successful payload as JSON; report every other outcome distinctly.
fn render<T: Serialize>(outcome: FetchOutcome<T>, pretty: bool) -> Result<()> {
    let hint = match outcome.retry_class() {
        Some(RetryClass::AfterQuotaReset) => " (daily quota used up, try again tomorrow)",
        Some(RetryClass::WithBackoff) => " (temporary, retry later)",
        Some(RetryClass::Never) | None => "",
    };

    match outcome {
        FetchOutcome::Success(payload) => {
            let json = if pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            println!("{}", json);
            Ok(())
        }
        FetchOutcome::EmptyResult => {
            eprintln!("No matching data.");
            Ok(())
        }
        FetchOutcome::RateLimited(denied) => bail!("Rate limited: {}{}", denied, hint),
        FetchOutcome::HttpError(status) => bail!("openFDA returned HTTP {}{}", status, hint),
        FetchOutcome::ParseError(message) => bail!("Unreadable response: {}{}", message, hint),
        FetchOutcome::TransportError(err) => bail!("Request failed: {}{}", err, hint),
    }
}
