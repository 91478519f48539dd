// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod render;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use fitdash_api::Client;
use fitdash_app::{
    DateRange, DateRangeForm, FilterPatch, GymPhotoRow, ListCommand, ListController, ListEvent,
    ListKind, ListRow, MetricBoard, MetricCommand, MetricKey, PageSize, QueryParams, QuickFilter,
    RevenueRow, SortOrder, UserRow,
};
use fitdash_db::Store;
use runtime::{DashboardRuntime, ListRuntime};
use serde::de::DeserializeOwned;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `fitdash --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_logging(config.log_level());

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open session database {} -- if this path is wrong, set [session].db_path or FITDASH_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let client = Client::new(
        config.api_base_url(),
        config.api_token(),
        config.api_timeout()?,
    )
    .with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    if options.check_only {
        client.ping()?;
        info!(base_url = client.base_url(), "backend reachable");
        return Ok(());
    }

    match options.command {
        Some(Command::List(args)) => match args.kind {
            ListKind::Users => run_list::<UserRow>(&args, &config, &client, &mut store),
            ListKind::GymPhotos => run_list::<GymPhotoRow>(&args, &config, &client, &mut store),
            ListKind::Revenue => run_list::<RevenueRow>(&args, &config, &client, &mut store),
        },
        Some(Command::Dashboard(args)) => run_dashboard(&args, &client),
        None => bail!("missing command; run with --help to see supported commands"),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_list<R>(args: &ListArgs, config: &Config, client: &Client, store: &mut Store) -> Result<()>
where
    R: ListRow + DeserializeOwned,
{
    let defaults = QueryParams::with_page_size(config.page_size());
    let controller = ListController::<R>::new(
        args.kind,
        args.initial_params(defaults),
        config.search_debounce()?,
    );
    let mut endpoint = client.endpoint::<R>(args.kind);
    let mut runtime = ListRuntime::new(controller, &mut endpoint, store, config.session_id());
    mount_list(&mut runtime, args);

    if let Some(row_id) = args.open {
        let row = runtime
            .controller()
            .items()
            .iter()
            .find(|row| row.row_id() == row_id)
            .ok_or_else(|| {
                anyhow!(
                    "row {row_id} is not on page {} of {}; narrow the list with --search or --page",
                    runtime.controller().page(),
                    args.kind.as_str()
                )
            })?;
        let detail = render::row_detail(args.kind, row);
        runtime.dispatch(ListCommand::PrepareForDetailNavigation {
            row_id: Some(row_id),
        });
        print!("{detail}");
        return Ok(());
    }

    print!("{}", render::table(args.kind, &runtime.controller().view()));
    debug!(
        list = args.kind.as_str(),
        fetches = runtime.fetches(),
        "list settled"
    );
    runtime.dispatch(ListCommand::Unmount);
    Ok(())
}

/// Mounts with the flags already folded into the first fetch. A returning
/// snapshot replaces those params on mount, so the flags are replayed on top
/// of the restored state.
fn mount_list<R>(runtime: &mut ListRuntime<'_, R>, args: &ListArgs) {
    if !runtime.mount().contains(&ListEvent::Restored) {
        return;
    }
    if !args.patch.is_empty() {
        runtime.dispatch(ListCommand::SetFilter(args.patch.clone()));
    }
    if let Some(page_size) = args.page_size {
        runtime.dispatch(ListCommand::SetPageSize(page_size));
    }
    if let Some(sort) = args.sort
        && sort != runtime.controller().params().sort_order
    {
        runtime.dispatch(ListCommand::ToggleSort);
    }
    if let Some(page) = args.page {
        runtime.dispatch(ListCommand::SetPage(page));
        if runtime.controller().page() != page {
            warn!(
                list = args.kind.as_str(),
                requested = page,
                shown = runtime.controller().page(),
                "requested page is out of range"
            );
        }
    }
}

fn run_dashboard(args: &DashboardArgs, client: &Client) -> Result<()> {
    let mut source = client.clone();
    let mut runtime = DashboardRuntime::new(MetricBoard::new(args.filter), &mut source);
    runtime.dispatch(MetricCommand::Mount);

    for (metric, filter) in &args.metric_filters {
        runtime.dispatch(MetricCommand::SetQuickFilter {
            metric: *metric,
            filter: *filter,
        });
    }
    for (metric, range) in &args.custom {
        runtime.dispatch(MetricCommand::OpenCustomRange(*metric));
        runtime.dispatch(MetricCommand::SetPickerStart(Some(range.start())));
        runtime.dispatch(MetricCommand::SetPickerEnd(Some(range.end())));
        runtime.dispatch(MetricCommand::ApplyCustomRange);
    }

    print!("{}", render::cards(&runtime.board().cards()));
    runtime.dispatch(MetricCommand::Unmount);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List(ListArgs),
    Dashboard(DashboardArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListArgs {
    kind: ListKind,
    patch: FilterPatch,
    page: Option<u32>,
    page_size: Option<PageSize>,
    sort: Option<SortOrder>,
    open: Option<i64>,
}

impl ListArgs {
    fn new(kind: ListKind) -> Self {
        Self {
            kind,
            patch: FilterPatch::default(),
            page: None,
            page_size: None,
            sort: None,
            open: None,
        }
    }

    /// Params for the mount fetch. A page past the end is clamped once the
    /// first response reports the total.
    fn initial_params(&self, defaults: QueryParams) -> QueryParams {
        let mut params = self.patch.apply_to(&defaults);
        if let Some(page_size) = self.page_size {
            params.page_size = page_size;
        }
        if let Some(sort) = self.sort {
            params.sort_order = sort;
        }
        if let Some(page) = self.page {
            params.page = page;
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DashboardArgs {
    filter: QuickFilter,
    metric_filters: Vec<(MetricKey, QuickFilter)>,
    custom: Vec<(MetricKey, DateRange)>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };

    let args: Vec<String> = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect();
    let mut iter = args.iter().map(String::as_str);
    while let Some(arg) = iter.next() {
        match arg {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "dashboard" => {
                let rest: Vec<&str> = iter.by_ref().collect();
                options.command = Some(Command::Dashboard(parse_dashboard_args(&rest)?));
            }
            other => {
                if let Some(kind) = ListKind::parse(other) {
                    let rest: Vec<&str> = iter.by_ref().collect();
                    options.command = Some(Command::List(parse_list_args(kind, &rest)?));
                } else {
                    bail!("unknown argument {other:?}; run with --help to see supported options");
                }
            }
        }
    }

    Ok(options)
}

fn parse_list_args(kind: ListKind, args: &[&str]) -> Result<ListArgs> {
    let mut parsed = ListArgs::new(kind);
    let mut from = None;
    let mut to = None;

    let mut iter = args.iter().copied();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg {
            "--search" => {
                parsed.patch.search = Some(value("--search")?.to_owned());
            }
            "--filter" => {
                let (key, filter_value) = split_pair(value("--filter")?, "--filter", "key=value")?;
                validate_filter(kind, key, filter_value)?;
                parsed.patch = parsed.patch.and_filter(key, filter_value);
            }
            "--from" => from = Some(value("--from")?),
            "--to" => to = Some(value("--to")?),
            "--page" => {
                let raw = value("--page")?;
                let page: u32 = raw
                    .parse()
                    .ok()
                    .filter(|page| *page >= 1)
                    .ok_or_else(|| anyhow!("--page must be a positive integer, got {raw:?}"))?;
                parsed.page = Some(page);
            }
            "--page-size" => {
                let raw = value("--page-size")?;
                let page_size = raw
                    .parse()
                    .ok()
                    .and_then(PageSize::new)
                    .ok_or_else(|| {
                        anyhow!(
                            "--page-size must be one of {:?}, got {raw:?}",
                            PageSize::ALLOWED
                        )
                    })?;
                parsed.page_size = Some(page_size);
            }
            "--sort" => {
                let raw = value("--sort")?;
                parsed.sort = Some(
                    SortOrder::parse(raw)
                        .ok_or_else(|| anyhow!("--sort must be asc or desc, got {raw:?}"))?,
                );
            }
            "--open" => {
                let raw = value("--open")?;
                parsed.open = Some(
                    raw.parse()
                        .with_context(|| format!("--open expects a row id, got {raw:?}"))?,
                );
            }
            unknown => {
                bail!(
                    "unknown {} option {unknown:?}; run with --help to see supported options",
                    kind.as_str()
                );
            }
        }
    }

    if from.is_some() || to.is_some() {
        if !kind.filter_keys().contains(&"date_filter") {
            bail!("{} does not support --from/--to", kind.as_str());
        }
        let range = DateRangeForm::from_inputs(from.unwrap_or(""), to.unwrap_or(""))?
            .validate()
            .context("--from/--to")?;
        parsed.patch.date_range = Some(Some(range));
    }

    Ok(parsed)
}

fn parse_dashboard_args(args: &[&str]) -> Result<DashboardArgs> {
    let mut parsed = DashboardArgs {
        filter: QuickFilter::default(),
        metric_filters: Vec::new(),
        custom: Vec::new(),
    };

    let mut iter = args.iter().copied();
    while let Some(arg) = iter.next() {
        match arg {
            "--filter" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires a value"))?;
                match raw.split_once('=') {
                    Some(_) => {
                        let (metric, filter) = split_pair(raw, "--filter", "metric=filter")?;
                        parsed
                            .metric_filters
                            .push((parse_metric(metric)?, parse_quick_filter(filter)?));
                    }
                    None => parsed.filter = parse_quick_filter(raw)?,
                }
            }
            "--custom" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow!("--custom requires metric=start..end"))?;
                let (metric, range) = split_pair(raw, "--custom", "metric=start..end")?;
                let (start, end) = range.split_once("..").ok_or_else(|| {
                    anyhow!("--custom range {range:?} must look like 2026-03-01..2026-03-31")
                })?;
                let range = DateRangeForm::from_inputs(start, end)?
                    .validate()
                    .with_context(|| format!("--custom {raw}"))?;
                parsed.custom.push((parse_metric(metric)?, range));
            }
            unknown => {
                bail!("unknown dashboard option {unknown:?}; run with --help to see supported options");
            }
        }
    }

    Ok(parsed)
}

fn split_pair<'a>(raw: &'a str, flag: &str, shape: &str) -> Result<(&'a str, &'a str)> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| anyhow!("{flag} expects {shape}, got {raw:?}"))
}

fn validate_filter(kind: ListKind, key: &str, value: &str) -> Result<()> {
    if !kind.filter_keys().contains(&key) {
        bail!(
            "{} cannot be filtered by {key:?}; supported keys: {}",
            kind.as_str(),
            kind.filter_keys().join(", ")
        );
    }
    if key == "date_filter" {
        parse_quick_filter(value)?;
    }
    Ok(())
}

fn parse_quick_filter(raw: &str) -> Result<QuickFilter> {
    QuickFilter::parse(raw).ok_or_else(|| {
        anyhow!("unknown date filter {raw:?}; use one of: today, week, month, overall")
    })
}

fn parse_metric(raw: &str) -> Result<MetricKey> {
    MetricKey::parse(raw).ok_or_else(|| {
        let names: Vec<&str> = MetricKey::ALL.iter().map(|metric| metric.as_str()).collect();
        anyhow!("unknown metric {raw:?}; use one of: {}", names.join(", "))
    })
}

fn print_help() {
    println!("fitdash: admin dashboard lists and metrics");
    println!();
    println!("usage: fitdash [options] <command> [command options]");
    println!();
    println!("commands:");
    println!("  users | gym-photos | revenue");
    println!("      --search <text>          Search text");
    println!("      --filter <key=value>     Filter (repeatable)");
    println!("      --from <date> --to <date>  Custom date range (YYYY-MM-DD)");
    println!("      --page <n>               Page number");
    println!("      --page-size <n>          Rows per page: 5, 10, 20, or 50");
    println!("      --sort <asc|desc>        Sort order");
    println!("      --open <row-id>          Show one row and remember the list for return");
    println!("  dashboard");
    println!("      --filter <filter>        Quick filter for every card: today, week, month, overall");
    println!("      --filter <metric=filter> Quick filter for one card");
    println!("      --custom <metric=start..end>  Custom range for one card");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved session database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config, database, and backend reachability");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Command, DashboardArgs, ListArgs, mount_list, parse_cli_args};
    use crate::runtime::ListRuntime;
    use anyhow::{Result, anyhow};
    use fitdash_app::{
        DEFAULT_SEARCH_DEBOUNCE, DateRange, FilterPatch, ListCommand, ListController, ListKind,
        MemorySnapshotStore, MetricKey, PageSize, QueryParams, QuickFilter, SortOrder, UserRow,
        parse_date,
    };
    use fitdash_testkit::{FitnessFaker, ScriptedListSource};
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/fitdash-config.toml")
    }

    fn list_args(args: Vec<&str>) -> Result<ListArgs> {
        match parse_cli_args(args, default_options_path())?.command {
            Some(Command::List(list)) => Ok(list),
            other => anyhow::bail!("expected list command, got {other:?}"),
        }
    }

    fn dashboard_args(args: Vec<&str>) -> Result<DashboardArgs> {
        match parse_cli_args(args, default_options_path())?.command {
            Some(Command::Dashboard(dashboard)) => Ok(dashboard),
            other => anyhow::bail!("expected dashboard command, got {other:?}"),
        }
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_db_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                command: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml", "users"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(
            options.command,
            Some(Command::List(ListArgs::new(ListKind::Users)))
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_db_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        assert!(parse_cli_args(vec!["--help"], default_options_path())?.show_help);
        assert!(parse_cli_args(vec!["-h"], default_options_path())?.show_help);
        Ok(())
    }

    #[test]
    fn list_flags_build_one_patch() -> Result<()> {
        let args = list_args(vec![
            "revenue",
            "--search",
            "asha",
            "--filter",
            "plan=gold",
            "--from",
            "2026-03-01",
            "--to",
            "2026-03-31",
            "--page-size",
            "20",
            "--sort",
            "asc",
            "--page",
            "2",
        ])?;
        let range = DateRange::new(parse_date("2026-03-01")?, parse_date("2026-03-31")?);
        let mut expected = FilterPatch::search("asha").and_filter("plan", "gold");
        expected.date_range = Some(range);
        assert_eq!(args.kind, ListKind::Revenue);
        assert_eq!(args.patch, expected);
        assert_eq!(args.page_size, PageSize::new(20));
        assert_eq!(args.sort, Some(SortOrder::Asc));
        assert_eq!(args.page, Some(2));
        Ok(())
    }

    #[test]
    fn list_filter_keys_are_checked_per_list() -> Result<()> {
        let args = list_args(vec!["gym-photos", "--filter", "gym_id=4", "--open", "12"])?;
        assert_eq!(args.patch, FilterPatch::filter("gym_id", "4"));
        assert_eq!(args.open, Some(12));

        let error = list_args(vec!["users", "--filter", "gym_id=4"])
            .expect_err("users have no gym filter");
        assert!(error.to_string().contains("supported keys: plan, date_filter"));

        let error = list_args(vec!["users", "--filter", "date_filter=yesterday"])
            .expect_err("unknown quick filter");
        assert!(error.to_string().contains("today, week, month, overall"));
        Ok(())
    }

    #[test]
    fn list_range_must_be_complete_and_ordered() {
        let error = list_args(vec!["users", "--from", "2026-03-01"])
            .expect_err("missing end date");
        assert!(format!("{error:#}").contains("pick an end date"));

        let error = list_args(vec!["users", "--from", "2026-03-31", "--to", "2026-03-01"])
            .expect_err("reversed range");
        assert!(format!("{error:#}").contains("is after end date"));

        let error = list_args(vec!["gym-photos", "--from", "2026-03-01", "--to", "2026-03-02"])
            .expect_err("gym photos have no date range");
        assert!(error.to_string().contains("does not support --from/--to"));
    }

    #[test]
    fn list_rejects_bad_paging_values() {
        let error = list_args(vec!["users", "--page-size", "15"]).expect_err("15 is not allowed");
        assert!(error.to_string().contains("[5, 10, 20, 50]"));

        let error = list_args(vec!["users", "--page", "0"]).expect_err("page 0 is invalid");
        assert!(error.to_string().contains("positive integer"));

        let error = list_args(vec!["users", "--sort", "up"]).expect_err("bad sort");
        assert!(error.to_string().contains("asc or desc"));
    }

    #[test]
    fn dashboard_flags_parse_filters_and_custom_ranges() -> Result<()> {
        let args = dashboard_args(vec![
            "dashboard",
            "--filter",
            "week",
            "--filter",
            "gyms=today",
            "--custom",
            "revenue=2026-03-01..2026-03-31",
        ])?;
        let range = DateRange::new(parse_date("2026-03-01")?, parse_date("2026-03-31")?)
            .ok_or_else(|| anyhow::anyhow!("valid range"))?;
        assert_eq!(
            args,
            DashboardArgs {
                filter: QuickFilter::Week,
                metric_filters: vec![(MetricKey::Gyms, QuickFilter::Today)],
                custom: vec![(MetricKey::Revenue, range)],
            }
        );
        Ok(())
    }

    #[test]
    fn dashboard_rejects_unknown_metric_and_bad_range() {
        let error = dashboard_args(vec!["dashboard", "--custom", "visits=2026-03-01..2026-03-02"])
            .expect_err("unknown metric");
        assert!(error.to_string().contains("unknown metric"));

        let error = dashboard_args(vec!["dashboard", "--custom", "revenue=2026-03-01"])
            .expect_err("range without separator");
        assert!(error.to_string().contains("2026-03-01..2026-03-31"));
    }

    fn users_controller(args: &ListArgs) -> ListController<UserRow> {
        ListController::new(
            args.kind,
            args.initial_params(QueryParams::default()),
            DEFAULT_SEARCH_DEBOUNCE,
        )
    }

    #[test]
    fn list_flags_fold_into_the_mount_fetch() -> Result<()> {
        let args = list_args(vec![
            "users",
            "--filter",
            "plan=gold",
            "--page-size",
            "20",
            "--sort",
            "asc",
            "--page",
            "1",
        ])?;
        let mut faker = FitnessFaker::new(5);
        let mut source = ScriptedListSource::new(faker.users(60));
        let mut store = MemorySnapshotStore::new();
        {
            let mut runtime =
                ListRuntime::new(users_controller(&args), &mut source, &mut store, "default");
            mount_list(&mut runtime, &args);
            assert_eq!(runtime.fetches(), 1);
        }

        let sent = &source.requests()[0];
        assert_eq!(sent.filters.get("plan").map(String::as_str), Some("gold"));
        assert_eq!(sent.page_size, PageSize::new(20).ok_or_else(|| anyhow!("size"))?);
        assert_eq!(sent.sort_order, SortOrder::Asc);
        assert_eq!(sent.page, 1);
        Ok(())
    }

    #[test]
    fn page_past_the_end_is_clamped_after_mount() -> Result<()> {
        let args = list_args(vec!["users", "--page", "9"])?;
        let mut faker = FitnessFaker::new(5);
        let mut source = ScriptedListSource::new(faker.users(23));
        let mut store = MemorySnapshotStore::new();
        let mut runtime =
            ListRuntime::new(users_controller(&args), &mut source, &mut store, "default");
        mount_list(&mut runtime, &args);

        assert_eq!(runtime.controller().page(), 3);
        assert_eq!(runtime.controller().items().len(), 3);
        assert_eq!(runtime.fetches(), 2);
        Ok(())
    }

    #[test]
    fn list_flags_apply_on_top_of_restored_state() -> Result<()> {
        let mut faker = FitnessFaker::new(5);
        let mut source = ScriptedListSource::new(faker.users(40));
        let mut store = MemorySnapshotStore::new();
        {
            let plain = ListArgs::new(ListKind::Users);
            let mut runtime =
                ListRuntime::new(users_controller(&plain), &mut source, &mut store, "default");
            mount_list(&mut runtime, &plain);
            runtime.dispatch(ListCommand::SetPage(3));
            runtime.dispatch(ListCommand::PrepareForDetailNavigation { row_id: None });
        }

        let args = list_args(vec!["users", "--sort", "asc"])?;
        let mut runtime =
            ListRuntime::new(users_controller(&args), &mut source, &mut store, "default");
        mount_list(&mut runtime, &args);
        assert_eq!(runtime.controller().page(), 3);
        assert_eq!(runtime.controller().params().sort_order, SortOrder::Asc);
        assert_eq!(runtime.fetches(), 2);
        Ok(())
    }
}
