use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::client::Client;
use crate::config::ExportConfig;
use crate::error::{ApiError, ExportError, WriteError};
use crate::models::{Credentials, Session, Station};
use crate::util::is_safe_file_stem;
use crate::window::HistoryWindow;

/// Everything one export run needs, built once per invocation.
#[derive(Debug)]
pub struct RunContext<'a> {
    client: &'a Client,
    output_dir: PathBuf,
    window: HistoryWindow,
    progress: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(client: &'a Client, config: &ExportConfig, today: NaiveDate) -> Self {
        Self {
            client,
            output_dir: config.output_dir.clone(),
            window: HistoryWindow::ending_before(today),
            progress: config.progress,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub user_id: String,
    pub window: HistoryWindow,
    /// One path per station, in listing order.
    pub files: Vec<PathBuf>,
}

/// Runs the export: login, account lookup, station listing, history per station, write.
///
/// Steps run strictly in that order. The first failure aborts the run with its category;
/// nothing after it is attempted.
pub fn run(ctx: &RunContext<'_>, credentials: &Credentials) -> Result<ExportSummary, ExportError> {
    let session = ctx
        .client
        .authenticate(credentials)
        .map_err(ExportError::Authentication)?;

    let user_id = ctx
        .client
        .current_user(&session)
        .map_err(ExportError::UserInfo)?;

    let mut stations = ctx
        .client
        .stations(&session)
        .map_err(ExportError::StationData)?;
    info!(count = stations.len(), "found stations");

    attach_history(ctx, &session, &mut stations)?;

    let files = write_stations(&ctx.output_dir, &stations).map_err(ExportError::FileWrite)?;
    info!(
        files = files.len(),
        dir = %ctx.output_dir.display(),
        "export complete"
    );

    Ok(ExportSummary {
        user_id,
        window: ctx.window,
        files,
    })
}

fn attach_history(
    ctx: &RunContext<'_>,
    session: &Session,
    stations: &mut [Station],
) -> Result<(), ExportError> {
    let pb = progress_bar(stations.len(), ctx.progress);
    fetch_each(stations, &pb, |station| {
        ctx.client.history(session, &station.id, &ctx.window)
    })
    .map_err(ExportError::HistoricalData)
}

fn progress_bar(len: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    ProgressBar::new(len as u64)
        .with_style(
            ProgressStyle::with_template("{spinner:.green} {pos}/{len} stations {wide_bar} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        )
        .with_finish(ProgressFinish::AndClear)
}

/// Attaches `fetch`'s result to each station in order, stopping at the first error.
///
/// The bar is cleared either way, so nothing is left above the error line.
fn fetch_each<F>(stations: &mut [Station], pb: &ProgressBar, mut fetch: F) -> Result<(), ApiError>
where
    F: FnMut(&Station) -> Result<Value, ApiError>,
{
    for station in stations.iter_mut() {
        pb.set_message(station.name.clone());
        match fetch(station) {
            Ok(history) => station.historical_data = Some(history),
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(())
}

/// Writes each station to `<dir>/<id>.json`, creating `dir` if needed.
///
/// Existing files are overwritten. On failure, files already written stay on disk.
pub fn write_stations(dir: &Path, stations: &[Station]) -> Result<Vec<PathBuf>, WriteError> {
    std::fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(stations.len());
    for station in stations {
        if !is_safe_file_stem(&station.id) {
            return Err(WriteError::InvalidStationId(station.id.clone()));
        }
        let path = dir.join(format!("{}.json", station.id));

        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        station
            .serialize(&mut ser)
            .map_err(|source| WriteError::Encode {
                id: station.id.clone(),
                source,
            })?;

        std::fs::write(&path, &buf).map_err(|source| WriteError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(station_id = %station.id, path = %path.display(), "wrote station");
        written.push(path);
    }

    Ok(written)
}
