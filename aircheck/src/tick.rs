use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use api::source::{repair_status_body, IceStatus, Source};

use crate::config::SourcePoll;
use crate::error::AppError;
use crate::result::Result;
use crate::service::status::StatusService;
use crate::session::{Session, SessionContext};

/// The orchestrator loop: poll the broadcast status, diff against the active
/// sessions, spawn and reap, publish status. A failed cycle is logged and the
/// loop carries on after the normal delay; it never terminates the daemon.
pub async fn source_check(
    ctx: SessionContext,
    client: reqwest::Client,
    mut done_rx: mpsc::UnboundedReceiver<String>,
) {
    // Rows left over from a previous run would read as live recordings.
    if let Err(e) = StatusService::clear(&ctx.db).await {
        error!("failed to clear stale recording status: {:?}", e);
    }

    let mut active: HashMap<String, Arc<Session>> = HashMap::new();
    loop {
        if let Err(e) = do_source_check(&ctx, &client, &mut active, &mut done_rx).await {
            error!("source check cycle failed: {:?}", e);
        }

        let timeout = tokio::time::sleep(Duration::from_millis(
            ctx.config.source.check_tick_time.0,
        ));
        tokio::pin!(timeout);
        let _ = timeout.as_mut().await;
    }
}

async fn do_source_check(
    ctx: &SessionContext,
    client: &reqwest::Client,
    active: &mut HashMap<String, Arc<Session>>,
    done_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    let mut changed = false;

    // Completed sessions hand their host back over the channel; the map is
    // only ever touched from this task. A message from a session that was
    // reaped earlier must not evict a newer session for the same host, so
    // only entries that have actually stopped are removed.
    while let Ok(host) = done_rx.try_recv() {
        if active.get(&host).is_some_and(|s| s.recording_stopped()) {
            active.remove(&host);
            info!("session for {host} completed");
            changed = true;
        }
    }

    let (endpoint, sources) = fetch_sources(client, &ctx.config.source).await?;

    let active_hosts: HashSet<String> = active.keys().cloned().collect();
    let plan = plan_cycle(&active_hosts, &sources);

    for source in plan.to_start {
        let session = Arc::new(Session::new(
            &endpoint,
            source,
            Path::new(&ctx.config.recorder.working_dir),
        ));
        info!(host = %session.host, description = %session.description, "recording starting");
        session.start(ctx.clone());
        active.insert(session.host.clone(), session);
        changed = true;
    }

    // Reaping is bookkeeping only: the capture process keeps running until
    // its upstream ends, and the session finalizes itself when it does.
    for host in plan.to_reap {
        active.remove(&host);
        info!("{host} left the source list, reaping session");
        changed = true;
    }

    if active.is_empty() {
        if changed {
            StatusService::clear(&ctx.db).await?;
        }
    } else {
        let entries: Vec<_> = active.values().map(|s| s.status_entry()).collect();
        StatusService::publish(&ctx.db, &entries).await?;
    }

    Ok(())
}

struct CyclePlan<'a> {
    to_start: Vec<&'a Source>,
    to_reap: Vec<String>,
}

fn plan_cycle<'a>(active: &HashSet<String>, sources: &'a [Source]) -> CyclePlan<'a> {
    let mut seen = HashSet::new();
    let mut to_start = Vec::new();
    for source in sources {
        let host = source.host();
        if !seen.insert(host.to_string()) {
            continue;
        }
        if active.contains(host) || !is_eligible(source) {
            continue;
        }
        to_start.push(source);
    }

    let live: HashSet<&str> = sources.iter().map(|s| s.host()).collect();
    let to_reap = active
        .iter()
        .filter(|host| !live.contains(host.as_str()))
        .cloned()
        .collect();

    CyclePlan { to_start, to_reap }
}

/// Test streams and private broadcasts are never recorded.
fn is_eligible(source: &Source) -> bool {
    let host = source.host().to_lowercase();
    let description = source.description().to_lowercase();
    if host.contains("test") || description.contains("test") {
        return false;
    }
    if source.is_private.unwrap_or(false) {
        return false;
    }
    if source.genre().to_lowercase().contains("private") {
        return false;
    }
    if ["private", "priv", "prv"].iter().any(|p| host.contains(p)) {
        return false;
    }
    true
}

async fn fetch_sources(
    client: &reqwest::Client,
    cfg: &SourcePoll,
) -> Result<(String, Vec<Source>)> {
    for endpoint in &cfg.endpoints {
        match fetch_one(client, endpoint).await {
            Ok(sources) => return Ok((endpoint.clone(), sources)),
            Err(e) => warn!("status fetch from {endpoint} failed: {:?}", e),
        }
    }
    Err(AppError::fetch_failed("all status endpoints failed"))
}

async fn fetch_one(client: &reqwest::Client, endpoint: &str) -> Result<Vec<Source>> {
    let url = format!("{}/status-json.xsl", endpoint.trim_end_matches('/'));
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(AppError::fetch_failed)?;
    if !response.status().is_success() {
        return Err(AppError::fetch_failed(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }
    let body = response.text().await.map_err(AppError::fetch_failed)?;
    let status: IceStatus = serde_json::from_str(&repair_status_body(&body))
        .map_err(|e| AppError::fetch_failed(format!("malformed status body: {e}")))?;
    Ok(status.sources())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(host: &str, description: &str) -> Source {
        Source {
            listenurl: format!("http://example.org:8000/{host}"),
            server_description: Some(description.to_string()),
            genre: None,
            title: None,
            is_private: None,
        }
    }

    fn hosts<'a>(plan: &CyclePlan<'a>) -> Vec<&'a str> {
        plan.to_start.iter().map(|s| s.host()).collect()
    }

    #[test]
    fn filters_test_streams() {
        assert!(is_eligible(&source("pineland", "Sunday Service")));
        assert!(!is_eligible(&source("TestStream", "Sunday Service")));
        assert!(!is_eligible(&source("pineland", "just TESTING the mics")));
    }

    #[test]
    fn filters_private_streams() {
        let mut flagged = source("pineland", "Sunday Service");
        flagged.is_private = Some(true);
        assert!(!is_eligible(&flagged));

        let mut genre = source("pineland", "Sunday Service");
        genre.genre = Some("Private singing".to_string());
        assert!(!is_eligible(&genre));

        assert!(!is_eligible(&source("prv_pineland", "Sunday Service")));
        assert!(!is_eligible(&source("privateland", "Sunday Service")));
    }

    #[test]
    fn starts_only_new_eligible_hosts() {
        let active: HashSet<String> = ["pineland".to_string()].into();
        let sources = vec![
            source("pineland", "Sunday Service"),
            source("newdale", "Evening singing"),
            source("test", "Evening singing"),
        ];

        let plan = plan_cycle(&active, &sources);
        assert_eq!(hosts(&plan), vec!["newdale"]);
        assert!(plan.to_reap.is_empty());
    }

    #[test]
    fn reap_is_list_driven() {
        // Cycle 1: /pineland goes live.
        let cycle1 = [source("pineland", "Sunday Service")];
        let plan = plan_cycle(&HashSet::new(), &cycle1);
        assert_eq!(hosts(&plan), vec!["pineland"]);

        // Cycle 2: the source list is empty; the session is reaped whether or
        // not its capture process has exited.
        let active: HashSet<String> = ["pineland".to_string()].into();
        let plan = plan_cycle(&active, &[]);
        assert!(plan.to_start.is_empty());
        assert_eq!(plan.to_reap, vec!["pineland".to_string()]);
    }

    #[test]
    fn duplicate_sources_start_once() {
        let sources = vec![
            source("pineland", "Sunday Service"),
            source("pineland", "Sunday Service"),
        ];
        let plan = plan_cycle(&HashSet::new(), &sources);
        assert_eq!(hosts(&plan), vec!["pineland"]);
    }

    #[test]
    fn active_set_tracks_eligible_live_hosts() {
        let mut active: HashSet<String> = HashSet::new();

        let cycles = vec![
            vec![source("pineland", "Sunday Service")],
            vec![
                source("pineland", "Sunday Service"),
                source("newdale", "Evening singing"),
                source("private_x", "secret"),
            ],
            vec![source("newdale", "Evening singing")],
        ];

        for sources in &cycles {
            let plan = plan_cycle(&active, sources);
            for s in plan.to_start {
                active.insert(s.host().to_string());
            }
            for host in plan.to_reap {
                active.remove(&host);
            }
        }

        assert_eq!(active, ["newdale".to_string()].into());
    }
}
