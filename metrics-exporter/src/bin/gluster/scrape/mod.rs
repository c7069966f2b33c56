use crate::{
    client::CommandRunner,
    collector::{
        inc_counter, init_counter_vec, init_gauge_vec, mount::MountCollector, peer::PeerCollector,
        profile::ProfileCollector, quota::QuotaCollector, set_gauge, volume::VolumeCollector,
        CollectorKind, ScrapeContext, SubCollector,
    },
    config::ScrapeSettings,
    error::ExporterError,
};
use once_cell::sync::Lazy;
use prometheus::{
    core::{Collector, Desc},
    proto::MetricFamily,
    CounterVec, GaugeVec,
};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Metric sink module.
pub(crate) mod sink;

use sink::MetricSink;

const EXPORTER_SUBSYSTEM: &str = "exporter";

static SCRAPE_COUNTERS: Lazy<ScrapeCounters> = Lazy::new(ScrapeCounters::new);

/// Counters accumulated over the lifetime of the exporter.
#[derive(Clone, Debug)]
pub(crate) struct ScrapeCounters {
    scrapes_total: CounterVec,
    scrape_errors_total: CounterVec,
}

impl ScrapeCounters {
    fn new() -> Self {
        // Registered through the per scrape ExporterCollector, which reports their descriptors.
        let mut descs = Vec::new();
        let scrapes_total = init_counter_vec(
            EXPORTER_SUBSYSTEM,
            "scrapes_total",
            "Total number of times gluster was scraped for metrics.",
            &[],
            &mut descs,
        );
        let scrape_errors_total = init_counter_vec(
            EXPORTER_SUBSYSTEM,
            "scrape_errors_total",
            "Total number of times an error occurred scraping gluster.",
            &["collector"],
            &mut descs,
        );
        Self {
            scrapes_total,
            scrape_errors_total,
        }
    }

    /// The counters shared by every scrape of the process.
    pub(crate) fn global() -> Self {
        SCRAPE_COUNTERS.clone()
    }
}

/// Result of running one collector.
#[derive(Debug)]
pub(crate) struct ScrapeOutcome {
    kind: CollectorKind,
    duration: Duration,
    error: Option<ExporterError>,
    partial_failures: u64,
}

impl ScrapeOutcome {
    fn failures(&self) -> u64 {
        self.partial_failures + u64::from(self.error.is_some())
    }
}

/// Collects the exporter's own metrics of a scrape.
#[derive(Clone, Debug)]
struct ExporterCollector {
    build_info: GaugeVec,
    collector_duration: GaugeVec,
    last_scrape_error: GaugeVec,
    counters: ScrapeCounters,
    descs: Vec<Desc>,
}

impl ExporterCollector {
    fn new(counters: ScrapeCounters) -> Self {
        let mut descs = Vec::new();
        let build_info = init_gauge_vec(
            EXPORTER_SUBSYSTEM,
            "build_info",
            "A metric with a constant '1' value labeled by the version of the exporter.",
            &["version"],
            &mut descs,
        );
        set_gauge(&build_info, &[env!("CARGO_PKG_VERSION")], 1.0);
        let collector_duration = init_gauge_vec(
            EXPORTER_SUBSYSTEM,
            "collector_duration_seconds",
            "Collector time duration.",
            &["collector"],
            &mut descs,
        );
        let last_scrape_error = init_gauge_vec(
            EXPORTER_SUBSYSTEM,
            "last_scrape_error",
            "Whether the last scrape of metrics from Gluster resulted in an error (1 for error, 0 for success).",
            &[],
            &mut descs,
        );
        descs.extend(counters.scrapes_total.desc().into_iter().cloned());
        descs.extend(counters.scrape_errors_total.desc().into_iter().cloned());
        Self {
            build_info,
            collector_duration,
            last_scrape_error,
            counters,
            descs,
        }
    }

    fn record(&self, outcomes: &[ScrapeOutcome]) {
        for outcome in outcomes {
            let collector = outcome.kind.as_ref();
            set_gauge(
                &self.collector_duration,
                &[collector],
                outcome.duration.as_secs_f64(),
            );
            inc_counter(
                &self.counters.scrape_errors_total,
                &[collector],
                outcome.failures() as f64,
            );
        }
        let failed = outcomes.iter().any(|outcome| outcome.error.is_some());
        set_gauge(&self.last_scrape_error, &[], if failed { 1.0 } else { 0.0 });
        inc_counter(&self.counters.scrapes_total, &[], 1.0);
    }
}

impl Collector for ExporterCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut metric_family = self.build_info.collect();
        metric_family.extend(self.collector_duration.collect());
        metric_family.extend(self.last_scrape_error.collect());
        metric_family.extend(self.counters.scrapes_total.collect());
        metric_family.extend(self.counters.scrape_errors_total.collect());
        metric_family
    }
}

/// Runs the enabled collectors of one scrape and merges their samples.
pub(crate) struct Orchestrator<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a ScrapeSettings,
    counters: ScrapeCounters,
}

impl<'a> Orchestrator<'a> {
    pub(crate) fn new(
        runner: &'a dyn CommandRunner,
        settings: &'a ScrapeSettings,
        counters: ScrapeCounters,
    ) -> Self {
        Self {
            runner,
            settings,
            counters,
        }
    }

    /// Runs the volume collector and the enabled optional collectors, in that order.
    /// A failing collector never prevents the others from running.
    pub(crate) async fn scrape(&self) -> Vec<MetricFamily> {
        let sink = MetricSink::new();
        let ctx = ScrapeContext::new(self.runner, self.settings);
        let enabled = self.settings.collectors;

        let mut outcomes = vec![run(&sink, &ctx, VolumeCollector::new()).await];
        if enabled.peer {
            outcomes.push(run(&sink, &ctx, PeerCollector::new()).await);
        }
        if enabled.profile {
            outcomes.push(run(&sink, &ctx, ProfileCollector::new()).await);
        }
        if enabled.quota {
            outcomes.push(run(&sink, &ctx, QuotaCollector::new()).await);
        }
        if enabled.mount {
            outcomes.push(run(&sink, &ctx, MountCollector::new()).await);
        }

        let exporter = ExporterCollector::new(self.counters.clone());
        exporter.record(&outcomes);
        sink.register(EXPORTER_SUBSYSTEM, Box::new(exporter));
        #[cfg(target_os = "linux")]
        sink.register(
            "process",
            Box::new(prometheus::process_collector::ProcessCollector::for_self()),
        );
        sink.gather()
    }
}

/// Scrapes gluster with `collector` and hands it to the sink.
async fn run<C: SubCollector + 'static>(
    sink: &MetricSink,
    ctx: &ScrapeContext<'_>,
    collector: C,
) -> ScrapeOutcome {
    let kind = collector.kind();
    let start = Instant::now();
    let result = collector.scrape(ctx).await;
    let duration = start.elapsed();
    sink.register(kind.as_ref(), Box::new(collector));

    let (error, partial_failures) = match result {
        Ok(partial_failures) => (None, partial_failures),
        Err(error) => {
            error!(%error, collector = kind.as_ref(), "Collector failed");
            (Some(error), 0)
        }
    };
    debug!(
        collector = kind.as_ref(),
        ?duration,
        partial_failures,
        "Collector finished"
    );
    ScrapeOutcome {
        kind,
        duration,
        error,
        partial_failures,
    }
}
