//! App state and main loop: input handling, link events, settings actions, and drawing.

use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::alerts::{ConfigHandle, Tier};
use crate::api::{ApiClient, ApiError};
use crate::connection::ConnectionManager;
use crate::history::{MetricsHistory, Series};
use crate::monitor::{Field, Monitor, RenderSink};
use crate::notify::{self, Notifier};
use crate::settings::{save_settings, Settings};
use crate::types::{AlertConfig, AlertHistory, AlertType, MetricSample, VersionInfo};
use crate::ui::{
    alerts::draw_alerts,
    charts::{draw_rate_spark, draw_usage_spark},
    display::DisplayState,
    header::draw_header,
    processes::draw_top_processes,
    theme,
};
use crate::ws::{run_link, LinkEvent};

const THRESHOLD_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    ToggleSort,
    ToggleAlerts,
    Adjust(AlertType, f64),
    SaveConfig,
    ReloadHistory,
    ClearHistory,
}

pub fn key_action(code: KeyCode) -> Option<Action> {
    let a = match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::ToggleSort,
        KeyCode::Char('e') => Action::ToggleAlerts,
        KeyCode::Char('c') => Action::Adjust(AlertType::Cpu, -THRESHOLD_STEP),
        KeyCode::Char('C') => Action::Adjust(AlertType::Cpu, THRESHOLD_STEP),
        KeyCode::Char('r') => Action::Adjust(AlertType::Ram, -THRESHOLD_STEP),
        KeyCode::Char('R') => Action::Adjust(AlertType::Ram, THRESHOLD_STEP),
        KeyCode::Char('d') => Action::Adjust(AlertType::Disk, -THRESHOLD_STEP),
        KeyCode::Char('D') => Action::Adjust(AlertType::Disk, THRESHOLD_STEP),
        KeyCode::Char('s') => Action::SaveConfig,
        KeyCode::Char('l') => Action::ReloadHistory,
        KeyCode::Char('x') => Action::ClearHistory,
        _ => return None,
    };
    Some(a)
}

/// Result of a backend request, delivered back to the UI loop.
#[derive(Debug)]
pub enum ApiReply {
    Version(Result<VersionInfo, ApiError>),
    Config(Result<AlertConfig, ApiError>),
    History { reload: bool, res: Result<AlertHistory, ApiError> },
    Snapshot(Result<MetricSample, ApiError>),
    Saved { cfg: AlertConfig, res: Result<(), ApiError> },
    Cleared(Result<(), ApiError>),
}

pub struct App {
    monitor: Monitor,
    display: DisplayState,
    config: ConfigHandle,
    notifier: Box<dyn Notifier + Send>,
    api: Option<ApiClient>,
    replies_tx: mpsc::UnboundedSender<ApiReply>,
    replies: mpsc::UnboundedReceiver<ApiReply>,
    settings: Settings,
    settings_path: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(settings: Settings, settings_path: PathBuf) -> Self {
        let config = ConfigHandle::new(settings.alerts);
        let evaluator = config.evaluator(settings.critical_margin);
        let monitor = Monitor::new(MetricsHistory::new(settings.history_capacity), evaluator);
        let api = match ApiClient::from_ws_url(&settings.url) {
            Ok(api) => Some(api),
            Err(e) => {
                tracing::warn!("backend API unavailable: {e}");
                None
            }
        };
        let (replies_tx, replies) = mpsc::unbounded_channel();
        Self {
            monitor,
            display: DisplayState::default(),
            config,
            notifier: notify::for_sound(settings.sound),
            api,
            replies_tx,
            replies,
            settings,
            settings_path,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.spawn_bootstrap();

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let link = tokio::spawn(run_link(
            self.settings.url.clone(),
            ConnectionManager::new(self.settings.reconnect.backoff()),
            events_tx,
            shutdown_rx,
        ));

        // Terminal setup
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal, &mut events_rx).await;

        // Stop the link before anything else so no reconnect fires after teardown
        let _ = shutdown_tx.send(true);
        drop(events_rx);
        stop_link(link).await;

        // Teardown
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, DisableMouseCapture, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    /// One-shot fetches run alongside the push stream. Replies arrive through
    /// the reply channel; a failure is logged and shown, never fatal.
    fn spawn_bootstrap(&self) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let tx = self.replies_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(ApiReply::Version(api.fetch_version().await));
            let _ = tx.send(ApiReply::Config(api.fetch_alert_config().await));
            let res = api.fetch_alert_history().await;
            let _ = tx.send(ApiReply::History { reload: false, res });
            let _ = tx.send(ApiReply::Snapshot(api.fetch_metrics().await));
        });
    }

    // Backend calls never block the input loop.
    fn request<F, Fut>(&self, call: F)
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = ApiReply> + Send + 'static,
    {
        let Some(api) = self.api.clone() else {
            tracing::debug!("no backend API; request skipped");
            return;
        };
        let tx = self.replies_tx.clone();
        let fut = call(api);
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut mpsc::UnboundedReceiver<LinkEvent>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if let Some(action) = key_action(k.code) {
                        self.perform(action);
                    }
                }
            }
            if self.should_quit {
                break;
            }

            // Drain link events in arrival order
            loop {
                match events.try_recv() {
                    Ok(ev) => self.handle_link_event(ev),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        // Link task is done (terminal error); keep showing the last state.
                        break;
                    }
                }
            }

            while let Ok(reply) = self.replies.try_recv() {
                self.handle_reply(reply);
            }

            // Draw
            terminal.draw(|f| self.draw(f))?;

            // Tick rate
            sleep(Duration::from_millis(100)).await;
        }

        Ok(())
    }

    pub fn handle_link_event(&mut self, ev: LinkEvent) {
        match ev {
            LinkEvent::State(s) => self.monitor.apply_state(s, &mut self.display),
            LinkEvent::Sample(m) => {
                self.monitor.apply_sample(*m, &mut self.display, self.notifier.as_mut());
            }
        }
    }

    pub fn handle_reply(&mut self, reply: ApiReply) {
        match reply {
            ApiReply::Version(Ok(v)) => self.display.render(Field::Version, v.version),
            ApiReply::Version(Err(e)) => tracing::warn!("version fetch failed: {e}"),
            ApiReply::Config(Ok(cfg)) => {
                self.config.set(cfg);
                remember_config(&mut self.settings, cfg, &self.settings_path);
            }
            ApiReply::Config(Err(e)) => {
                tracing::warn!("alert config fetch failed, using last known: {e}");
                self.config.set(self.settings.alerts);
                self.display
                    .render(Field::Notice, "alert config unavailable, using saved thresholds".into());
            }
            ApiReply::History { reload, res: Ok(h) } => {
                self.monitor.replace_alert_history(h, &mut self.display);
                if reload {
                    self.display.render(Field::Notice, "alert history reloaded".into());
                }
            }
            ApiReply::History { reload, res: Err(e) } => {
                tracing::warn!("alert history fetch failed: {e}");
                if reload {
                    self.display
                        .render(Field::Notice, format!("history reload failed: {e}"));
                }
            }
            ApiReply::Snapshot(Ok(m)) => {
                // Only seeds an empty screen; the push stream is newer.
                if self.monitor.last_sample().is_none() {
                    self.monitor.apply_sample(m, &mut self.display, self.notifier.as_mut());
                }
            }
            ApiReply::Snapshot(Err(e)) => tracing::debug!("initial snapshot unavailable: {e}"),
            ApiReply::Saved { cfg, res: Ok(()) } => {
                tracing::info!(?cfg, "alert config saved");
                remember_config(&mut self.settings, cfg, &self.settings_path);
                self.display.render(Field::Notice, "alert settings saved".into());
            }
            ApiReply::Saved { res: Err(e), .. } => {
                tracing::warn!("alert config save failed: {e}");
                // Roll back to what the backend last accepted
                self.config.set(self.settings.alerts);
                self.display.render(Field::Notice, format!("save failed: {e}"));
            }
            ApiReply::Cleared(Ok(())) => {
                self.monitor.clear_alerts(&mut self.display);
                self.display.render(Field::Notice, "alert history cleared".into());
            }
            ApiReply::Cleared(Err(e)) => {
                tracing::warn!("alert history clear failed: {e}");
                self.display.render(Field::Notice, format!("clear failed: {e}"));
            }
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleSort => {
                let next = self.monitor.sort_by().toggled();
                self.monitor.set_sort(next);
            }
            Action::ToggleAlerts => {
                let cfg = self.config.update(|c| c.enabled = !c.enabled);
                let state = if cfg.enabled { "enabled" } else { "disabled" };
                self.display
                    .render(Field::Notice, format!("alerts {state} (press 's' to save)"));
            }
            Action::Adjust(kind, delta) => {
                let cfg = self.config.update(|c| c.adjust(kind, delta));
                self.display.render(
                    Field::Notice,
                    format!(
                        "{} threshold {:.0}% (press 's' to save)",
                        kind.label(),
                        cfg.threshold(kind)
                    ),
                );
            }
            Action::SaveConfig => {
                let cfg = self.config.current();
                self.display.render(Field::Notice, "saving alert settings...".into());
                self.request(move |api| async move {
                    let res = api.update_alert_config(&cfg).await;
                    ApiReply::Saved { cfg, res }
                });
            }
            Action::ReloadHistory => self.request(|api| async move {
                let res = api.fetch_alert_history().await;
                ApiReply::History { reload: true, res }
            }),
            Action::ClearHistory => {
                self.request(|api| async move { ApiReply::Cleared(api.clear_alert_history().await) })
            }
        }
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, usage charts, network + alerts, processes
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),   // header
                Constraint::Ratio(1, 3), // cpu / mem / disk
                Constraint::Length(7),   // network (left) + alerts (right)
                Constraint::Min(8),      // processes
            ])
            .split(area);

        draw_header(f, rows[0], &self.display, self.monitor.state());

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(rows[1]);
        let hist = self.monitor.history();
        let usage_title = |name: &str, usage: Field, details: Field| {
            format!(
                "{name} {} {}",
                self.display.get_or(usage, "-"),
                self.display.get_or(details, "")
            )
        };
        let tier = |series: Series, kind: AlertType| {
            hist.latest(series)
                .map(|v| self.monitor.evaluator().tier(kind, v))
                .unwrap_or(Tier::Normal)
        };
        draw_usage_spark(
            f,
            charts[0],
            &usage_title("CPU", Field::CpuUsage, Field::CpuDetails),
            hist,
            Series::Cpu,
            theme::CPU,
            tier(Series::Cpu, AlertType::Cpu),
        );
        draw_usage_spark(
            f,
            charts[1],
            &usage_title("Memory", Field::MemoryUsage, Field::MemoryDetails),
            hist,
            Series::Memory,
            theme::MEMORY,
            tier(Series::Memory, AlertType::Ram),
        );
        draw_usage_spark(
            f,
            charts[2],
            &usage_title("Disk", Field::DiskUsage, Field::DiskDetails),
            hist,
            Series::Disk,
            theme::DISK,
            tier(Series::Disk, AlertType::Disk),
        );

        let mid = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        let net = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Min(3)])
            .split(mid[0]);
        f.render_widget(
            ratatui::widgets::Paragraph::new(self.display.get_or(Field::Network, "network: n/a").to_string()),
            net[0],
        );
        draw_rate_spark(f, net[1], "Download (KB/s)", hist, Series::NetDownload, theme::NET_DOWN);
        draw_rate_spark(f, net[2], "Upload (KB/s)", hist, Series::NetUpload, theme::NET_UP);

        let cfg = self.config.current();
        draw_alerts(f, mid[1], &cfg, self.monitor.alert_log(), &self.display);

        draw_top_processes(
            f,
            rows[3],
            self.monitor.ranked_processes(),
            self.monitor.process_count(),
            self.monitor.sort_by(),
        );
    }
}

// Persist the current config as last-known-good; best effort.
fn remember_config(settings: &mut Settings, config: AlertConfig, path: &Path) {
    settings.alerts = config;
    if let Err(e) = save_settings(path, settings) {
        tracing::warn!("could not persist settings: {e}");
    }
}

async fn stop_link(link: JoinHandle<ConnectionManager>) {
    let abort = link.abort_handle();
    match tokio::time::timeout(Duration::from_secs(1), link).await {
        Ok(Ok(mgr)) => tracing::debug!(state = %mgr.state(), "link stopped"),
        Ok(Err(e)) => tracing::warn!("link task failed: {e}"),
        Err(_) => {
            tracing::warn!("link did not stop in time; aborting");
            abort.abort();
        }
    }
}
