use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use tracing::{debug, warn};

use crate::config::Config;
use crate::feed::{FeedKind, FeedQueries, FeedRequest, StatusSource};
use crate::render::{Flash, Renderer, Theme};
use crate::status::Status;
use crate::store::BufferStore;

pub struct Options {
    pub config: Config,
    pub source: Arc<dyn StatusSource>,
}

struct PendingFetch {
    request_id: u64,
    kind: FeedKind,
    started: Instant,
    cancel_flag: Arc<AtomicBool>,
}

enum AsyncResponse {
    Batch {
        request_id: u64,
        kind: FeedKind,
        result: Result<Vec<Status>>,
    },
}

pub struct Model {
    cfg: Config,
    theme: Theme,
    store: BufferStore,
    source: Arc<dyn StatusSource>,
    flash: Option<Flash>,
    pending_fetch: Option<PendingFetch>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    resize_pending: bool,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let theme = Theme::named(&opts.config.ui.theme);
        let mut model = Self {
            cfg: opts.config,
            theme,
            store: BufferStore::new(),
            source: opts.source,
            flash: None,
            pending_fetch: None,
            response_tx,
            response_rx,
            next_request_id: 1,
            resize_pending: false,
            needs_redraw: true,
        };
        model.refresh(FeedKind::Home);
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let tick_rate = Duration::from_millis(120);
        let mut last_tick = Instant::now();
        let mut last_refresh = Instant::now();

        loop {
            // Resize only flips a flag when it arrives; the actual
            // geometry re-read happens here, between events.
            if self.resize_pending {
                self.resize_pending = false;
                terminal.autoresize()?;
                self.mark_dirty();
            }

            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Resize(_, _) => self.resize_pending = true,
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                self.expire_stale_fetch();
                if last_refresh.elapsed() >= self.cfg.feed.refresh {
                    last_refresh = Instant::now();
                    self.refresh(self.store.active_kind());
                }
            }
        }

        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let flash = self.flash.take();
        let renderer = Renderer::new(&self.theme, &self.cfg.ui, &self.cfg.feed.own_handle);
        renderer.render(frame.buffer_mut(), &mut self.store, flash.as_ref());
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    /// Returns true when the session should end.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                self.store.active_mut().move_down();
                self.mark_dirty();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.store.active_mut().move_up();
                self.mark_dirty();
            }
            KeyCode::Char('h') => self.switch(FeedKind::Home),
            KeyCode::Char('m') => self.switch(FeedKind::Mentions),
            KeyCode::Char('d') => self.switch(FeedKind::Direct),
            KeyCode::Char('s') => self.switch(FeedKind::Search),
            KeyCode::Char('U') => self.switch(FeedKind::User),
            KeyCode::Char('f') => self.switch(FeedKind::Favorite),
            KeyCode::Left => self.cycle(-1),
            KeyCode::Right => self.cycle(1),
            KeyCode::Char('u') => {
                let kind = self.store.active_kind();
                self.refresh(kind);
            }
            KeyCode::Char('C') => {
                self.store.clear_active();
                self.mark_dirty();
            }
            KeyCode::Char('o') => self.open_current_urls(),
            _ => {}
        }
        false
    }

    fn switch(&mut self, kind: FeedKind) {
        self.store.switch_to(kind);
        // Feeds populate lazily, on first display.
        if self.store.active().is_empty() {
            self.refresh(kind);
        }
        self.mark_dirty();
    }

    fn cycle(&mut self, offset: isize) {
        let before = self.store.active_kind();
        self.store.cycle(offset);
        let after = self.store.active_kind();
        if after != before && self.store.active().is_empty() {
            self.refresh(after);
        }
        self.mark_dirty();
    }

    /// Kick off a background fetch for `kind`. Search and user feeds with
    /// no query configured skip silently. A previous in-flight fetch is
    /// cancelled; its late response is discarded by the request id check.
    fn refresh(&mut self, kind: FeedKind) {
        let queries = FeedQueries {
            search: self.cfg.feed.search_query.clone(),
            user: self.cfg.feed.user.clone(),
        };
        let Some(request) = FeedRequest::for_kind(kind, &queries) else {
            debug!(feed = kind.label(), "refresh skipped, no query");
            return;
        };

        if let Some(pending) = self.pending_fetch.take() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }

        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.pending_fetch = Some(PendingFetch {
            request_id,
            kind,
            started: Instant::now(),
            cancel_flag: cancel_flag.clone(),
        });
        self.flash = Some(Flash::info("Updating timeline..."));
        self.mark_dirty();

        let tx = self.response_tx.clone();
        let source = self.source.clone();
        thread::spawn(move || {
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let result = source.fetch(&request);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(AsyncResponse::Batch {
                request_id,
                kind,
                result,
            });
        });
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Batch {
                request_id,
                kind,
                result,
            } => {
                let Some(pending) = &self.pending_fetch else {
                    return;
                };
                if pending.request_id != request_id
                    || pending.cancel_flag.load(Ordering::SeqCst)
                {
                    return;
                }
                self.pending_fetch = None;

                match result {
                    Ok(batch) => {
                        self.flash = None;
                        self.store.merge(kind, batch);
                    }
                    Err(err) => {
                        // The buffer keeps whatever it had; the next
                        // periodic refresh retries.
                        warn!(feed = kind.label(), error = %err, "fetch failed");
                        self.flash = Some(Flash::warning("Couldn't retrieve statuses"));
                    }
                }
            }
        }
    }

    /// Abandon a fetch that has outlived its timeout. The worker thread is
    /// left to finish; its response is discarded.
    fn expire_stale_fetch(&mut self) {
        let timeout = self.cfg.feed.fetch_timeout;
        if let Some(pending) = &self.pending_fetch {
            if pending.started.elapsed() >= timeout {
                warn!(feed = pending.kind.label(), "fetch timed out");
                pending.cancel_flag.store(true, Ordering::SeqCst);
                self.pending_fetch = None;
                self.flash = Some(Flash::warning("Couldn't retrieve statuses"));
                self.mark_dirty();
            }
        }
    }

    fn open_current_urls(&mut self) {
        let urls: Vec<String> = self
            .store
            .active()
            .current_status()
            .map(|status| status.urls().iter().map(|url| url.to_string()).collect())
            .unwrap_or_default();

        if urls.is_empty() {
            self.flash = Some(Flash::info("No URLs in this status"));
            self.mark_dirty();
            return;
        }
        for url in urls {
            if let Err(err) = webbrowser::open(&url) {
                warn!(%url, error = %err, "failed to open url");
                self.flash = Some(Flash::warning("Couldn't open URL"));
            }
        }
        self.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::SampleSource;
    use chrono::Utc;

    struct FailingSource;

    impl StatusSource for FailingSource {
        fn fetch(&self, _request: &FeedRequest) -> Result<Vec<Status>> {
            anyhow::bail!("connection refused")
        }
    }

    fn sample_model() -> Model {
        Model::new(Options {
            config: Config::default(),
            source: Arc::new(SampleSource::new()),
        })
    }

    fn wait_response(model: &Model) -> AsyncResponse {
        model
            .response_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("fetch worker responds")
    }

    fn batch(ids: &[u64]) -> Vec<Status> {
        ids.iter()
            .map(|&id| Status::new(id, "alice", Utc::now(), format!("status {id}")))
            .collect()
    }

    #[test]
    fn quit_key_ends_the_session() {
        let mut model = sample_model();
        assert!(model.handle_key(KeyCode::Char('q')));
        assert!(!model.handle_key(KeyCode::Char('x')));
    }

    #[test]
    fn startup_fetch_lands_in_the_home_buffer() {
        let mut model = sample_model();
        let response = wait_response(&model);
        model.handle_async_response(response);
        assert!(!model.store.buffer(FeedKind::Home).is_empty());
        assert!(model.pending_fetch.is_none());
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut model = sample_model();
        model.handle_async_response(AsyncResponse::Batch {
            request_id: 999,
            kind: FeedKind::Home,
            result: Ok(batch(&[5, 4])),
        });
        assert!(model.store.buffer(FeedKind::Home).is_empty());
        assert!(model.pending_fetch.is_some());
    }

    #[test]
    fn failed_fetch_keeps_the_buffer_and_raises_a_warning() {
        let mut model = Model::new(Options {
            config: Config::default(),
            source: Arc::new(FailingSource),
        });
        let response = wait_response(&model);
        model.handle_async_response(response);
        assert!(model.store.buffer(FeedKind::Home).is_empty());
        let flash = model.flash.expect("warning flash");
        assert_eq!(flash, Flash::warning("Couldn't retrieve statuses"));
    }

    #[test]
    fn refresh_with_empty_query_is_a_silent_no_op() {
        let mut model = sample_model();
        let response = wait_response(&model);
        model.handle_async_response(response);
        assert!(model.pending_fetch.is_none());

        model.refresh(FeedKind::Search);
        assert!(model.pending_fetch.is_none());
        assert_eq!(model.flash, None);
    }

    #[test]
    fn refresh_with_configured_query_goes_out() {
        let mut config = Config::default();
        config.feed.search_query = "rustlang".into();
        let mut model = Model::new(Options {
            config,
            source: Arc::new(SampleSource::new()),
        });
        let response = wait_response(&model);
        model.handle_async_response(response);

        model.refresh(FeedKind::Search);
        assert!(model.pending_fetch.is_some());
        let response = wait_response(&model);
        model.handle_async_response(response);
        assert!(!model.store.buffer(FeedKind::Search).is_empty());
    }

    #[test]
    fn timed_out_fetch_is_abandoned_with_a_warning() {
        let mut config = Config::default();
        config.feed.fetch_timeout = Duration::ZERO;
        let mut model = Model::new(Options {
            config,
            source: Arc::new(SampleSource::new()),
        });
        assert!(model.pending_fetch.is_some());
        model.expire_stale_fetch();
        assert!(model.pending_fetch.is_none());
        assert_eq!(model.flash, Some(Flash::warning("Couldn't retrieve statuses")));
    }

    #[test]
    fn movement_keys_drive_the_active_buffer() {
        let mut model = sample_model();
        let response = wait_response(&model);
        model.handle_async_response(response);
        model.store.active_mut().set_last(usize::MAX);

        model.handle_key(KeyCode::Char('j'));
        assert_eq!(model.store.active().current(), 1);
        model.handle_key(KeyCode::Char('k'));
        assert_eq!(model.store.active().current(), 0);
        model.handle_key(KeyCode::Char('k'));
        assert_eq!(model.store.active().current(), 0);
    }

    #[test]
    fn switching_to_an_empty_query_feed_does_not_hang_a_fetch() {
        let mut model = sample_model();
        let response = wait_response(&model);
        model.handle_async_response(response);

        model.handle_key(KeyCode::Char('s'));
        assert_eq!(model.store.active_kind(), FeedKind::Search);
        assert!(model.pending_fetch.is_none());
    }

    #[test]
    fn clear_key_collapses_the_active_buffer() {
        let mut model = sample_model();
        let response = wait_response(&model);
        model.handle_async_response(response);
        assert!(model.store.active().len() > 1);

        model.handle_key(KeyCode::Char('C'));
        assert_eq!(model.store.active().len(), 1);
    }
}
