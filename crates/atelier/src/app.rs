use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use eframe::egui;
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tracing::{debug, trace, warn};

use crate::channel::{ChannelHub, ConnectionStatus};
use crate::config::Config;
use crate::deck::{self, Deck};
use crate::keys::{self, Intent};
use crate::nav::NavCommand;
use crate::parser::{self, DeckSource};
use crate::render::{self, PanelAction, PanelModel};
use crate::sync::{Fullscreen, MainController, PresenterController, UiFlags};

const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the viewer was asked to start; anything unset falls back to config.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub windowed: bool,
    /// 1-indexed.
    pub start_slide: Option<usize>,
    pub open_presenter: bool,
    pub channel: Option<String>,
}

/// The deck file on disk plus what it last resolved to. Included files are
/// only seen through the extracted deck, so both are compared on refresh.
struct DeckFile {
    path: PathBuf,
    text: String,
    deck: Deck,
}

impl DeckFile {
    fn open(path: PathBuf) -> anyhow::Result<(Self, DeckSource)> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read deck {}", path.display()))?;
        let source = parser::parse(&text, base_dir(&path));
        let deck = deck::extract(&source.root);
        Ok((Self { path, text, deck }, source))
    }

    /// Re-read the file. `None` when neither its text nor the deck it
    /// resolves to has changed.
    fn refresh(&mut self) -> anyhow::Result<Option<DeckSource>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read deck {}", self.path.display()))?;
        let source = parser::parse(&text, base_dir(&self.path));
        let deck = deck::extract(&source.root);
        if text == self.text && deck == self.deck {
            return Ok(None);
        }
        self.text = text;
        self.deck = deck;
        Ok(Some(source))
    }
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

struct DeckWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    events: mpsc::Receiver<DebounceEventResult>,
}

impl DeckWatcher {
    fn new(path: &Path) -> anyhow::Result<Self> {
        let (tx, events) = mpsc::channel();
        let mut debouncer = new_debouncer(WATCH_DEBOUNCE, tx)?;
        // Editors often replace the file, so watch the directory.
        debouncer
            .watcher()
            .watch(base_dir(path), RecursiveMode::NonRecursive)?;
        Ok(Self {
            _debouncer: debouncer,
            events,
        })
    }

    fn changed(&self) -> bool {
        let mut changed = false;
        for result in self.events.try_iter() {
            match result {
                Ok(events) => changed |= !events.is_empty(),
                Err(e) => warn!(error = ?e, "file watcher error"),
            }
        }
        changed
    }
}

/// Drives the root viewport's fullscreen state through egui.
struct EguiFullscreen<'a> {
    ctx: &'a egui::Context,
}

impl Fullscreen for EguiFullscreen<'_> {
    fn is_fullscreen(&self) -> bool {
        self.ctx.input_for(egui::ViewportId::ROOT, |i| {
            i.viewport().fullscreen.unwrap_or(false)
        })
    }

    fn request(&mut self) {
        self.ctx
            .send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Fullscreen(true));
    }

    fn exit(&mut self) {
        self.ctx.send_viewport_cmd_to(
            egui::ViewportId::ROOT,
            egui::ViewportCommand::Fullscreen(false),
        );
    }
}

/// The popped-out console: its own channel endpoint and its own deck copy
/// for notes.
struct PresenterSurface {
    controller: PresenterController,
    deck: Deck,
    titles: Vec<String>,
}

impl PresenterSurface {
    fn new(controller: PresenterController, deck: Deck) -> Self {
        let titles = render::slide_titles(&deck);
        Self {
            controller,
            deck,
            titles,
        }
    }

    fn set_deck(&mut self, deck: Deck) {
        self.titles = render::slide_titles(&deck);
        self.deck = deck;
    }

    /// Draw one frame. Returns true when the window should close.
    fn show(&mut self, ctx: &egui::Context) -> bool {
        self.controller.pump();

        let mut close = ctx.input(|i| i.viewport().close_requested());
        for intent in keys::pressed_intents(ctx) {
            match intent {
                Intent::Navigate(command) => self.controller.navigate(command),
                Intent::Escape => close = true,
            }
        }

        let Some(snapshot) = self.controller.snapshot().copied() else {
            let waiting = match self.controller.link_status() {
                ConnectionStatus::Disconnected => "Connecting to presentation...",
                ConnectionStatus::Connected => "Waiting for the presentation state...",
            };
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.weak(waiting);
                });
            });
            return close;
        };

        let model = PanelModel {
            index: snapshot.index,
            total_slides: self.deck.len(),
            step: snapshot.step,
            total_steps: snapshot.total_steps,
            flags: UiFlags {
                show_border: snapshot.show_border,
                is_fullscreen: snapshot.is_fullscreen,
                aspect_ratio: snapshot.aspect_ratio,
            },
            at_start: self.controller.is_at_start(),
            at_end: self.controller.is_at_end(self.deck.len()),
            popped_out: true,
        };
        let mut actions = Vec::new();
        egui::TopBottomPanel::top("presenter-header").show(ctx, |ui| {
            render::panel_header(ui, &model, &mut actions);
        });
        egui::TopBottomPanel::bottom("presenter-footer").show(ctx, |ui| {
            render::panel_footer(ui, &model, &self.titles, &mut actions);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.controller.is_connected() {
                ui.weak("Presentation disconnected");
                ui.separator();
            }
            let notes = self.deck.get(snapshot.index).and_then(|s| s.notes.as_deref());
            render::draw_notes(ui, notes);
        });

        for action in actions {
            match action {
                PanelAction::PrevStep => self.controller.prev_step(),
                PanelAction::NextStep => self.controller.next_step(),
                PanelAction::PrevSlide => self.controller.prev_slide(),
                PanelAction::NextSlide => self.controller.next_slide(),
                PanelAction::GoTo(index) => self.controller.go_to(index),
                PanelAction::ToggleFullscreen => self.controller.toggle_fullscreen(),
                PanelAction::ToggleBorder => self.controller.toggle_border(),
                PanelAction::SetAspectRatio(ratio) => self.controller.set_aspect_ratio(ratio),
                PanelAction::PopIn => close = true,
                PanelAction::PopOut => {}
            }
        }
        close
    }
}

struct AtelierApp {
    hub: ChannelHub,
    channel: String,
    title: String,
    deck_file: DeckFile,
    watcher: Option<DeckWatcher>,
    controller: MainController,
    presenter: Option<PresenterSurface>,
    presenter_size: [f32; 2],
    titles: Vec<String>,
    /// Slide whose drawn step count was last registered.
    activated: Option<usize>,
}

impl AtelierApp {
    fn pop_out(&mut self) {
        if self.presenter.is_some() {
            return;
        }
        self.controller.open_presenter();
        let deck = self.controller.navigator().deck().clone();
        self.presenter = Some(PresenterSurface::new(
            PresenterController::open(&self.hub, &self.channel),
            deck,
        ));
    }

    fn reload_if_changed(&mut self) {
        if !self.watcher.as_ref().is_some_and(DeckWatcher::changed) {
            return;
        }
        match self.deck_file.refresh() {
            Ok(Some(source)) => {
                let deck = deck::extract(&source.root);
                self.titles = render::slide_titles(&deck);
                self.controller.reload(deck);
                self.activated = None;
                if let Some(surface) = &mut self.presenter {
                    surface.set_deck(deck::extract(&source.root));
                }
            }
            Ok(None) => trace!("deck text unchanged"),
            Err(e) => warn!("{e:#}"),
        }
    }

    fn panel_model(&self) -> PanelModel {
        let nav = self.controller.navigator();
        let state = self.controller.state();
        PanelModel {
            index: state.slide_index,
            total_slides: nav.slide_count(),
            step: state.step,
            total_steps: nav.current_step_count(),
            flags: self.controller.flags(),
            at_start: nav.is_at_start(),
            at_end: nav.is_at_end(),
            popped_out: false,
        }
    }

    fn apply(&mut self, action: PanelAction, screen: &mut dyn Fullscreen) {
        match action {
            PanelAction::PrevStep => {
                self.controller.navigate(NavCommand::PrevStep);
            }
            PanelAction::NextStep => {
                self.controller.navigate(NavCommand::NextStep);
            }
            PanelAction::PrevSlide => {
                self.controller.navigate(NavCommand::PrevSlide);
            }
            PanelAction::NextSlide => {
                self.controller.navigate(NavCommand::NextSlide);
            }
            PanelAction::GoTo(index) => {
                self.controller.navigate(NavCommand::GoTo(index));
            }
            PanelAction::ToggleFullscreen => self.controller.toggle_fullscreen(screen),
            PanelAction::ToggleBorder => self.controller.toggle_border(),
            PanelAction::SetAspectRatio(ratio) => self.controller.set_aspect_ratio(ratio),
            PanelAction::PopOut => self.pop_out(),
            PanelAction::PopIn => self.controller.close_presenter(),
        }
    }

    /// On entering a slide, make sure every reveal line it draws is reachable.
    fn activate_current_slide(&mut self) {
        let nav = self.controller.navigator();
        let index = nav.state().slide_index;
        if self.activated == Some(index) {
            return;
        }
        self.activated = Some(index);
        let drawn = nav
            .current_slide()
            .map_or(0, |s| parser::count_reveal_items(&s.content));
        if drawn > nav.current_step_count() {
            self.controller.declare_step_count(drawn);
        }
    }

    fn show_presenter(&mut self, ctx: &egui::Context) {
        let builder = egui::ViewportBuilder::default()
            .with_title(format!("{} - presenter", self.title))
            .with_inner_size(self.presenter_size);
        let Some(surface) = self.presenter.as_mut() else {
            return;
        };
        let close = ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("atelier-presenter"),
            builder,
            |ctx, _class| surface.show(ctx),
        );
        if close {
            if let Some(mut surface) = self.presenter.take() {
                surface.controller.pop_in();
            }
            ctx.request_repaint();
        }
    }
}

impl eframe::App for AtelierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.reload_if_changed();

        let mut screen = EguiFullscreen { ctx };

        // Read root keys before any child viewport takes over the context.
        for intent in keys::pressed_intents(ctx) {
            match intent {
                Intent::Navigate(command) => {
                    self.controller.navigate(command);
                }
                Intent::Escape => self.controller.escape(&mut screen),
            }
        }

        self.controller.pump(&mut screen);
        self.activate_current_slide();
        let linked =
            self.controller.presenter_window_open() || self.controller.presenter_connected();
        if !linked && self.presenter.take().is_some() {
            debug!("presenter surface dropped");
        }

        let flags = self.controller.flags();
        let mut actions = Vec::new();
        if self.presenter.is_none() && !flags.is_fullscreen {
            let model = self.panel_model();
            let notes = self
                .controller
                .navigator()
                .current_slide()
                .and_then(|s| s.notes.clone());
            egui::SidePanel::right("presenter-panel")
                .default_width(320.0)
                .show(ctx, |ui| {
                    render::panel_header(ui, &model, &mut actions);
                    ui.separator();
                    render::panel_footer(ui, &model, &self.titles, &mut actions);
                    ui.separator();
                    render::draw_notes(ui, notes.as_deref());
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::from_gray(24)).inner_margin(0.0))
            .show(ctx, |ui| {
                let nav = self.controller.navigator();
                render::draw_slide(
                    ui,
                    nav.current_slide(),
                    nav.step_handle(),
                    flags,
                    ui.max_rect(),
                );
            });

        for action in actions {
            self.apply(action, &mut screen);
        }

        self.show_presenter(ctx);
        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

fn window_title(meta_title: Option<&str>, file: &Path) -> String {
    match meta_title {
        Some(title) => title.to_string(),
        None => format!(
            "atelier - {}",
            file.file_name().unwrap_or_default().to_string_lossy()
        ),
    }
}

pub fn run(file: PathBuf, options: LaunchOptions) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let (deck_file, source) = DeckFile::open(file)?;
    let deck = deck::extract(&source.root);
    if deck.is_empty() {
        anyhow::bail!("No slides found in {}", deck_file.path.display());
    }

    let title = window_title(source.meta.title.as_deref(), &deck_file.path);
    let windowed = options.windowed || config.windowed();
    let channel = options.channel.unwrap_or_else(|| config.channel());
    let flags = UiFlags {
        show_border: config.show_border(),
        is_fullscreen: false,
        aspect_ratio: source
            .meta
            .aspect_ratio()
            .or_else(|| config.aspect_ratio())
            .unwrap_or_default(),
    };

    let watcher = match DeckWatcher::new(&deck_file.path) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("live reload disabled: {e:#}");
            None
        }
    };

    let titles = render::slide_titles(&deck);
    let hub = ChannelHub::new();
    let mut controller = MainController::new(&hub, &channel, deck, flags);
    if let Some(n) = options.start_slide {
        if (1..=controller.navigator().slide_count()).contains(&n) {
            controller.navigate(NavCommand::GoTo(n - 1));
        }
    }

    let viewport = if windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let mut app = AtelierApp {
        hub,
        channel,
        title: title.clone(),
        deck_file,
        watcher,
        controller,
        presenter: None,
        presenter_size: config.presenter_size(),
        titles,
        activated: None,
    };
    if options.open_presenter {
        app.pop_out();
    }

    eframe::run_native(&title, native_options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_is_memoized_on_identical_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.md");
        std::fs::write(&path, "# One\n\n---\n\n# Two\n").unwrap();

        let (mut file, source) = DeckFile::open(path.clone()).unwrap();
        assert_eq!(deck::extract(&source.root).len(), 2);
        assert!(file.refresh().unwrap().is_none());

        std::fs::write(&path, "# One\n\n---\n\n# Two\n\n---\n\n# Three\n").unwrap();
        let source = file.refresh().unwrap().expect("changed text reparses");
        assert_eq!(deck::extract(&source.root).len(), 3);
        assert!(file.refresh().unwrap().is_none());
    }

    #[test]
    fn test_refresh_sees_included_file_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.md");
        std::fs::write(dir.path().join("part.md"), "# Part").unwrap();
        std::fs::write(&path, "# One\n\n---\n\n@include: part.md\n").unwrap();

        let (mut file, _) = DeckFile::open(path.clone()).unwrap();
        assert!(file.refresh().unwrap().is_none());

        std::fs::write(dir.path().join("part.md"), "# Part\n\n# Another part").unwrap();
        let source = file.refresh().unwrap().expect("included edit reparses");
        assert_eq!(deck::extract(&source.root).len(), 3);
        assert!(file.refresh().unwrap().is_none());
    }

    #[test]
    fn test_missing_deck_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeckFile::open(dir.path().join("missing.md")).err().unwrap();
        assert!(format!("{err:#}").contains("missing.md"));
    }

    #[test]
    fn test_window_title() {
        let file = Path::new("/talks/rust.md");
        assert_eq!(window_title(Some("Rust"), file), "Rust");
        assert_eq!(window_title(None, file), "atelier - rust.md");
    }
}
