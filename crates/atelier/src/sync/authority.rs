use tracing::{debug, info};

use super::{Fullscreen, UiFlags};
use crate::channel::{Channel, ChannelHub};
use crate::deck::Deck;
use crate::nav::{NavCommand, NavigationState, Navigator};
use crate::protocol::{AspectRatio, ChannelMessage, ControlAction, Snapshot};

/// The authoritative side: owns navigation and flags, applies commands,
/// publishes snapshots to a connected presenter.
#[derive(Debug)]
pub struct MainController {
    nav: Navigator,
    flags: UiFlags,
    channel: Channel,
    presenter_connected: bool,
    /// Set while this surface holds an opened presenter window.
    presenter_window: bool,
    last_sent: Option<Snapshot>,
}

impl MainController {
    pub fn new(hub: &ChannelHub, channel_name: &str, deck: Deck, flags: UiFlags) -> Self {
        Self {
            nav: Navigator::new(deck),
            flags,
            channel: hub.open(channel_name),
            presenter_connected: false,
            presenter_window: false,
            last_sent: None,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn state(&self) -> NavigationState {
        self.nav.state()
    }

    pub fn flags(&self) -> UiFlags {
        self.flags
    }

    pub fn presenter_connected(&self) -> bool {
        self.presenter_connected
    }

    pub fn presenter_window_open(&self) -> bool {
        self.presenter_window
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.nav.state();
        Snapshot {
            index: state.slide_index,
            step: state.step,
            total_steps: self.nav.current_step_count(),
            show_border: self.flags.show_border,
            is_fullscreen: self.flags.is_fullscreen,
            aspect_ratio: self.flags.aspect_ratio,
        }
    }

    pub fn navigate(&mut self, command: NavCommand) -> bool {
        let changed = self.nav.apply(command);
        self.publish();
        changed
    }

    pub fn reload(&mut self, deck: Deck) {
        self.nav.reload(deck);
        self.publish();
    }

    pub fn declare_step_count(&mut self, count: usize) {
        self.nav.declare_step_count(count);
        self.publish();
    }

    pub fn toggle_border(&mut self) {
        self.flags.show_border = !self.flags.show_border;
        self.publish();
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.flags.aspect_ratio = ratio;
        self.publish();
    }

    /// Ask the host to change fullscreen; the flag follows via
    /// [`observe_fullscreen`](Self::observe_fullscreen).
    pub fn toggle_fullscreen(&mut self, screen: &mut dyn Fullscreen) {
        let on = !screen.is_fullscreen();
        set_fullscreen(screen, on);
    }

    /// Record the host's actual fullscreen state.
    pub fn observe_fullscreen(&mut self, is_fullscreen: bool) {
        if self.flags.is_fullscreen != is_fullscreen {
            self.flags.is_fullscreen = is_fullscreen;
            self.publish();
        }
    }

    pub fn open_presenter(&mut self) {
        info!("presenter window opened");
        self.presenter_window = true;
        self.presenter_connected = true;
        self.last_sent = None;
        self.publish();
    }

    pub fn close_presenter(&mut self) {
        if self.presenter_window || self.presenter_connected {
            info!("presenter window closed");
        }
        self.channel.send(&ChannelMessage::Disconnected);
        self.presenter_window = false;
        self.presenter_connected = false;
    }

    /// Escape closes the presenter link first, then leaves fullscreen.
    pub fn escape(&mut self, screen: &mut dyn Fullscreen) {
        if self.presenter_window || self.presenter_connected {
            self.close_presenter();
        } else if self.flags.is_fullscreen {
            screen.exit();
        }
    }

    /// Handle everything received since the last call. Returns whether any
    /// peer traffic arrived.
    pub fn pump(&mut self, screen: &mut dyn Fullscreen) -> bool {
        let own = self.channel.id();
        let mut handled = false;
        for delivery in self.channel.poll() {
            if delivery.origin == own {
                continue;
            }
            handled = true;
            self.handle(delivery.message, screen);
        }
        self.observe_fullscreen(screen.is_fullscreen());
        self.publish();
        handled
    }

    fn handle(&mut self, message: ChannelMessage, screen: &mut dyn Fullscreen) {
        match message {
            ChannelMessage::Navigate { .. } => match message.nav_command() {
                Some(command) => {
                    self.nav.apply(command);
                }
                None => debug!(?message, "ignoring navigate without a usable target"),
            },
            ChannelMessage::Control(ControlAction::Fullscreen(on)) => set_fullscreen(screen, on),
            ChannelMessage::Control(ControlAction::Border(on)) => self.flags.show_border = on,
            ChannelMessage::Control(ControlAction::AspectRatio(ratio)) => {
                self.flags.aspect_ratio = ratio;
            }
            ChannelMessage::Connected => {
                info!("presenter connected");
                self.presenter_connected = true;
                // A fresh peer has seen nothing yet.
                self.last_sent = None;
            }
            ChannelMessage::Disconnected => {
                info!("presenter disconnected");
                self.presenter_connected = false;
                self.presenter_window = false;
            }
            ChannelMessage::State(_) | ChannelMessage::Ping | ChannelMessage::Pong => {}
        }
    }

    fn publish(&mut self) {
        if !self.presenter_connected {
            return;
        }
        let snapshot = self.snapshot();
        if self.last_sent == Some(snapshot) {
            return;
        }
        self.channel.send(&ChannelMessage::State(snapshot));
        self.last_sent = Some(snapshot);
    }
}

fn set_fullscreen(screen: &mut dyn Fullscreen, on: bool) {
    match (on, screen.is_fullscreen()) {
        (true, false) => screen.request(),
        (false, true) => screen.exit(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::SlideRecord;
    use crate::sync::testing::FakeScreen;

    fn controller(hub: &ChannelHub) -> MainController {
        let deck = Deck::new(vec![
            SlideRecord {
                content: "# One".to_string(),
                notes: None,
                step_count: 1,
            },
            SlideRecord {
                content: "# Two".to_string(),
                notes: Some("hi".to_string()),
                step_count: 0,
            },
        ]);
        MainController::new(hub, "deck", deck, UiFlags::default())
    }

    #[test]
    fn test_escape_closes_presenter_before_fullscreen() {
        let hub = ChannelHub::new();
        let mut screen = FakeScreen {
            fullscreen: true,
            ..Default::default()
        };
        let mut main = controller(&hub);
        main.observe_fullscreen(true);
        main.open_presenter();

        main.escape(&mut screen);
        assert!(!main.presenter_window_open());
        assert!(screen.fullscreen);

        main.escape(&mut screen);
        assert_eq!(screen.exits, 1);
        assert!(!screen.fullscreen);
    }

    #[test]
    fn test_toggle_fullscreen_goes_through_host() {
        let hub = ChannelHub::new();
        let mut screen = FakeScreen::default();
        let mut main = controller(&hub);
        main.toggle_fullscreen(&mut screen);
        assert!(!main.flags().is_fullscreen);
        main.pump(&mut screen);
        assert!(main.flags().is_fullscreen);

        main.toggle_fullscreen(&mut screen);
        main.pump(&mut screen);
        assert!(!main.flags().is_fullscreen);
    }

    #[test]
    fn test_open_presenter_publishes_current_state() {
        let hub = ChannelHub::new();
        let mut observer = hub.open("deck");
        let mut main = controller(&hub);
        main.navigate(NavCommand::NextStep);
        main.open_presenter();

        let states: Vec<_> = observer
            .poll()
            .into_iter()
            .filter_map(|d| match d.message {
                ChannelMessage::State(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(states.len(), 1);
        assert_eq!((states[0].index, states[0].step, states[0].total_steps), (0, 1, 1));
    }

    #[test]
    fn test_unchanged_state_is_not_resent() {
        let hub = ChannelHub::new();
        let mut screen = FakeScreen::default();
        let mut observer = hub.open("deck");
        let mut main = controller(&hub);
        main.open_presenter();
        main.navigate(NavCommand::PrevStep);
        main.pump(&mut screen);
        let states = observer
            .poll()
            .iter()
            .filter(|d| matches!(d.message, ChannelMessage::State(_)))
            .count();
        assert_eq!(states, 1);
    }

    #[test]
    fn test_reload_resets_and_publishes() {
        let hub = ChannelHub::new();
        let mut main = controller(&hub);
        main.open_presenter();
        main.navigate(NavCommand::NextSlide);
        main.reload(Deck::default());
        assert_eq!(main.state(), NavigationState::START);
        assert_eq!(main.snapshot().total_steps, 0);
    }
}
