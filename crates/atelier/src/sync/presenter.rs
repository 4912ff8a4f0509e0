use tracing::info;

use super::UiFlags;
use crate::channel::{Channel, ChannelHub, ConnectionStatus};
use crate::nav::NavCommand;
use crate::protocol::{AspectRatio, ChannelMessage, ControlAction, Snapshot};

/// The presenter console. Holds no navigation state of its own: every
/// interaction becomes a command, and the view only changes when the main
/// surface answers with a snapshot.
#[derive(Debug)]
pub struct PresenterController {
    channel: Channel,
    view: Option<Snapshot>,
    connected: bool,
    signed_off: bool,
}

impl PresenterController {
    /// Join the channel and announce this console.
    pub fn open(hub: &ChannelHub, channel_name: &str) -> Self {
        let channel = hub.open(channel_name);
        info!(channel = channel.name(), surface = %channel.id(), "presenter joining");
        channel.send(&ChannelMessage::Connected);
        Self {
            channel,
            view: None,
            connected: false,
            signed_off: false,
        }
    }

    /// Last snapshot received from the main surface.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.view.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether any other endpoint has answered on the channel yet.
    pub fn link_status(&self) -> ConnectionStatus {
        self.channel.status()
    }

    pub fn is_at_start(&self) -> bool {
        self.view.is_none_or(|s| s.index == 0 && s.step == 0)
    }

    pub fn is_at_end(&self, total_slides: usize) -> bool {
        self.view
            .is_none_or(|s| s.index + 1 >= total_slides && s.step >= s.total_steps)
    }

    /// Apply received snapshots. Returns whether any peer traffic arrived.
    pub fn pump(&mut self) -> bool {
        let own = self.channel.id();
        let mut handled = false;
        for delivery in self.channel.poll() {
            if delivery.origin == own {
                continue;
            }
            handled = true;
            match delivery.message {
                ChannelMessage::State(snapshot) => {
                    if !self.connected {
                        info!("connected to presentation");
                    }
                    self.view = Some(snapshot);
                    self.connected = true;
                }
                ChannelMessage::Disconnected => {
                    if self.connected {
                        info!("presentation disconnected");
                    }
                    self.connected = false;
                }
                _ => {}
            }
        }
        handled
    }

    pub fn navigate(&self, command: NavCommand) {
        self.channel.send(&ChannelMessage::navigate(command));
    }

    pub fn next_step(&self) {
        self.navigate(NavCommand::NextStep);
    }

    pub fn prev_step(&self) {
        self.navigate(NavCommand::PrevStep);
    }

    pub fn next_slide(&self) {
        self.navigate(NavCommand::NextSlide);
    }

    pub fn prev_slide(&self) {
        self.navigate(NavCommand::PrevSlide);
    }

    pub fn go_to(&self, index: usize) {
        self.navigate(NavCommand::GoTo(index));
    }

    pub fn toggle_border(&self) {
        let flags = self.flags();
        self.control(ControlAction::Border(!flags.show_border));
    }

    pub fn toggle_fullscreen(&self) {
        let flags = self.flags();
        self.control(ControlAction::Fullscreen(!flags.is_fullscreen));
    }

    pub fn set_aspect_ratio(&self, ratio: AspectRatio) {
        self.control(ControlAction::AspectRatio(ratio));
    }

    /// Hand control back to the main surface and sign off.
    pub fn pop_in(&mut self) {
        self.sign_off();
        self.connected = false;
    }

    fn flags(&self) -> UiFlags {
        self.view.map_or_else(UiFlags::default, |s| UiFlags {
            show_border: s.show_border,
            is_fullscreen: s.is_fullscreen,
            aspect_ratio: s.aspect_ratio,
        })
    }

    fn control(&self, action: ControlAction) {
        self.channel.send(&ChannelMessage::Control(action));
    }

    fn sign_off(&mut self) {
        if !self.signed_off {
            self.channel.send(&ChannelMessage::Disconnected);
            self.signed_off = true;
        }
    }
}

impl Drop for PresenterController {
    // Best effort: not reached on abort.
    fn drop(&mut self) {
        self.sign_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(channel: &mut Channel) -> Vec<ChannelMessage> {
        let own = channel.id();
        channel
            .poll()
            .into_iter()
            .filter(|d| d.origin != own)
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_open_announces_connected() {
        let hub = ChannelHub::new();
        let mut main = hub.open("deck");
        let presenter = PresenterController::open(&hub, "deck");
        assert_eq!(messages(&mut main), [ChannelMessage::Ping, ChannelMessage::Connected]);
        assert!(!presenter.is_connected());
        assert!(presenter.snapshot().is_none());
    }

    #[test]
    fn test_link_status_follows_handshake() {
        let hub = ChannelHub::new();
        let mut main = hub.open("deck");
        let mut presenter = PresenterController::open(&hub, "deck");
        presenter.pump();
        assert_eq!(presenter.link_status(), ConnectionStatus::Disconnected);

        // The main side answers the discovery ping.
        main.poll();
        presenter.pump();
        assert_eq!(presenter.link_status(), ConnectionStatus::Connected);
        assert!(!presenter.is_connected());
    }

    #[test]
    fn test_interactions_only_emit_commands() {
        let hub = ChannelHub::new();
        let mut main = hub.open("deck");
        let mut presenter = PresenterController::open(&hub, "deck");
        messages(&mut main);

        presenter.next_step();
        presenter.go_to(3);
        presenter.toggle_border();
        presenter.set_aspect_ratio(AspectRatio::Portrait);
        presenter.pump();

        assert!(presenter.snapshot().is_none());
        assert_eq!(
            messages(&mut main),
            [
                ChannelMessage::navigate(NavCommand::NextStep),
                ChannelMessage::navigate(NavCommand::GoTo(3)),
                ChannelMessage::Control(ControlAction::Border(false)),
                ChannelMessage::Control(ControlAction::AspectRatio(AspectRatio::Portrait)),
            ]
        );
    }

    #[test]
    fn test_toggles_invert_last_snapshot() {
        let hub = ChannelHub::new();
        let mut main = hub.open("deck");
        let mut presenter = PresenterController::open(&hub, "deck");
        main.send(&ChannelMessage::State(Snapshot {
            show_border: false,
            is_fullscreen: true,
            ..Default::default()
        }));
        presenter.pump();
        messages(&mut main);

        presenter.toggle_border();
        presenter.toggle_fullscreen();
        assert_eq!(
            messages(&mut main),
            [
                ChannelMessage::Control(ControlAction::Border(true)),
                ChannelMessage::Control(ControlAction::Fullscreen(false)),
            ]
        );
    }

    #[test]
    fn test_own_commands_are_not_applied() {
        let hub = ChannelHub::new();
        let mut presenter = PresenterController::open(&hub, "deck");
        presenter.next_slide();
        assert!(!presenter.pump());
        assert!(!presenter.is_connected());
    }

    #[test]
    fn test_boundaries_follow_snapshot() {
        let hub = ChannelHub::new();
        let main = hub.open("deck");
        let mut presenter = PresenterController::open(&hub, "deck");
        assert!(presenter.is_at_start());

        main.send(&ChannelMessage::State(Snapshot {
            index: 2,
            step: 1,
            total_steps: 1,
            ..Default::default()
        }));
        presenter.pump();
        assert!(!presenter.is_at_start());
        assert!(presenter.is_at_end(3));
        assert!(!presenter.is_at_end(4));
    }

    #[test]
    fn test_disconnect_is_sent_once() {
        let hub = ChannelHub::new();
        let mut main = hub.open("deck");
        let mut presenter = PresenterController::open(&hub, "deck");
        messages(&mut main);

        presenter.pop_in();
        drop(presenter);
        assert_eq!(messages(&mut main), [ChannelMessage::Disconnected]);
    }
}
