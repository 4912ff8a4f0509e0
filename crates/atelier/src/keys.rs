//! Keyboard surface shared by both windows.

use crate::nav::NavCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Navigate(NavCommand),
    /// Close the presenter link, or leave fullscreen.
    Escape,
}

/// Left/right step, up/down jump whole slides. Keys typed into a text field
/// belong to the field.
pub fn intent_for(key: Key, text_entry_focused: bool) -> Option<Intent> {
    if text_entry_focused {
        return None;
    }
    let intent = match key {
        Key::ArrowRight => Intent::Navigate(NavCommand::NextStep),
        Key::ArrowLeft => Intent::Navigate(NavCommand::PrevStep),
        Key::ArrowDown => Intent::Navigate(NavCommand::NextSlide),
        Key::ArrowUp => Intent::Navigate(NavCommand::PrevSlide),
        Key::Escape => Intent::Escape,
    };
    Some(intent)
}

impl Key {
    pub const ALL: [Key; 5] = [
        Key::ArrowLeft,
        Key::ArrowRight,
        Key::ArrowUp,
        Key::ArrowDown,
        Key::Escape,
    ];

    pub fn to_egui(self) -> eframe::egui::Key {
        use eframe::egui::Key as K;
        match self {
            Key::ArrowLeft => K::ArrowLeft,
            Key::ArrowRight => K::ArrowRight,
            Key::ArrowUp => K::ArrowUp,
            Key::ArrowDown => K::ArrowDown,
            Key::Escape => K::Escape,
        }
    }
}

/// Intents for the keys pressed this frame, in a fixed order.
pub fn pressed_intents(ctx: &eframe::egui::Context) -> Vec<Intent> {
    let text_entry = ctx.wants_keyboard_input();
    ctx.input(|i| {
        Key::ALL
            .into_iter()
            .filter(|k| i.key_pressed(k.to_egui()))
            .filter_map(|k| intent_for(k, text_entry))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_mapping() {
        assert_eq!(
            intent_for(Key::ArrowRight, false),
            Some(Intent::Navigate(NavCommand::NextStep))
        );
        assert_eq!(
            intent_for(Key::ArrowLeft, false),
            Some(Intent::Navigate(NavCommand::PrevStep))
        );
        assert_eq!(
            intent_for(Key::ArrowDown, false),
            Some(Intent::Navigate(NavCommand::NextSlide))
        );
        assert_eq!(
            intent_for(Key::ArrowUp, false),
            Some(Intent::Navigate(NavCommand::PrevSlide))
        );
        assert_eq!(intent_for(Key::Escape, false), Some(Intent::Escape));
    }

    #[test]
    fn test_text_entry_swallows_keys() {
        for key in Key::ALL {
            assert_eq!(intent_for(key, true), None);
        }
    }
}
