use egui::Key;

use crate::session::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Scrubber,
    Player,
}

/// Maps a pressed key to a session command. Keys that mean nothing in
/// `variant` map to `None`.
pub fn command_for(key: Key, variant: Variant) -> Option<Command> {
    let command = match key {
        Key::Q | Key::Escape => Command::Quit,
        Key::S => Command::Capture,
        Key::C => Command::Confirm,
        Key::ArrowLeft => Command::SeekBackwardCoarse,
        Key::ArrowRight => Command::SeekForwardCoarse,
        Key::ArrowUp => Command::SeekBackwardFine,
        Key::ArrowDown => Command::SeekForwardFine,
        Key::Space => Command::TogglePause,
        Key::M if variant == Variant::Player => Command::ToggleMute,
        _ => return None,
    };
    Some(command)
}

/// Collects the commands for every key pressed this frame, in order.
pub fn commands_from_input(input: &egui::InputState, variant: Variant) -> Vec<Command> {
    input
        .events
        .iter()
        .filter_map(|event| match event {
            egui::Event::Key {
                key, pressed: true, ..
            } => command_for(*key, variant),
            _ => None,
        })
        .collect()
}

pub fn help_line(variant: Variant, step: u64, fine: u64) -> String {
    let mut line = format!(
        "Controls: Space = Pause/Resume, ← back {step} frames, → forward {step} frames, \
         ↑ back {fine}, ↓ forward {fine}, 's' select, 'c' confirm, 'q' quit"
    );
    if variant == Variant::Player {
        line.push_str(", 'm' mute");
    }
    line
}
