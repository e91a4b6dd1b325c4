use std::path::{Path, PathBuf};

use crate::mux::{MuxJob, OutputTarget};
use crate::navigator::FrameNavigator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Browsing,
    Paused,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Quit,
    Capture,
    Confirm,
    SeekBackwardCoarse,
    SeekForwardCoarse,
    SeekBackwardFine,
    SeekForwardFine,
    TogglePause,
    /// Player variant only.
    ToggleMute,
}

/// What the driver has to do after a command has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The cursor moved; the frame at the new index must be shown.
    Moved(u64),
    Capture,
    Paused(bool),
    Muted(bool),
    Confirm(MuxJob),
    Quit,
}

#[derive(Debug, Clone)]
pub struct Session {
    video_path: PathBuf,
    cover_path: PathBuf,
    output: OutputTarget,
    navigator: FrameNavigator,
    state: State,
    muted: bool,
}

impl Session {
    pub fn new(
        video_path: PathBuf,
        cover_path: PathBuf,
        output: OutputTarget,
        navigator: FrameNavigator,
    ) -> Self {
        Self {
            video_path,
            cover_path,
            output,
            navigator,
            state: State::Browsing,
            muted: false,
        }
    }

    pub fn cover_path(&self) -> &Path {
        &self.cover_path
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == State::Paused
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_terminated(&self) -> bool {
        self.state == State::Terminated
    }

    pub fn navigator(&self) -> &FrameNavigator {
        &self.navigator
    }

    pub fn current_frame_index(&self) -> u64 {
        self.navigator.index()
    }

    pub fn total_frame_count(&self) -> u64 {
        self.navigator.total()
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn mux_job(&self) -> MuxJob {
        MuxJob {
            video: self.video_path.clone(),
            cover: self.cover_path.clone(),
            output: self.output.clone(),
        }
    }

    /// Moves the cursor outside of a user command, e.g. playback advancing.
    pub fn advance_to(&mut self, index: u64) -> Effect {
        if self.is_terminated() {
            return Effect::None;
        }
        let before = self.navigator.index();
        let after = self.navigator.seek(index);
        if before == after {
            Effect::None
        } else {
            Effect::Moved(after)
        }
    }

    /// Forces the session to end, e.g. when the decoder hits end of stream.
    pub fn terminate(&mut self) {
        self.state = State::Terminated;
    }

    pub fn apply(&mut self, command: Command) -> Effect {
        if self.is_terminated() {
            return Effect::None;
        }

        match command {
            Command::Quit => {
                self.state = State::Terminated;
                Effect::Quit
            }
            Command::Confirm => {
                self.state = State::Terminated;
                Effect::Confirm(self.mux_job())
            }
            Command::Capture => Effect::Capture,
            Command::TogglePause => {
                self.state = match self.state {
                    State::Browsing => State::Paused,
                    _ => State::Browsing,
                };
                Effect::Paused(self.is_paused())
            }
            Command::ToggleMute => {
                self.muted = !self.muted;
                Effect::Muted(self.muted)
            }
            Command::SeekBackwardCoarse
            | Command::SeekForwardCoarse
            | Command::SeekBackwardFine
            | Command::SeekForwardFine => {
                let before = self.navigator.index();
                let after = match command {
                    Command::SeekBackwardCoarse => self.navigator.step_backward(),
                    Command::SeekForwardCoarse => self.navigator.step_forward(),
                    Command::SeekBackwardFine => self.navigator.step_backward_fine(),
                    _ => self.navigator.step_forward_fine(),
                };
                if before == after {
                    Effect::None
                } else {
                    Effect::Moved(after)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(total: u64) -> Session {
        Session::new(
            PathBuf::from("clip.mp4"),
            PathBuf::from("selected.jpg"),
            OutputTarget::File(PathBuf::from("output/clip.mp4")),
            FrameNavigator::new(total, 60, 5),
        )
    }

    #[test]
    fn starts_browsing_at_first_frame() {
        let s = session(100);
        assert_eq!(s.state(), State::Browsing);
        assert_eq!(s.current_frame_index(), 0);
        assert_eq!(s.total_frame_count(), 100);
    }

    #[test]
    fn forward_twice_clamps_to_last_frame() {
        let mut s = session(100);
        assert_eq!(s.apply(Command::SeekForwardCoarse), Effect::Moved(60));
        assert_eq!(s.apply(Command::SeekForwardCoarse), Effect::Moved(99));
        assert_eq!(s.apply(Command::SeekForwardCoarse), Effect::None);
        assert_eq!(s.current_frame_index(), 99);
    }

    #[test]
    fn fine_seek_moves_by_step_over_beta() {
        let mut s = session(100);
        assert_eq!(s.apply(Command::SeekForwardFine), Effect::Moved(12));
        assert_eq!(s.apply(Command::SeekBackwardFine), Effect::Moved(0));
        assert_eq!(s.apply(Command::SeekBackwardCoarse), Effect::None);
    }

    #[test]
    fn pause_toggles_and_navigation_still_works() {
        let mut s = session(100);
        assert_eq!(s.apply(Command::TogglePause), Effect::Paused(true));
        assert_eq!(s.state(), State::Paused);
        assert_eq!(s.apply(Command::SeekForwardCoarse), Effect::Moved(60));
        assert_eq!(s.apply(Command::TogglePause), Effect::Paused(false));
        assert_eq!(s.state(), State::Browsing);
    }

    #[test]
    fn capture_is_a_self_loop() {
        let mut s = session(100);
        s.apply(Command::SeekForwardCoarse);
        assert_eq!(s.apply(Command::Capture), Effect::Capture);
        assert_eq!(s.apply(Command::Capture), Effect::Capture);
        assert_eq!(s.state(), State::Browsing);
        assert_eq!(s.current_frame_index(), 60);
    }

    #[test]
    fn confirm_terminates_with_job() {
        let mut s = session(100);
        s.apply(Command::TogglePause);
        let effect = s.apply(Command::Confirm);
        assert_eq!(
            effect,
            Effect::Confirm(MuxJob {
                video: PathBuf::from("clip.mp4"),
                cover: PathBuf::from("selected.jpg"),
                output: OutputTarget::File(PathBuf::from("output/clip.mp4")),
            })
        );
        assert!(s.is_terminated());
    }

    #[test]
    fn terminated_session_ignores_commands() {
        let mut s = session(100);
        assert_eq!(s.apply(Command::Quit), Effect::Quit);
        assert_eq!(s.apply(Command::SeekForwardCoarse), Effect::None);
        assert_eq!(s.apply(Command::Confirm), Effect::None);
        assert_eq!(s.advance_to(50), Effect::None);
        assert_eq!(s.current_frame_index(), 0);
    }

    #[test]
    fn mute_toggles() {
        let mut s = session(100);
        s.set_muted(true);
        assert_eq!(s.apply(Command::ToggleMute), Effect::Muted(false));
        assert_eq!(s.apply(Command::ToggleMute), Effect::Muted(true));
    }

    #[test]
    fn advance_clamps_and_reports_moves() {
        let mut s = session(10);
        assert_eq!(s.advance_to(3), Effect::Moved(3));
        assert_eq!(s.advance_to(3), Effect::None);
        assert_eq!(s.advance_to(40), Effect::Moved(9));
    }
}
