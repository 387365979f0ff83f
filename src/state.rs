//! Menu / race / results flow.
//!
//! Transitions are requested at any time but applied once per frame, so a
//! state never tears itself down mid-update. The host reacts to the returned
//! transition: build the race scene on entering `Race`, destroy it on the way
//! out, show a mock car behind the menus, and so on.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    MenuMain,
    MenuPlay,
    MenuOptions,
    Race,
    Results,
}

impl GameState {
    pub fn is_menu(self) -> bool {
        matches!(
            self,
            GameState::MenuMain | GameState::MenuPlay | GameState::MenuOptions
        )
    }
}

pub struct GameFlow {
    current: GameState,
    next: Option<GameState>,
}

impl Default for GameFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl GameFlow {
    pub fn new() -> Self {
        Self {
            current: GameState::MenuMain,
            next: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.current
    }

    /// Queues a state switch for the next `process` call. Requesting the
    /// current state is a no-op.
    pub fn request(&mut self, next: GameState) {
        if next != self.current {
            self.next = Some(next);
        }
    }

    /// Applies a pending request. Returns `(from, to)` when a switch
    /// happened so the host can tear down the old scene and build the new.
    pub fn process(&mut self) -> Option<(GameState, GameState)> {
        let next = self.next.take()?;
        if next == self.current {
            return None;
        }
        let from = self.current;
        self.current = next;
        Some((from, next))
    }
}
