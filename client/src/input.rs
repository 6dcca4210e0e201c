//! Scripted movement for the bot: rectangular loops around the spawn point

use shared::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    /// Legs of one loop, in walking order.
    const LOOP: [Heading; 4] = [Heading::East, Heading::North, Heading::West, Heading::South];

    /// Offset of one step. Coordinates are `[lat, lng]`.
    pub fn delta(self, step: f64) -> Coord {
        match self {
            Heading::North => [step, 0.0],
            Heading::East => [0.0, step],
            Heading::South => [-step, 0.0],
            Heading::West => [0.0, -step],
        }
    }
}

/// Walks square loops of `loop_size` steps per side, starting and ending at
/// the origin. With a side longer than the seed territory, every loop leaves
/// the territory on the first leg and re-enters it on the last.
#[derive(Debug, Clone)]
pub struct Pilot {
    origin: Coord,
    position: Coord,
    step: f64,
    loop_size: u32,
    leg: usize,
    steps_on_leg: u32,
    loops_completed: u32,
    paused: bool,
}

impl Pilot {
    pub fn new(origin: Coord, step: f64, loop_size: u32) -> Self {
        Self {
            origin,
            position: origin,
            step,
            loop_size: loop_size.max(1),
            leg: 0,
            steps_on_leg: 0,
            loops_completed: 0,
            paused: false,
        }
    }

    /// Starts over from a new origin, e.g. after a respawn.
    pub fn reset(&mut self, origin: Coord) {
        self.origin = origin;
        self.position = origin;
        self.leg = 0;
        self.steps_on_leg = 0;
    }

    /// Flips the pause state and returns true if now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn heading(&self) -> Heading {
        Heading::LOOP[self.leg]
    }

    pub fn loops_completed(&self) -> u32 {
        self.loops_completed
    }

    /// Advances one step and returns the new position, or `None` while paused.
    pub fn next_position(&mut self) -> Option<Coord> {
        if self.paused {
            return None;
        }

        let [dx, dy] = self.heading().delta(self.step);
        self.position = [self.position[0] + dx, self.position[1] + dy];
        self.steps_on_leg += 1;

        if self.steps_on_leg == self.loop_size {
            self.steps_on_leg = 0;
            self.leg = (self.leg + 1) % Heading::LOOP.len();
            if self.leg == 0 {
                // Accumulated rounding must not drift the loop away from home.
                self.position = self.origin;
                self.loops_completed += 1;
            }
        }

        Some(self.position)
    }
}
