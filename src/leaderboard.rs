//! Presentational leaderboard: animated row positions and rank-change
//! flashes. Pure display state driven by the authoritative standings; nothing
//! here feeds back into the simulation.

use crate::car::CarId;

pub const ROW_BASE_Y: f32 = 50.0;
pub const ROW_SPACING: f32 = 24.0;
/// Fraction of the remaining distance covered per second.
pub const ROW_ANIM_SPEED: f32 = 8.0;
pub const FLASH_SECONDS: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct LeaderboardRow {
    pub car: CarId,
    /// Current display y (px), eased toward `target_y`.
    pub y: f32,
    pub target_y: f32,
    /// 1-based rank; 0 until the first sync assigns one.
    pub rank: usize,
    pub last_rank: usize,
    /// Seconds of highlight left after a rank change.
    pub flash_timer: f32,
}

impl LeaderboardRow {
    /// True while flashing because the car moved up the order.
    pub fn improved(&self) -> bool {
        self.last_rank > self.rank
    }
}

#[derive(Default)]
pub struct LeaderboardUi {
    rows: Vec<LeaderboardRow>,
}

impl LeaderboardUi {
    /// Rebuilds the row set when the car list changes, then retargets every
    /// row to its slot in the new standings. A changed rank arms the flash.
    pub fn sync(&mut self, standings: &[CarId]) {
        if self.rows.len() != standings.len() {
            self.rows = standings
                .iter()
                .map(|&car| LeaderboardRow {
                    car,
                    y: ROW_BASE_Y,
                    target_y: ROW_BASE_Y,
                    rank: 0,
                    last_rank: 0,
                    flash_timer: 0.0,
                })
                .collect();
        }

        for (i, &car) in standings.iter().enumerate() {
            let new_rank = i + 1;
            if let Some(row) = self.rows.iter_mut().find(|r| r.car == car) {
                row.target_y = ROW_BASE_Y + i as f32 * ROW_SPACING;
                if row.rank != 0 && row.rank != new_rank {
                    row.flash_timer = FLASH_SECONDS;
                }
                row.last_rank = row.rank;
                row.rank = new_rank;
            }
        }
    }

    /// Eases rows toward their targets and winds down flashes.
    pub fn animate(&mut self, dt: f32) {
        for row in &mut self.rows {
            row.y += (row.target_y - row.y) * ROW_ANIM_SPEED * dt;
            row.flash_timer = (row.flash_timer - dt).max(0.0);
        }
    }

    pub fn rows(&self) -> &[LeaderboardRow] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_assigns_slots_in_standings_order() {
        let mut ui = LeaderboardUi::default();
        ui.sync(&[CarId(2), CarId(0), CarId(1)]);

        let rows = ui.rows();
        assert_eq!(rows.len(), 3);
        let second = rows.iter().find(|r| r.car == CarId(0)).unwrap();
        assert_eq!(second.rank, 2);
        assert_eq!(second.target_y, ROW_BASE_Y + ROW_SPACING);
        // First sync never flashes.
        assert_eq!(second.flash_timer, 0.0);
    }

    #[test]
    fn rank_change_arms_the_flash() {
        let mut ui = LeaderboardUi::default();
        ui.sync(&[CarId(0), CarId(1)]);
        ui.sync(&[CarId(1), CarId(0)]);

        let winner = ui.rows().iter().find(|r| r.car == CarId(1)).unwrap();
        assert_eq!(winner.flash_timer, FLASH_SECONDS);
        assert!(winner.improved());

        let loser = ui.rows().iter().find(|r| r.car == CarId(0)).unwrap();
        assert!(!loser.improved());
    }

    #[test]
    fn animate_eases_toward_target_and_decays_flash() {
        let mut ui = LeaderboardUi::default();
        ui.sync(&[CarId(0), CarId(1)]);
        ui.sync(&[CarId(1), CarId(0)]);

        let before: Vec<f32> = ui.rows().iter().map(|r| (r.target_y - r.y).abs()).collect();
        ui.animate(1.0 / 60.0);
        for (row, gap) in ui.rows().iter().zip(before) {
            assert!((row.target_y - row.y).abs() <= gap);
            assert!(row.flash_timer < FLASH_SECONDS);
        }
    }
}
