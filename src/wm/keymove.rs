//! Keymove Module
//!
//! Moving and resizing the current client from the keyboard: fixed steps
//! in a direction, resizing by the client's size increments, and jumping
//! to a corner of its output.

use anyhow::Result;
use tracing::debug;

use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::WindowManager;

/// Pixels a client moves per key press
pub const MOVE_STEP: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl<D: DisplayServer> WindowManager<D> {
    /// Move a client one step.
    pub fn nudge(&mut self, id: ClientId, direction: Direction) -> Result<()> {
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let g = &mut client.current;
        match direction {
            Direction::Left => g.x -= MOVE_STEP,
            Direction::Right => g.x += MOVE_STEP,
            Direction::Up => g.y -= MOVE_STEP,
            Direction::Down => g.y += MOVE_STEP,
        }
        self.finish_keymove(id)
    }

    /// Left and Up shrink by one increment, Right and Down grow by one.
    /// A step that would cross the client's min or max size is skipped.
    pub fn resize_step(&mut self, id: ClientId, direction: Direction) -> Result<()> {
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let hints = client.hints;
        let g = &mut client.current;
        match direction {
            Direction::Left => {
                if g.width - hints.width_inc >= hints.min_width.max(1) {
                    g.width -= hints.width_inc;
                }
            }
            Direction::Right => {
                if hints.max_width == 0 || g.width + hints.width_inc <= hints.max_width {
                    g.width += hints.width_inc;
                }
            }
            Direction::Up => {
                if g.height - hints.height_inc >= hints.min_height.max(1) {
                    g.height -= hints.height_inc;
                }
            }
            Direction::Down => {
                if hints.max_height == 0 || g.height + hints.height_inc <= hints.max_height {
                    g.height += hints.height_inc;
                }
            }
        }
        self.finish_keymove(id)
    }

    /// Put a client in a corner of its output, border flush with the edges.
    pub fn move_to_corner(&mut self, id: ClientId, corner: Corner) -> Result<()> {
        let Some(output) = self.client_output(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let g = &mut client.current;
        let b = g.border_width;
        let (left, top) = (b, b);
        let right = output.width - g.width - b;
        let bottom = output.height - g.height - b;
        (g.x, g.y) = match corner {
            Corner::TopLeft => (left, top),
            Corner::TopRight => (right, top),
            Corner::BottomLeft => (left, bottom),
            Corner::BottomRight => (right, bottom),
        };
        self.finish_keymove(id)
    }

    fn finish_keymove(&mut self, id: ClientId) -> Result<()> {
        if let Some(client) = self.clients.get_mut(id) {
            client.recompute_cog();
            debug!("Keyboard move of 0x{:x} to {:?}", client.window, client.current);
        }
        self.client_calc_phy(id)?;
        self.moveresize(id)?;
        if self.config.warp_pointer {
            if let Some(client) = self.clients.get(id) {
                let g = client.current;
                let b = g.border_width;
                let window = client.window;
                self.display
                    .warp_pointer(window, g.width + b - 1, g.height + b - 1)?;
            }
        }
        self.display.discard_enter_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Geometry, Rect};
    use crate::wm::hints::SizeHints;
    use crate::wm::testing::TestWm;

    fn setup() -> (TestWm, ClientId) {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768), Rect::new(1000, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        (t, id)
    }

    fn geometry(t: &TestWm, id: ClientId) -> Geometry {
        t.wm.clients.get(id).unwrap().current
    }

    #[test]
    fn test_nudge_moves_one_step() {
        let (mut t, id) = setup();
        t.wm.nudge(id, Direction::Left).unwrap();
        t.wm.nudge(id, Direction::Down).unwrap();
        let g = geometry(&t, id);
        assert_eq!((g.x, g.y), (101 - MOVE_STEP, 101 + MOVE_STEP));
        let frame = t.wm.clients.get(id).unwrap().frame;
        assert_eq!(
            t.wm.display.geometry_of(frame),
            Some(Rect::new(100 - MOVE_STEP, 100 + MOVE_STEP, 200, 100))
        );
    }

    #[test]
    fn test_resize_step_uses_increments_and_limits() {
        let (mut t, id) = setup();
        t.wm.clients.get_mut(id).unwrap().hints = SizeHints {
            width_inc: 10,
            height_inc: 20,
            min_width: 195,
            max_height: 110,
            ..SizeHints::default()
        };

        // 200 - 10 would go under the minimum width
        t.wm.resize_step(id, Direction::Left).unwrap();
        assert_eq!(geometry(&t, id).width, 200);
        t.wm.resize_step(id, Direction::Right).unwrap();
        assert_eq!(geometry(&t, id).width, 210);
        t.wm.resize_step(id, Direction::Up).unwrap();
        assert_eq!(geometry(&t, id).height, 80);
        t.wm.resize_step(id, Direction::Down).unwrap();
        assert_eq!(geometry(&t, id).height, 100);
        // 100 + 20 would pass the maximum height
        t.wm.resize_step(id, Direction::Down).unwrap();
        assert_eq!(geometry(&t, id).height, 100);
    }

    #[test]
    fn test_corners_are_flush_with_output_edges() {
        let (mut t, id) = setup();
        t.wm.move_to_corner(id, Corner::BottomRight).unwrap();
        let g = geometry(&t, id);
        assert_eq!((g.x, g.y), (799, 667));
        let frame = t.wm.clients.get(id).unwrap().frame;
        assert_eq!(t.wm.display.geometry_of(frame), Some(Rect::new(798, 666, 200, 100)));

        t.wm.move_to_corner(id, Corner::TopLeft).unwrap();
        let g = geometry(&t, id);
        assert_eq!((g.x, g.y), (1, 1));
        assert_eq!(t.wm.clients.get(id).unwrap().output, 0);
    }

    #[test]
    fn test_nudge_across_outputs_changes_output() {
        let (mut t, id) = setup();
        t.wm.move_to_corner(id, Corner::TopRight).unwrap();
        for _ in 0..7 {
            t.wm.nudge(id, Direction::Right).unwrap();
        }
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.output, 1);
        assert_eq!(client.current.x, 799 + 7 * MOVE_STEP - 1000);
    }

    #[test]
    fn test_keymove_warps_when_enabled() {
        let (mut t, id) = setup();
        let window = t.wm.clients.get(id).unwrap().window;
        t.wm.nudge(id, Direction::Up).unwrap();
        assert!(t.wm.display.warps.is_empty());

        t.wm.config.warp_pointer = true;
        t.wm.nudge(id, Direction::Up).unwrap();
        assert_eq!(t.wm.display.warps.last(), Some(&(window, 200, 100)));
    }
}
