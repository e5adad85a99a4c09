//! Placement Module
//!
//! Coordinate transforms between output-local and logical-screen space,
//! output reassignment, border gravitation and committing client geometry
//! to the server.

use anyhow::Result;
use tracing::debug;

use crate::shared::{spans_overlap, Geometry, Point, Rect};
use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::Prop;
use crate::wm::screen::Output;
use crate::wm::WindowManager;

/// Clamp a position so at least the frame's border stays on `output`.
pub fn position_policy(geometry: &mut Geometry, output: &Output) {
    let b = geometry.border_width;
    geometry.x = (1 - geometry.width - b).max(geometry.x.min(output.width));
    geometry.y = (1 - geometry.height - b).max(geometry.y.min(output.height));
}

/// `_NET_FRAME_EXTENTS` value (left, right, top, bottom) for a border.
pub fn frame_extents(border: i32) -> [u32; 4] {
    [border.max(0) as u32; 4]
}

impl<D: DisplayServer> WindowManager<D> {
    /// The output currently governing a client.
    pub(crate) fn client_output(&self, id: ClientId) -> Option<Output> {
        let client = self.clients.get(id)?;
        self.screens.get(client.screen)?.outputs.get(client.output).copied()
    }

    /// Client position in logical-screen coordinates.
    pub fn screen_position(&self, id: ClientId) -> Option<Point> {
        let output = self.client_output(id)?;
        self.clients.get(id).map(|c| c.screen_pos(&output))
    }

    /// Move a client to logical-screen position `pos`, reassigning its
    /// output by where its centre of gravity lands.
    pub fn update_screen_position(&mut self, id: ClientId, pos: Point) {
        let Some(client) = self.clients.get_mut(id) else {
            return;
        };
        let Some(screen) = self.screens.get(client.screen) else {
            return;
        };
        let index = screen.find_output_for_point(pos.x + client.cog.x, pos.y + client.cog.y);
        let output = &screen.outputs[index];
        client.output = index;
        client.current.x = pos.x - output.x;
        client.current.y = pos.y - output.y;
    }

    /// Recompute the governing output. A non-fixed client that changed
    /// output takes on the desktop that output shows.
    pub fn client_calc_phy(&mut self, id: ClientId) -> Result<()> {
        let Some(pos) = self.screen_position(id) else {
            return Ok(());
        };
        self.update_screen_position(id, pos);

        let Some(shown) = self.client_output(id).map(|o| o.vdesk) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        if !client.is_fixed() && client.vdesk != shown {
            debug!("Client 0x{:x} moved to desktop {:?}", client.window, shown);
            client.vdesk = shown;
            let window = client.window;
            self.display
                .set_cardinals(window, Prop::NetWmDesktop, &[shown.to_cardinal()])?;
        }
        Ok(())
    }

    /// Shift a client to allow for a border change of `bw`, keeping the
    /// point named by its gravity hint in place. Axes flush with the output
    /// edge and spanning it are left alone.
    pub fn gravitate_border(&mut self, id: ClientId, bw: i32) {
        let Some(output) = self.client_output(id) else {
            return;
        };
        let Some(client) = self.clients.get_mut(id) else {
            return;
        };
        let (sx, sy) = client.hints.win_gravity.border_shift();
        let g = &mut client.current;
        if g.x != 0 || g.width != output.width {
            g.x += sx * bw;
        }
        if g.y != 0 || g.height != output.height {
            g.y += sy * bw;
        }
    }

    /// Tell the client where it is, in logical-screen coordinates.
    pub fn send_config(&mut self, id: ClientId) -> Result<()> {
        let (Some(client), Some(pos)) = (self.clients.get(id), self.screen_position(id)) else {
            return Ok(());
        };
        let g = client.current;
        let window = client.window;
        self.display
            .send_configure_notify(window, Geometry::new(pos.x, pos.y, g.width, g.height, 0))
    }

    pub fn set_frame_extents(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let extents = frame_extents(client.current.border_width);
        let window = client.window;
        self.display.set_cardinals(window, Prop::NetFrameExtents, &extents)
    }

    /// Apply the position policy, then push frame and client geometry to
    /// the server.
    pub fn moveresize(&mut self, id: ClientId) -> Result<()> {
        let Some(output) = self.client_output(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        position_policy(&mut client.current, &output);
        let g = client.current;
        let pos = client.screen_pos(&output);
        let (frame, window) = (client.frame, client.window);

        let b = g.border_width;
        self.display
            .move_resize_window(frame, Rect::new(pos.x - b, pos.y - b, g.width, g.height))?;
        self.display
            .move_resize_window(window, Rect::new(0, 0, g.width, g.height))?;
        self.send_config(id)
    }

    pub fn moveresize_raise(&mut self, id: ClientId) -> Result<()> {
        self.client_raise(id)?;
        self.moveresize(id)
    }

    /// Other clients that count as obstacles for `id`: same screen, on the
    /// desktop its output shows (or fixed), docks only while docks are
    /// visible. Registry order.
    pub(crate) fn visible_neighbours(&self, id: ClientId) -> Vec<ClientId> {
        let (Some(client), Some(output)) = (self.clients.get(id), self.client_output(id)) else {
            return Vec::new();
        };
        let docks_visible = self
            .screens
            .get(client.screen)
            .map_or(true, |s| s.docks_visible);
        self.clients
            .iter()
            .filter(|&(other_id, other)| {
                other_id != id
                    && other.screen == client.screen
                    && (other.is_fixed() || other.vdesk == output.vdesk)
                    && !(other.is_dock && !docks_visible)
            })
            .map(|(other_id, _)| other_id)
            .collect()
    }

    /// Grow a client on every side until it meets a neighbour overlapping
    /// it on the other axis, or the edge of its output.
    pub fn expand(&mut self, id: ClientId) -> Result<()> {
        let (Some(client), Some(output)) = (self.clients.get(id), self.client_output(id)) else {
            return Ok(());
        };
        let g = client.current;
        let b = g.border_width;

        // Outer boxes of the neighbours, in this client's output frame
        let boxes: Vec<Rect> = self
            .visible_neighbours(id)
            .into_iter()
            .filter_map(|other| {
                let pos = self.screen_position(other)?;
                let og = self.clients.get(other)?.current;
                Some(Rect::new(
                    pos.x - output.x - og.border_width,
                    pos.y - output.y - og.border_width,
                    og.outer_width(),
                    og.outer_height(),
                ))
            })
            .collect();

        let (x0, w0) = (g.x - b, g.outer_width());
        let (y0, h0) = (g.y - b, g.outer_height());

        let top = boxes
            .iter()
            .filter(|r| r.y + r.height <= y0 && spans_overlap(x0, w0, r.x, r.width))
            .fold(0, |edge, r| edge.max(r.y + r.height));
        let bottom = boxes
            .iter()
            .filter(|r| r.y >= y0 + h0 && spans_overlap(x0, w0, r.x, r.width))
            .fold(output.height, |edge, r| edge.min(r.y));
        let left = boxes
            .iter()
            .filter(|r| r.x + r.width <= x0 && spans_overlap(top, bottom - top, r.y, r.height))
            .fold(0, |edge, r| edge.max(r.x + r.width));
        let right = boxes
            .iter()
            .filter(|r| r.x >= x0 + w0 && spans_overlap(top, bottom - top, r.y, r.height))
            .fold(output.width, |edge, r| edge.min(r.x));

        debug!("Expanding client to {}..{} x {}..{}", left, right, top, bottom);
        if let Some(client) = self.clients.get_mut(id) {
            let g = &mut client.current;
            g.x = left + b;
            g.y = top + b;
            g.width = (right - left - 2 * b).max(1);
            g.height = (bottom - top - 2 * b).max(1);
            client.recompute_cog();
        }
        self.moveresize(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;
    use crate::wm::hints::Gravity;
    use crate::wm::screen::Desktop;
    use crate::wm::testing::TestWm;

    #[test]
    fn test_position_policy_clamps_to_output_edges() {
        let output = Output::new(Rect::new(0, 0, 800, 600), Desktop::Index(0));
        let mut g = Geometry::new(-500, 900, 200, 100, 1);
        position_policy(&mut g, &output);
        // Clamped so only the frame's border still overlaps the output
        assert_eq!((g.x, g.y), (-200, 600));

        let mut g = Geometry::new(10, 20, 200, 100, 1);
        position_policy(&mut g, &output);
        assert_eq!((g.x, g.y), (10, 20));
    }

    #[test]
    fn test_update_screen_position_uses_centre() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768), Rect::new(1000, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));

        // Corner on output 0, centre on output 1
        t.wm.update_screen_position(id, Point::new(950, 100));
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.output, 1);
        assert_eq!(client.current.x, -50);
        assert_eq!(t.wm.screen_position(id), Some(Point::new(950, 100)));
    }

    #[test]
    fn test_calc_phy_adopts_desktop_of_new_output() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768), Rect::new(1000, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        assert_eq!(t.wm.clients.get(id).unwrap().vdesk, Desktop::Index(0));

        t.wm.update_screen_position(id, Point::new(1200, 100));
        t.wm.client_calc_phy(id).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.vdesk, Desktop::Index(1));
        assert_eq!(t.wm.display.cardinals(client.window, Prop::NetWmDesktop), Some(vec![1]));
    }

    #[test]
    fn test_calc_phy_leaves_fixed_clients_fixed() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768), Rect::new(1000, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        t.wm.clients.get_mut(id).unwrap().vdesk = Desktop::Fixed;
        t.wm.update_screen_position(id, Point::new(1200, 100));
        t.wm.client_calc_phy(id).unwrap();
        assert_eq!(t.wm.clients.get(id).unwrap().vdesk, Desktop::Fixed);
    }

    #[test]
    fn test_gravitate_border_follows_gravity() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        t.wm.clients.get_mut(id).unwrap().hints.win_gravity = Gravity::SouthEast;
        let before = t.wm.clients.get(id).unwrap().current;
        t.wm.gravitate_border(id, 2);
        let after = t.wm.clients.get(id).unwrap().current;
        assert_eq!((after.x, after.y), (before.x - 2, before.y - 2));
    }

    #[test]
    fn test_gravitate_border_skips_flush_spanning_axis() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        {
            let g = &mut t.wm.clients.get_mut(id).unwrap().current;
            g.x = 0;
            g.width = 1000;
        }
        t.wm.gravitate_border(id, 3);
        let g = t.wm.clients.get(id).unwrap().current;
        assert_eq!(g.x, 0);
        assert_eq!(g.y, 104);
    }

    #[test]
    fn test_moveresize_places_frame_around_client() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768), Rect::new(1000, 0, 1000, 768)]);
        let id = t.manage(Rect::new(1100, 100, 200, 100));
        t.wm.moveresize(id).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        // Border 1: client area at 1101,101
        assert_eq!(t.wm.display.geometry_of(client.frame), Some(Rect::new(1100, 100, 200, 100)));
        assert_eq!(
            t.wm.display.configure_notifies.last(),
            Some(&(client.window, Geometry::new(1101, 101, 200, 100, 0)))
        );
    }

    #[test]
    fn test_expand_stops_at_neighbours() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 800)]);
        // Neighbour to the left, outer box 0..200 wide
        t.manage(Rect::new(0, 300, 198, 100));
        // Neighbour above, outer box bottom at 102
        t.manage(Rect::new(400, 0, 198, 100));
        let id = t.manage(Rect::new(400, 300, 98, 98));

        t.wm.expand(id).unwrap();
        let g = t.wm.clients.get(id).unwrap().current;
        assert_eq!((g.x, g.y), (201, 103));
        assert_eq!(g.x - 1 + g.outer_width(), 1000);
        assert_eq!(g.y - 1 + g.outer_height(), 800);
    }
}
