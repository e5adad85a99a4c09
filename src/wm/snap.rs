//! Snap Module
//!
//! Edge snapping for drags: first against the borders of neighbouring
//! clients, then against the edges of the client's output.

use crate::shared::Geometry;
use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::screen::Output;
use crate::wm::WindowManager;

/// Replace `current` with `candidate` if it is strictly closer to zero.
/// Equal magnitudes keep the earlier value.
fn closer(current: i32, candidate: i32) -> i32 {
    if candidate.abs() < current.abs() {
        candidate
    } else {
        current
    }
}

/// Offset that would align `moving` with the nearest edge of one of
/// `others`. All geometries are in logical-screen coordinates.
///
/// Returns zero on an axis where nothing is closer than `snap`.
pub fn snap_to_clients<'a>(
    moving: &Geometry,
    others: impl IntoIterator<Item = &'a Geometry>,
    snap: i32,
) -> (i32, i32) {
    let c = moving;
    let (mut dx, mut dy) = (snap, snap);

    for ci in others {
        // Vertical extents within reach: try horizontal alignment
        if ci.y - ci.border_width - c.border_width - c.height - c.y <= snap
            && c.y - c.border_width - ci.border_width - ci.height - ci.y <= snap
        {
            dx = closer(dx, ci.x + ci.width - c.x + c.border_width + ci.border_width);
            dx = closer(dx, ci.x + ci.width - c.x - c.width);
            dx = closer(dx, ci.x - c.x - c.width - c.border_width - ci.border_width);
            dx = closer(dx, ci.x - c.x);
        }
        if ci.x - ci.border_width - c.border_width - c.width - c.x <= snap
            && c.x - c.border_width - ci.border_width - ci.width - ci.x <= snap
        {
            dy = closer(dy, ci.y + ci.height - c.y + c.border_width + ci.border_width);
            dy = closer(dy, ci.y + ci.height - c.y - c.height);
            dy = closer(dy, ci.y - c.y - c.height - c.border_width - ci.border_width);
            dy = closer(dy, ci.y - c.y);
        }
    }

    (
        if dx.abs() < snap { dx } else { 0 },
        if dy.abs() < snap { dy } else { 0 },
    )
}

/// Pull an output-local geometry onto the edges of `output` when within
/// `snap`. A client exactly one border from the edge while spanning the
/// whole output on that axis loses the gap entirely.
pub fn snap_to_edges(g: &mut Geometry, output: &Output, snap: i32) {
    let b = g.border_width;
    if (g.x - b).abs() < snap {
        g.x = b;
    }
    if (g.y - b).abs() < snap {
        g.y = b;
    }
    if (g.x + g.width + b - output.width).abs() < snap {
        g.x = output.width - g.width - b;
    }
    if (g.y + g.height + b - output.height).abs() < snap {
        g.y = output.height - g.height - b;
    }

    if g.x.abs() == b && g.width == output.width {
        g.x = 0;
    }
    if g.y.abs() == b && g.height == output.height {
        g.y = 0;
    }
}

impl<D: DisplayServer> WindowManager<D> {
    /// Snap a client being dragged to its neighbours and output edges.
    pub fn snap_client(&mut self, id: ClientId) {
        let snap = self.config.snap;
        let (Some(pos), Some(output)) = (self.screen_position(id), self.client_output(id)) else {
            return;
        };
        let Some(client) = self.clients.get(id) else {
            return;
        };
        let moving = Geometry { x: pos.x, y: pos.y, ..client.current };

        let others: Vec<Geometry> = self
            .visible_neighbours(id)
            .into_iter()
            .filter_map(|other| {
                let pos = self.screen_position(other)?;
                let g = self.clients.get(other)?.current;
                Some(Geometry { x: pos.x, y: pos.y, ..g })
            })
            .collect();

        let (dx, dy) = snap_to_clients(&moving, &others, snap);
        if let Some(client) = self.clients.get_mut(id) {
            client.current.x += dx;
            client.current.y += dy;
            snap_to_edges(&mut client.current, &output, snap);
        }
    }
}
