//! Output Discovery
//!
//! Discovers the physical outputs making up a logical screen. RandR CRTCs are
//! tried first, then Xinerama, then a single output covering the root.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::shared::{Point, Rect};
use crate::wm::display::DisplayServer;
use crate::wm::WindowManager;

/// Drop regions that lie entirely inside another region.
///
/// Repeats until nothing more can be removed. Of two identical regions
/// only the later survives.
pub fn prune_contained(mut regions: Vec<Rect>) -> Vec<Rect> {
    loop {
        let contained = (0..regions.len()).find(|&j| {
            (0..regions.len()).any(|k| k != j && regions[j].is_within(&regions[k]))
        });
        match contained {
            Some(j) => {
                debug!("pruning output {:?}", regions[j]);
                regions.remove(j);
            }
            None => return regions,
        }
    }
}

fn usable(regions: Vec<Rect>) -> Vec<Rect> {
    let regions: Vec<Rect> = regions
        .into_iter()
        .filter(|r| r.width > 0 && r.height > 0)
        .collect();
    prune_contained(regions)
}

/// Discover the outputs of the screen rooted at `root`.
///
/// Backend failures are not errors: the next backend is tried and the
/// result is never empty.
pub fn discover<D: DisplayServer>(display: &mut D, root: Window, width: i32, height: i32) -> Vec<Rect> {
    match display.query_crtcs(root) {
        Ok(regions) => {
            let regions = usable(regions);
            if !regions.is_empty() {
                info!("RandR: {} output(s) on root 0x{:x}", regions.len(), root);
                return regions;
            }
            debug!("RandR reported no usable CRTCs");
        }
        Err(e) => debug!("RandR query skipped: {}", e),
    }

    match display.query_xinerama() {
        Ok(regions) => {
            let regions = usable(regions);
            if !regions.is_empty() {
                info!("Xinerama: {} output(s)", regions.len());
                return regions;
            }
            debug!("Xinerama reported no screens");
        }
        Err(e) => debug!("Xinerama query skipped: {}", e),
    }

    info!("Using whole root 0x{:x} as a single {}x{} output", root, width, height);
    vec![Rect::new(0, 0, width, height)]
}

impl<D: DisplayServer> WindowManager<D> {
    /// React to a RandR screen change on `root`.
    ///
    /// Clients keep their logical-screen position and are reassigned to
    /// whichever new output now holds their centre.
    pub fn handle_screen_change(&mut self, root: Window, width: i32, height: i32) -> Result<()> {
        let Some(index) = self.screens.iter().position(|s| s.root == root) else {
            warn!("Screen change for unknown root 0x{:x}", root);
            return Ok(());
        };

        let positions: Vec<_> = self
            .clients
            .iter()
            .filter(|(_, c)| c.screen == index)
            .filter_map(|(id, _)| self.screen_position(id).map(|p| (id, p)))
            .collect();

        let regions = discover(&mut self.display, root, width, height);
        let screen = &mut self.screens[index];
        screen.width = width;
        screen.height = height;
        screen.replace_outputs(regions);

        for (id, Point { x, y }) in positions {
            self.update_screen_position(id, Point::new(x, y));
            self.client_calc_phy(id)?;
            self.moveresize(id)?;
        }
        self.update_current_desktop_props(index)
    }
}
