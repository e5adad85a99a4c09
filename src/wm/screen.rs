//! Screen Module
//!
//! Per logical screen state: the root window, the physical outputs that make
//! up its coordinate space and which virtual desktop each output shows.

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::shared::Rect;

/// Value stored in `_NET_WM_DESKTOP` for windows visible on every desktop.
pub const DESKTOP_FIXED: u32 = 0xffff_ffff;

/// Transient marker used while outputs trade desktops.
pub const DESKTOP_NONE: u32 = 0xffff_fffe;

/// Virtual desktop membership.
///
/// Clients carry `Index` or `Fixed`; outputs carry `Index`, or `None` for the
/// instant between clearing and reassigning during an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Desktop {
    Index(u32),
    Fixed,
    None,
}

impl Desktop {
    pub fn is_fixed(self) -> bool {
        self == Desktop::Fixed
    }

    /// Encode for EWMH properties.
    pub fn to_cardinal(self) -> u32 {
        match self {
            Desktop::Index(n) => n,
            Desktop::Fixed => DESKTOP_FIXED,
            Desktop::None => DESKTOP_NONE,
        }
    }

    pub fn from_cardinal(value: u32) -> Self {
        match value {
            DESKTOP_FIXED => Desktop::Fixed,
            DESKTOP_NONE => Desktop::None,
            n => Desktop::Index(n),
        }
    }

    /// Whether this is a desktop a client may be sent to.
    pub fn is_valid(self, vdesks: u32) -> bool {
        match self {
            Desktop::Index(n) => n < vdesks,
            Desktop::Fixed => true,
            Desktop::None => false,
        }
    }
}

/// One physical display region in logical-screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Desktop currently shown on this output
    pub vdesk: Desktop,
}

impl Output {
    pub fn new(region: Rect, vdesk: Desktop) -> Self {
        Self {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            vdesk,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Border colours allocated on a screen's colormap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorderPixels {
    /// Focused client
    pub fg: u32,
    /// Unfocused client
    pub bg: u32,
    /// Focused fixed client
    pub fc: u32,
}

/// A logical screen: one root window spanning one or more outputs.
#[derive(Debug, Clone)]
pub struct LogicalScreen {
    /// Screen number on the display connection
    pub number: usize,

    pub root: Window,

    /// Root window size
    pub width: i32,
    pub height: i32,

    /// Physical outputs, never empty
    pub outputs: Vec<Output>,

    /// Most recently hidden desktop, so the user may toggle back to it
    pub old_vdesk: Desktop,

    pub docks_visible: bool,

    pub pixels: BorderPixels,
}

impl LogicalScreen {
    /// Create a screen over already discovered regions.
    ///
    /// Output `i` starts out showing desktop `i`.
    pub fn new(number: usize, root: Window, width: i32, height: i32, regions: Vec<Rect>) -> Self {
        let mut regions = regions;
        if regions.is_empty() {
            regions.push(Rect::new(0, 0, width, height));
        }
        let outputs = regions
            .into_iter()
            .enumerate()
            .map(|(i, r)| Output::new(r, Desktop::Index(i as u32)))
            .collect();

        Self {
            number,
            root,
            width,
            height,
            outputs,
            old_vdesk: Desktop::Index(0),
            docks_visible: true,
            pixels: BorderPixels::default(),
        }
    }

    /// Find which output the logical-screen point `(x, y)` belongs to.
    ///
    /// Points outside every output resolve to the output whose centre is
    /// nearest, so this never fails while the screen has an output.
    pub fn find_output_for_point(&self, x: i32, y: i32) -> usize {
        if let Some(i) = self.outputs.iter().position(|o| o.rect().contains(x, y)) {
            return i;
        }

        let mut best = 0;
        let mut best_distance = i64::MAX;
        for (i, output) in self.outputs.iter().enumerate() {
            let centre = output.rect().centre();
            let dx = (x - centre.x) as i64;
            let dy = (y - centre.y) as i64;
            let distance = dx * dx + dy * dy;
            if distance < best_distance {
                best_distance = distance;
                best = i;
            }
        }
        best
    }

    /// Index of the output showing `vdesk`, if any.
    pub fn output_showing(&self, vdesk: Desktop) -> Option<usize> {
        self.outputs.iter().position(|o| o.vdesk == vdesk)
    }

    /// Whether a client on `vdesk` should currently be mapped.
    pub fn desktop_visible(&self, vdesk: Desktop) -> bool {
        vdesk.is_fixed() || self.output_showing(vdesk).is_some()
    }

    /// Replace the output list after outputs are rediscovered.
    ///
    /// Outputs keep the desktop shown at the same index; additional outputs
    /// get the lowest desktop not already on screen.
    pub fn replace_outputs(&mut self, regions: Vec<Rect>) {
        let old: Vec<Desktop> = self.outputs.iter().map(|o| o.vdesk).collect();
        let mut outputs: Vec<Output> = Vec::with_capacity(regions.len().max(1));
        for (i, region) in regions.into_iter().enumerate() {
            let vdesk = match old.get(i) {
                Some(&vdesk) => vdesk,
                None => {
                    let mut n = 0;
                    while old.contains(&Desktop::Index(n))
                        || outputs.iter().any(|o| o.vdesk == Desktop::Index(n))
                    {
                        n += 1;
                    }
                    Desktop::Index(n)
                }
            };
            outputs.push(Output::new(region, vdesk));
        }
        if outputs.is_empty() {
            outputs.push(Output::new(
                Rect::new(0, 0, self.width, self.height),
                old.first().copied().unwrap_or(Desktop::Index(0)),
            ));
        }
        debug!("Screen {}: now {} output(s)", self.number, outputs.len());
        self.outputs = outputs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_outputs() -> LogicalScreen {
        LogicalScreen::new(
            0,
            1,
            2000,
            768,
            vec![Rect::new(0, 0, 1000, 768), Rect::new(1000, 0, 1000, 768)],
        )
    }

    #[test]
    fn test_point_inside_output() {
        let screen = two_outputs();
        assert_eq!(screen.find_output_for_point(10, 10), 0);
        assert_eq!(screen.find_output_for_point(999, 10), 0);
        assert_eq!(screen.find_output_for_point(1000, 10), 1);
        assert_eq!(screen.find_output_for_point(1999, 767), 1);
    }

    #[test]
    fn test_point_outside_resolves_to_nearest_centre() {
        let screen = two_outputs();
        assert_eq!(screen.find_output_for_point(-5000, 300), 0);
        assert_eq!(screen.find_output_for_point(90_000, -90_000), 1);
        assert_eq!(screen.find_output_for_point(400, 5000), 0);
    }

    #[test]
    fn test_lookup_is_total_over_a_large_region() {
        let screen = LogicalScreen::new(
            0,
            1,
            1600,
            1200,
            vec![Rect::new(0, 0, 800, 600), Rect::new(800, 600, 800, 600)],
        );
        for x in (-20_000..20_000).step_by(397) {
            for y in (-20_000..20_000).step_by(409) {
                assert!(screen.find_output_for_point(x, y) < screen.outputs.len());
            }
        }
    }

    #[test]
    fn test_desktop_cardinals() {
        assert_eq!(Desktop::Fixed.to_cardinal(), DESKTOP_FIXED);
        assert_eq!(Desktop::from_cardinal(3), Desktop::Index(3));
        assert_eq!(Desktop::from_cardinal(DESKTOP_FIXED), Desktop::Fixed);
        assert!(!Desktop::Index(8).is_valid(8));
        assert!(Desktop::Fixed.is_valid(8));
    }

    #[test]
    fn test_replace_outputs_keeps_desktops() {
        let mut screen = two_outputs();
        screen.outputs[1].vdesk = Desktop::Index(4);
        screen.replace_outputs(vec![
            Rect::new(0, 0, 1000, 768),
            Rect::new(1000, 0, 1000, 768),
            Rect::new(2000, 0, 800, 600),
        ]);
        assert_eq!(screen.outputs[0].vdesk, Desktop::Index(0));
        assert_eq!(screen.outputs[1].vdesk, Desktop::Index(4));
        assert_eq!(screen.outputs[2].vdesk, Desktop::Index(1));
    }

    #[test]
    fn test_empty_discovery_falls_back_to_root_size() {
        let screen = LogicalScreen::new(0, 1, 1280, 1024, Vec::new());
        assert_eq!(screen.outputs.len(), 1);
        assert_eq!(screen.outputs[0].rect(), Rect::new(0, 0, 1280, 1024));
    }
}
